use anyhow::Result;
use clap::Parser;
use presentation::cli::{Cli, ServerApp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let app = ServerApp::init(&cli)?;
    app.run().await?;
    Ok(())
}
