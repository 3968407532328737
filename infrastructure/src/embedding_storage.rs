use domain::models::{Embedding, SOURCE_KEY};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Result as SqlResult};
use shared::types::{AppError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Persistent chunk store backed by a single SQLite file.
///
/// The connection is opened once and released by [`EmbeddingStorage::close`];
/// every call after that fails with a vector store error.
pub struct EmbeddingStorage {
    conn: Mutex<Option<Connection>>,
    path: PathBuf,
}

impl EmbeddingStorage {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path).map_err(AppError::store)?;
        Self::setup_db(&conn).map_err(AppError::store)?;
        tracing::info!(path = %db_path.display(), "Vector store opened");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            path: db_path.to_path_buf(),
        })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA cache_size=-64000;
            PRAGMA temp_store=MEMORY;
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                vector BLOB NOT NULL,
                text TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                source TEXT NOT NULL DEFAULT ''
            );
            CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source);
            CREATE TABLE IF NOT EXISTS file_meta (
                source TEXT PRIMARY KEY,
                hash TEXT NOT NULL
            );
        ",
        )
    }

    pub fn is_open(&self) -> bool {
        self.conn.lock().is_some()
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let guard = self.conn.lock();
        let conn = guard
            .as_ref()
            .ok_or_else(|| AppError::store("vector store is closed"))?;
        f(conn)
    }

    pub fn insert_embeddings(&self, embeddings: &[Embedding]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(AppError::store)?;
            {
                let mut stmt = tx
                    .prepare(
                        "INSERT OR REPLACE INTO chunks (id, vector, text, metadata, source) \
                         VALUES (?1, ?2, ?3, ?4, ?5)",
                    )
                    .map_err(AppError::store)?;
                for embedding in embeddings {
                    let vector_bytes = serde_json::to_vec(&embedding.vector)?;
                    let metadata = serde_json::to_string(&embedding.metadata)?;
                    let source = embedding
                        .metadata
                        .get(SOURCE_KEY)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default();
                    stmt.execute(params![
                        embedding.id,
                        vector_bytes,
                        embedding.text,
                        metadata,
                        source
                    ])
                    .map_err(AppError::store)?;
                }
            }
            tx.commit().map_err(AppError::store)?;
            Ok(())
        })
    }

    /// All stored chunks in insertion order.
    pub fn get_all_embeddings(&self) -> Result<Vec<Embedding>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, vector, text, metadata FROM chunks ORDER BY rowid")
                .map_err(AppError::store)?;
            let mut rows = stmt.query([]).map_err(AppError::store)?;
            let mut embeddings = Vec::new();
            while let Some(row) = rows.next().map_err(AppError::store)? {
                let id: String = row.get(0).map_err(AppError::store)?;
                let vector_bytes: Vec<u8> = row.get(1).map_err(AppError::store)?;
                let text: String = row.get(2).map_err(AppError::store)?;
                let metadata: String = row.get(3).map_err(AppError::store)?;
                let vector: Vec<f32> = serde_json::from_slice(&vector_bytes)?;
                let metadata: HashMap<String, serde_json::Value> =
                    serde_json::from_str(&metadata)?;
                embeddings.push(Embedding {
                    id,
                    vector,
                    text,
                    metadata,
                });
            }
            Ok(embeddings)
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))
                .map_err(AppError::store)?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
    }

    pub fn get_file_hash(&self, source: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT hash FROM file_meta WHERE source = ?1")
                .map_err(AppError::store)?;
            let mut rows = stmt.query([source]).map_err(AppError::store)?;
            if let Some(row) = rows.next().map_err(AppError::store)? {
                let hash: String = row.get(0).map_err(AppError::store)?;
                return Ok(Some(hash));
            }
            Ok(None)
        })
    }

    pub fn upsert_file_hash(&self, source: &str, hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO file_meta (source, hash) VALUES (?1, ?2)",
                params![source, hash],
            )
            .map_err(AppError::store)?;
            Ok(())
        })
    }

    pub fn delete_embeddings_for_source(&self, source: &str) -> Result<usize> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM chunks WHERE source = ?1", params![source])
                .map_err(AppError::store)
        })
    }

    /// Every source that still has chunks or a recorded hash.
    pub fn indexed_sources(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT source FROM file_meta \
                     UNION SELECT source FROM chunks WHERE source != '' \
                     ORDER BY source",
                )
                .map_err(AppError::store)?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .map_err(AppError::store)?;
            rows.collect::<SqlResult<Vec<_>>>().map_err(AppError::store)
        })
    }

    /// Drops a source's chunks together with its recorded hash.
    pub fn remove_source(&self, source: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction().map_err(AppError::store)?;
            let removed = tx
                .execute("DELETE FROM chunks WHERE source = ?1", params![source])
                .map_err(AppError::store)?;
            tx.execute("DELETE FROM file_meta WHERE source = ?1", params![source])
                .map_err(AppError::store)?;
            tx.commit().map_err(AppError::store)?;
            Ok(removed)
        })
    }

    /// Releases the connection. Idempotent.
    pub fn close(&self) -> Result<()> {
        let Some(conn) = self.conn.lock().take() else {
            return Ok(());
        };
        conn.close().map_err(|(_, e)| AppError::store(e))?;
        tracing::info!(path = %self.path.display(), "Vector store closed");
        Ok(())
    }
}
