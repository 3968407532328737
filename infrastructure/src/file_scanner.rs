use memmap2::Mmap;
use rayon::prelude::*;
use shared::types::Result;
use shared::utils::is_supported_file;
use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Walks the document directory and splits files into embeddable chunks.
pub struct FileScanner {
    root_path: PathBuf,
    ignored_dirs: HashSet<String>,
    max_file_bytes: u64,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FileScanner {
    pub fn new(root_path: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            root_path: root_path.into(),
            ignored_dirs: [".git", "target", "node_modules", ".cache", "__pycache__"]
                .into_iter()
                .map(String::from)
                .collect(),
            max_file_bytes: 2 * 1024 * 1024,
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
        }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn scan_files(&self) -> Result<Vec<FileScanResult>> {
        let files = self.collect_files()?;
        self.scan_paths(&files)
    }

    pub fn scan_paths(&self, paths: &[PathBuf]) -> Result<Vec<FileScanResult>> {
        let results: Vec<Result<FileScanResult>> = paths
            .par_iter()
            .map(|path| self.load_and_chunk_file(path))
            .collect();
        results.into_iter().collect()
    }

    /// Supported files under the root, sorted for a stable ingestion order.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        self.collect_files_recursive(&self.root_path, &mut files)?;
        files.sort();
        Ok(files)
    }

    fn collect_files_recursive(&self, dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if self.ignored_dirs.contains(name) {
                        continue;
                    }
                }
                self.collect_files_recursive(&path, files)?;
            } else if is_supported_file(&path) {
                files.push(path);
            }
        }
        Ok(())
    }

    fn load_and_chunk_file(&self, path: &Path) -> Result<FileScanResult> {
        let source = path.to_string_lossy().to_string();
        let meta = path.metadata()?;
        if meta.len() > self.max_file_bytes {
            tracing::warn!(source = %source, bytes = meta.len(), "Skipping oversized file");
            return Ok(FileScanResult {
                source,
                hash: String::new(),
                chunks: Vec::new(),
            });
        }
        if meta.len() == 0 {
            return Ok(FileScanResult {
                source,
                hash: String::new(),
                chunks: Vec::new(),
            });
        }
        let file = File::open(path)?;
        // SAFETY: the mapping is read-only and dropped before this function returns.
        let mmap = unsafe { Mmap::map(&file)? };
        // Lossy conversion ensures non-UTF8 bytes don't crash scanning.
        let content = String::from_utf8_lossy(&mmap).into_owned();
        let hash = format!("{:x}", md5::compute(content.as_bytes()));
        let chunks = self.chunk_text(&content, &source);
        Ok(FileScanResult {
            source,
            hash,
            chunks,
        })
    }

    /// Packs paragraphs up to `chunk_size` bytes; paragraphs larger than that
    /// are cut into overlapping fixed windows. Duplicate chunks are dropped.
    pub fn chunk_text(&self, text: &str, source: &str) -> Vec<FileChunk> {
        let mut chunks = Vec::new();
        let mut seen_hashes = HashSet::new();
        let mut push = |chunks: &mut Vec<FileChunk>, chunk_text: &str, start_offset: usize| {
            let trimmed = chunk_text.trim();
            if trimmed.is_empty() {
                return;
            }
            let hash = format!("{:x}", md5::compute(trimmed.as_bytes()));
            if seen_hashes.insert(hash) {
                chunks.push(FileChunk {
                    source: source.to_string(),
                    text: trimmed.to_string(),
                    start_offset,
                });
            }
        };

        let mut current = String::new();
        let mut current_start = 0;

        for paragraph in text.split("\n\n") {
            let offset = paragraph.as_ptr() as usize - text.as_ptr() as usize;
            if paragraph.trim().is_empty() {
                continue;
            }

            if paragraph.len() > self.chunk_size {
                push(&mut chunks, &current, current_start);
                current.clear();
                for (start, window) in self.fixed_windows(paragraph) {
                    push(&mut chunks, window, offset + start);
                }
                continue;
            }

            if !current.is_empty() && current.len() + 2 + paragraph.len() > self.chunk_size {
                push(&mut chunks, &current, current_start);
                current.clear();
            }
            if current.is_empty() {
                current_start = offset;
            } else {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        push(&mut chunks, &current, current_start);
        chunks
    }

    /// `(byte offset, window)` pairs cut on UTF-8 boundaries.
    fn fixed_windows<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        let mut windows = Vec::with_capacity(text.len() / (self.chunk_size - self.chunk_overlap) + 1);
        let mut start = 0;
        while start < text.len() {
            let mut end = (start + self.chunk_size).min(text.len());
            while end < text.len() && !text.is_char_boundary(end) {
                end += 1;
            }
            windows.push((start, &text[start..end]));
            if end == text.len() {
                break;
            }
            let mut next_start = end.saturating_sub(self.chunk_overlap);
            while next_start > 0 && !text.is_char_boundary(next_start) {
                next_start -= 1;
            }
            start = next_start.max(start + 1);
            while start < text.len() && !text.is_char_boundary(start) {
                start += 1;
            }
        }
        windows
    }
}

#[derive(Debug, Clone)]
pub struct FileChunk {
    pub source: String,
    pub text: String,
    pub start_offset: usize,
}

#[derive(Debug, Clone)]
pub struct FileScanResult {
    pub source: String,
    pub hash: String,
    pub chunks: Vec<FileChunk>,
}
