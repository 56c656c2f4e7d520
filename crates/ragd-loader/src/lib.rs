//! ragd Loader - Document scanning and chunking
//!
//! Walks a document tree, extracts text per file type, splits it into
//! overlapping fixed-size chunks, and assigns each chunk a stable
//! identifier derived from its source path and position.
//!
//! Extraction failures are local: a file that cannot be read yields
//! zero chunks and the run continues.

pub mod extract;
pub mod split;

pub use extract::{extract_text, is_supported, SUPPORTED_EXTS};
pub use split::split_text;

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use ragd_core::config::ChunkingConfig;
use ragd_core::{Chunk, ChunkMetadata, PASSAGE_PREFIX};

/// Stable identifier for a source file: hex SHA-256 of its path.
///
/// The same path always yields the same id across runs and processes,
/// which is what makes re-ingestion idempotent.
pub fn file_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.display().to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunk identifier: `{file_id}-{index}`.
pub fn chunk_id(path: &Path, index: u32) -> String {
    format!("{}-{index}", file_id(path))
}

/// Loads documents from disk and turns them into indexable chunks.
pub struct DocumentLoader {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl DocumentLoader {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
        }
    }

    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Enumerate supported files under `root`, in a stable order.
    pub fn iter_files(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| is_supported(path))
            .collect()
    }

    /// Chunk a single file. An unreadable or corrupt file is logged and
    /// contributes zero chunks.
    pub fn load_file(&self, path: &Path) -> Vec<Chunk> {
        let text = match extract_text(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("skipping {}: {e}", path.display());
                return Vec::new();
            }
        };

        let source = path.display().to_string();
        split_text(&text, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, chunk_text)| {
                let index = i as u32;
                Chunk {
                    id: chunk_id(path, index),
                    text: format!("{PASSAGE_PREFIX}{chunk_text}"),
                    metadata: ChunkMetadata {
                        source: source.clone(),
                        chunk_index: index,
                    },
                }
            })
            .collect()
    }

    /// Chunk every supported file under `root`. An empty or missing
    /// directory yields an empty set, not an error.
    pub fn load_all(&self, root: &Path) -> Vec<Chunk> {
        let files = self.iter_files(root);
        tracing::info!("loading {} file(s) from {}", files.len(), root.display());

        let mut chunks = Vec::new();
        for path in files {
            chunks.extend(self.load_file(&path));
        }
        chunks
    }
}
