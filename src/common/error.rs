use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::types::{PageId, RecordId};

/// Index error types
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to open {}: {source}", path.display())]
    OpenFailed { path: PathBuf, source: io::Error },

    #[error("Failed to read {page_id}: {source}")]
    ReadFailed { page_id: PageId, source: io::Error },

    #[error("Failed to write {page_id}: {source}")]
    WriteFailed { page_id: PageId, source: io::Error },

    #[error("Failed to seek to {page_id}: {source}")]
    SeekFailed { page_id: PageId, source: io::Error },

    #[error("Failed to close page file: {0}")]
    CloseFailed(io::Error),

    #[error("Invalid page ID: {0}")]
    InvalidPageId(PageId),

    #[error("Invalid file mode: {0:?}")]
    InvalidMode(String),

    #[error("Failed to read load input at line {line}: {source}")]
    LoadReadFailed { line: usize, source: io::Error },

    #[error("Invalid load file format at line {line}: {reason}")]
    InvalidFileFormat { line: usize, reason: String },

    /// Raised by node inserts when the page has no room left. The tree
    /// answers it with a split, so it never leaves `TreeIndex`.
    #[error("Node is full")]
    NodeFull,

    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    #[error("Entry index {index} out of range for node with {key_count} keys")]
    InvalidEntryIndex { index: usize, key_count: usize },

    #[error("Index corrupted: {0}")]
    IndexCorrupted(String),

    #[error("Index is opened read-only")]
    ReadOnly,

    #[error("Record {0} not found")]
    RecordNotFound(RecordId),
}

pub type Result<T> = std::result::Result<T, IndexError>;
