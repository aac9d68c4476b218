//! Bruin Index - a disk-resident B+Tree over integer keys in Rust
//!
//! This crate maps `i32` keys to opaque record locators (`RecordId`) through
//! a B+Tree stored in a single file of fixed-size 1 KB pages. Pages are read
//! through a small approximate-LRU cache that several files may share.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Storage Layer** (`storage`): Page-granular file I/O
//!   - `PageStore`: Reads and writes whole pages, tracks the end of the file
//!   - `OpenMode`: Read-only or read-write access
//!
//! - **Buffer** (`buffer`): Read caching
//!   - `PageCache`: Fixed-slot cache keyed by `(FileId, PageId)` with
//!     least-recently-stamped eviction
//!
//! - **Index** (`index`): The B+Tree
//!   - `LeafNode` / `InternalNode`: Binary page layouts plus insert and split
//!   - `TreeIndex`: Locate, forward iteration and insert with split propagation
//!   - `IndexIterator`: Bounded range scans over the leaf chain
//!
//! - **Record** (`record`): Collaborators at the index boundary
//!   - `RecordStore`: Where the records behind each `RecordId` live
//!   - `load`: Bulk loading of `key, value` lines
//!
//! # Example
//!
//! ```rust,no_run
//! use bruin_index::index::TreeIndex;
//! use bruin_index::storage::disk::OpenMode;
//! use bruin_index::{PageId, RecordId, SlotId};
//!
//! let mut index = TreeIndex::open("movie.idx", OpenMode::ReadWrite).unwrap();
//! index
//!     .insert(42, RecordId::new(PageId::new(4), SlotId::new(2)))
//!     .unwrap();
//!
//! for entry in index.scan(10..=50).unwrap() {
//!     let (key, rid) = entry.unwrap();
//!     println!("{} -> {}", key, rid);
//! }
//!
//! // Persists the root, height and page counter
//! index.close().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod index;
pub mod record;
pub mod storage;

// Re-export commonly used types at the crate root
pub use common::{IndexError, IndexOptions, PageId, RecordId, Result, SlotId};
pub use index::TreeIndex;
pub use storage::disk::OpenMode;
