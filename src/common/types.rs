use std::fmt;

use super::config::PAGE_SIZE;

/// Raw contents of one disk page.
pub type Page = [u8; PAGE_SIZE];

/// Page identifier type - identifies a page within one index file.
///
/// Stored on disk as a little-endian `i32`. Page 0 holds tree metadata, so
/// 0 doubles as the "no page" marker inside node links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PageId(pub i32);

impl PageId {
    /// The metadata page; never holds a node.
    pub const META: PageId = PageId(0);

    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }

    /// Byte offset of this page within its file. Only meaningful for
    /// non-negative ids.
    pub fn offset(&self) -> u64 {
        self.0 as u64 * PAGE_SIZE as u64
    }

    /// Whether this id may hold a tree node.
    pub fn is_node(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageId({})", self.0)
    }
}

/// Slot identifier within a record-store page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SlotId(pub i32);

impl SlotId {
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(&self) -> i32 {
        self.0
    }
}

/// Record identifier - locates a tuple in the external record store.
///
/// The index stores it inside leaf entries but never interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_id: SlotId,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_id: SlotId) -> Self {
        Self { page_id, slot_id }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_id.0, self.slot_id.0)
    }
}

/// Identifies one open `PageStore` inside a (possibly shared) page cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// Logical clock value used to order page cache accesses
pub type Timestamp = u64;
