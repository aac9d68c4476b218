use crate::common::{IndexError, PageId, RecordId, Result, SlotId, INT_SIZE, PAGE_SIZE};

/// Longest value a fixed-size record slot holds
pub const MAX_VALUE_LENGTH: usize = 100;

/// Fixed-size record slots per record-file page: key + value, after a
/// 4-byte page header.
pub const RECORDS_PER_PAGE: usize = (PAGE_SIZE - INT_SIZE) / (INT_SIZE + MAX_VALUE_LENGTH);

/// Append-only tuple storage addressed by `RecordId`.
///
/// The index only carries the locators this hands out; it never looks
/// inside them.
pub trait RecordStore {
    /// Stores `(key, value)` and returns its locator.
    fn append(&mut self, key: i32, value: &str) -> Result<RecordId>;

    /// Reads the record at `rid`.
    fn read(&self, rid: RecordId) -> Result<(i32, String)>;

    /// Locator the next `append` will return.
    fn end_rid(&self) -> RecordId;
}

/// In-memory `RecordStore` that hands out locators the way a paged record
/// file would: `RECORDS_PER_PAGE` slots per page, pages numbered from 0.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: Vec<(i32, String)>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn rid_for(position: usize) -> RecordId {
        RecordId::new(
            PageId::new((position / RECORDS_PER_PAGE) as i32),
            SlotId::new((position % RECORDS_PER_PAGE) as i32),
        )
    }

    fn position_of(rid: RecordId) -> Option<usize> {
        let page = usize::try_from(rid.page_id.as_i32()).ok()?;
        let slot = usize::try_from(rid.slot_id.as_i32()).ok()?;
        if slot >= RECORDS_PER_PAGE {
            return None;
        }
        Some(page * RECORDS_PER_PAGE + slot)
    }
}

impl RecordStore for MemoryRecordStore {
    fn append(&mut self, key: i32, value: &str) -> Result<RecordId> {
        let rid = self.end_rid();
        let value: String = value.chars().take(MAX_VALUE_LENGTH).collect();
        self.records.push((key, value));
        Ok(rid)
    }

    fn read(&self, rid: RecordId) -> Result<(i32, String)> {
        Self::position_of(rid)
            .and_then(|pos| self.records.get(pos))
            .cloned()
            .ok_or(IndexError::RecordNotFound(rid))
    }

    fn end_rid(&self) -> RecordId {
        Self::rid_for(self.records.len())
    }
}
