use std::cmp::Ordering;

use crate::common::codec::{read_i32, write_i32};
use crate::common::{
    IndexError, Page, PageId, RecordId, Result, SlotId, INT_SIZE, LEAF_ENTRY_SIZE, LEAF_MAX_KEYS,
    MIN_LEAF_KEYS, NODE_HEADER_SIZE, PAGE_SIZE,
};
use crate::storage::disk::PageStore;

// Leaf page layout:
// | key count (4) | next sibling (4) | key (4) rid.page (4) rid.slot (4) | ...
const KEY_COUNT_OFFSET: usize = 0;
const NEXT_SIBLING_OFFSET: usize = INT_SIZE;

/// Byte offset of entry `index`
#[inline]
fn entry_offset(index: usize) -> usize {
    NODE_HEADER_SIZE + index * LEAF_ENTRY_SIZE
}

/// A leaf page: sorted `(key, RecordId)` entries plus a link to the next leaf.
#[derive(Clone)]
pub struct LeafNode {
    data: Box<Page>,
    /// Entries allowed before `insert` reports `NodeFull`
    capacity: usize,
}

impl LeafNode {
    /// Creates an empty leaf (all-zero page).
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
            capacity: LEAF_MAX_KEYS,
        }
    }

    /// Limits how many entries this node accepts. Clamped to what fits in a page.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(MIN_LEAF_KEYS, LEAF_MAX_KEYS);
        self
    }

    /// Decodes a leaf from raw page bytes, checking the key count against
    /// the page layout.
    pub fn decode(page: &Page) -> Result<Self> {
        let key_count = read_i32(page, KEY_COUNT_OFFSET);
        if key_count < 0 || key_count as usize > LEAF_MAX_KEYS {
            return Err(IndexError::IndexCorrupted(format!(
                "leaf key count {} outside 0..={}",
                key_count, LEAF_MAX_KEYS
            )));
        }

        Ok(Self {
            data: Box::new(*page),
            capacity: LEAF_MAX_KEYS,
        })
    }

    /// Returns the raw page bytes.
    pub fn encode(&self) -> &Page {
        &self.data
    }

    /// Reads and decodes the leaf stored at `page_id`.
    pub fn read(store: &PageStore, page_id: PageId) -> Result<Self> {
        if !page_id.is_node() {
            return Err(IndexError::InvalidPageId(page_id));
        }
        let page = store.read_page(page_id)?;
        Self::decode(&page)
    }

    /// Writes this leaf to `page_id`.
    pub fn write(&self, store: &mut PageStore, page_id: PageId) -> Result<()> {
        store.write(page_id, &self.data)
    }

    pub fn key_count(&self) -> usize {
        read_i32(&self.data[..], KEY_COUNT_OFFSET) as usize
    }

    fn set_key_count(&mut self, count: usize) {
        write_i32(&mut self.data[..], KEY_COUNT_OFFSET, count as i32);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.key_count() >= self.capacity
    }

    /// The next leaf in key order, if any.
    pub fn next_sibling(&self) -> Option<PageId> {
        let pid = read_i32(&self.data[..], NEXT_SIBLING_OFFSET);
        (pid > 0).then_some(PageId::new(pid))
    }

    pub fn set_next_sibling(&mut self, page_id: Option<PageId>) {
        let pid = page_id.map(|p| p.as_i32()).unwrap_or(0);
        write_i32(&mut self.data[..], NEXT_SIBLING_OFFSET, pid);
    }

    fn key_at(&self, index: usize) -> i32 {
        read_i32(&self.data[..], entry_offset(index))
    }

    fn rid_at(&self, index: usize) -> RecordId {
        let offset = entry_offset(index);
        RecordId::new(
            PageId::new(read_i32(&self.data[..], offset + INT_SIZE)),
            SlotId::new(read_i32(&self.data[..], offset + 2 * INT_SIZE)),
        )
    }

    fn write_entry(&mut self, index: usize, key: i32, rid: RecordId) {
        let offset = entry_offset(index);
        write_i32(&mut self.data[..], offset, key);
        write_i32(&mut self.data[..], offset + INT_SIZE, rid.page_id.as_i32());
        write_i32(&mut self.data[..], offset + 2 * INT_SIZE, rid.slot_id.as_i32());
    }

    /// Reads the entry at `index`.
    pub fn read_entry(&self, index: usize) -> Result<(i32, RecordId)> {
        let key_count = self.key_count();
        if index >= key_count {
            return Err(IndexError::InvalidEntryIndex { index, key_count });
        }
        Ok((self.key_at(index), self.rid_at(index)))
    }

    /// All entries in key order.
    pub fn entries(&self) -> Vec<(i32, RecordId)> {
        (0..self.key_count())
            .map(|i| (self.key_at(i), self.rid_at(i)))
            .collect()
    }

    /// Searches for `search_key`.
    ///
    /// Returns `Ok(index)` of the matching entry, or `Err(index)` of the first
    /// entry with a larger key (`key_count()` if none). The `Err` index is both
    /// the insertion point and where a range scan starting at `search_key`
    /// begins.
    pub fn locate(&self, search_key: i32) -> std::result::Result<usize, usize> {
        let mut left = 0;
        let mut right = self.key_count();

        while left < right {
            let mid = left + (right - left) / 2;
            match self.key_at(mid).cmp(&search_key) {
                Ordering::Less => left = mid + 1,
                Ordering::Equal => return Ok(mid),
                Ordering::Greater => right = mid,
            }
        }

        Err(left)
    }

    /// Inserts `(key, rid)` in key order.
    ///
    /// An existing key is left untouched and reported as success, even when
    /// the node is full. Returns `IndexError::NodeFull` when a new key does
    /// not fit; the caller must split.
    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        let pos = match self.locate(key) {
            Ok(_) => return Ok(()),
            Err(pos) => pos,
        };

        let count = self.key_count();
        if count >= self.capacity {
            return Err(IndexError::NodeFull);
        }

        let start = entry_offset(pos);
        let end = entry_offset(count);
        self.data.copy_within(start..end, start + LEAF_ENTRY_SIZE);
        self.write_entry(pos, key, rid);
        self.set_key_count(count + 1);
        Ok(())
    }

    /// Replaces the node's entries with `entries` and zeroes the unused tail.
    fn rewrite(&mut self, entries: &[(i32, RecordId)]) {
        for (i, &(key, rid)) in entries.iter().enumerate() {
            self.write_entry(i, key, rid);
        }
        self.data[entry_offset(entries.len())..].fill(0);
        self.set_key_count(entries.len());
    }

    /// Inserts `(key, rid)` into a full node by splitting it with `sibling`,
    /// which must be empty. Either precondition failing is `InvalidSplit`.
    ///
    /// Of the `n` entries (existing plus new), this node keeps the
    /// `ceil(n / 2)` smallest and the sibling receives the rest, so the left
    /// half is never smaller than the right. Returns the sibling's first key,
    /// the separator to insert into the parent. Sibling links are left to the
    /// caller.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        rid: RecordId,
        sibling: &mut LeafNode,
    ) -> Result<i32> {
        if !self.is_full() {
            return Err(IndexError::InvalidSplit(format!(
                "leaf holds {} of {} entries",
                self.key_count(),
                self.capacity
            )));
        }
        if sibling.key_count() != 0 {
            return Err(IndexError::InvalidSplit(
                "leaf sibling is not empty".to_string(),
            ));
        }

        let mut entries = self.entries();
        if let Err(pos) = self.locate(key) {
            entries.insert(pos, (key, rid));
        }

        let left_count = entries.len().div_ceil(2);
        let (left, right) = entries.split_at(left_count);
        self.rewrite(left);
        sibling.rewrite(right);

        Ok(right[0].0)
    }
}

impl Default for LeafNode {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LeafNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeafNode")
            .field("key_count", &self.key_count())
            .field("next_sibling", &self.next_sibling())
            .field("keys", &self.entries().iter().map(|e| e.0).collect::<Vec<_>>())
            .finish()
    }
}
