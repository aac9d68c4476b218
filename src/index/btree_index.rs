use std::ops::{Bound, RangeBounds};
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::buffer::PageCache;
use crate::common::codec::{read_i32, write_i32};
use crate::common::{IndexError, IndexOptions, Page, PageId, RecordId, Result, INT_SIZE, PAGE_SIZE};
use crate::storage::disk::{OpenMode, PageStore};

use super::btree_iterator::IndexIterator;
use super::internal_node::InternalNode;
use super::leaf_node::LeafNode;

// Metadata page layout: | root pid (4) | height (4) | next page id (4) | zero padding
const ROOT_PID_OFFSET: usize = 0;
const HEIGHT_OFFSET: usize = INT_SIZE;
const NEXT_PAGE_ID_OFFSET: usize = 2 * INT_SIZE;

/// Tree bookkeeping persisted in page 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeMeta {
    pub root_pid: PageId,
    /// Number of levels; 1 means the root is a leaf
    pub height: i32,
    /// Next unused page id. Ids are never reused.
    pub next_page_id: PageId,
}

impl TreeMeta {
    /// A single empty leaf root at page 1.
    fn fresh() -> Self {
        Self {
            root_pid: PageId::new(1),
            height: 1,
            next_page_id: PageId::new(2),
        }
    }

    fn decode(page: &Page) -> Self {
        Self {
            root_pid: PageId::new(read_i32(page, ROOT_PID_OFFSET)),
            height: read_i32(page, HEIGHT_OFFSET),
            next_page_id: PageId::new(read_i32(page, NEXT_PAGE_ID_OFFSET)),
        }
    }

    fn encode(&self) -> Box<Page> {
        let mut page = Box::new([0u8; PAGE_SIZE]);
        write_i32(&mut page[..], ROOT_PID_OFFSET, self.root_pid.as_i32());
        write_i32(&mut page[..], HEIGHT_OFFSET, self.height);
        write_i32(&mut page[..], NEXT_PAGE_ID_OFFSET, self.next_page_id.as_i32());
        page
    }

    fn validate(&self, end_page_id: PageId) -> Result<()> {
        if self.height < 1 {
            return Err(IndexError::IndexCorrupted(format!(
                "tree height {} is below 1",
                self.height
            )));
        }
        // Every level needs at least one node page below next_page_id
        if i64::from(self.height) > i64::from(self.next_page_id.as_i32()) - 1 {
            return Err(IndexError::IndexCorrupted(format!(
                "tree height {} exceeds the {} allocated node pages",
                self.height,
                i64::from(self.next_page_id.as_i32()) - 1
            )));
        }
        if !self.root_pid.is_node() || self.root_pid >= self.next_page_id {
            return Err(IndexError::IndexCorrupted(format!(
                "root {} outside allocated pages (next {})",
                self.root_pid, self.next_page_id
            )));
        }
        if self.next_page_id > end_page_id {
            return Err(IndexError::IndexCorrupted(format!(
                "next page {} beyond end of file {}",
                self.next_page_id, end_page_id
            )));
        }
        Ok(())
    }
}

/// A position in the leaf level: entry `eid` of leaf `pid`.
///
/// `ancestors` lists the internal pages visited on the way down, root first.
/// Cursors are transient and become stale once the tree is modified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCursor {
    pub pid: PageId,
    pub eid: usize,
    pub ancestors: Vec<PageId>,
}

/// Outcome of `TreeIndex::locate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocateResult {
    /// On a hit, points at the matching entry; on a miss, at the first entry
    /// with a larger key (possibly one past the leaf's last entry).
    pub cursor: IndexCursor,
    pub found: bool,
}

/// Disk-resident B+Tree mapping `i32` keys to `RecordId`s.
///
/// Page 0 holds `TreeMeta`; every other page holds one leaf or internal node.
/// Leaves form a forward-linked list in key order for range scans. Duplicate
/// keys are ignored (first writer wins) and nothing is ever deleted, so the
/// file only grows.
pub struct TreeIndex {
    store: PageStore,
    meta: TreeMeta,
    options: IndexOptions,
}

impl TreeIndex {
    /// Opens (or, in `ReadWrite` mode, creates) the index at `path`.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with_options(path, mode, IndexOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        options: IndexOptions,
    ) -> Result<Self> {
        let cache = Arc::new(PageCache::new(options.cache_capacity));
        let store = PageStore::open_with_cache(path, mode, cache)?;
        Self::with_store(store, options)
    }

    /// Builds an index on an already opened page store, e.g. one sharing its
    /// cache with other stores.
    pub fn with_store(mut store: PageStore, options: IndexOptions) -> Result<Self> {
        let meta = if store.end_page_id().as_i32() == 0 {
            if !store.mode().is_writable() {
                return Err(IndexError::IndexCorrupted(format!(
                    "{} has no metadata page",
                    store.path().display()
                )));
            }
            let meta = TreeMeta::fresh();
            LeafNode::new().write(&mut store, meta.root_pid)?;
            debug!(path = %store.path().display(), "initialized empty index");
            meta
        } else {
            let page = store.read_page(PageId::META)?;
            let meta = TreeMeta::decode(&page);
            meta.validate(store.end_page_id())?;
            debug!(
                path = %store.path().display(),
                root = %meta.root_pid,
                height = meta.height,
                next_page_id = %meta.next_page_id,
                "loaded index metadata"
            );
            meta
        };

        Ok(Self {
            store,
            meta,
            options,
        })
    }

    /// Writes the metadata page when opened for writing, then closes the file.
    pub fn close(mut self) -> Result<()> {
        if self.store.mode().is_writable() {
            let page = self.meta.encode();
            self.store.write(PageId::META, &page)?;
            debug!(
                root = %self.meta.root_pid,
                height = self.meta.height,
                next_page_id = %self.meta.next_page_id,
                "flushed index metadata"
            );
        }
        self.store.close()
    }

    pub fn root_page_id(&self) -> PageId {
        self.meta.root_pid
    }

    pub fn height(&self) -> i32 {
        self.meta.height
    }

    pub fn next_page_id(&self) -> PageId {
        self.meta.next_page_id
    }

    pub fn meta(&self) -> TreeMeta {
        self.meta
    }

    pub fn options(&self) -> &IndexOptions {
        &self.options
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    fn read_leaf(&self, page_id: PageId) -> Result<LeafNode> {
        Ok(LeafNode::read(&self.store, page_id)?.with_capacity(self.options.leaf_keys()))
    }

    fn read_internal(&self, page_id: PageId) -> Result<InternalNode> {
        Ok(InternalNode::read(&self.store, page_id)?
            .with_capacity(self.options.internal_keys()))
    }

    fn allocate_page(&mut self) -> Result<PageId> {
        let page_id = self.meta.next_page_id;
        let next = page_id
            .as_i32()
            .checked_add(1)
            .ok_or_else(|| IndexError::IndexCorrupted("page ids exhausted".to_string()))?;
        self.meta.next_page_id = PageId::new(next);
        Ok(page_id)
    }

    /// Descends from the root to the leaf whose range holds `search_key`.
    ///
    /// The returned cursor is usable whether or not the key was found: on a
    /// miss it sits where the key would be inserted, which is also where a
    /// scan for keys `>= search_key` starts.
    pub fn locate(&self, search_key: i32) -> Result<LocateResult> {
        let mut pid = self.meta.root_pid;
        let mut ancestors = Vec::new();

        for _ in 1..self.meta.height {
            let node = self.read_internal(pid)?;
            ancestors.push(pid);
            pid = node.locate_child(search_key);
        }

        let leaf = self.read_leaf(pid)?;
        let (found, eid) = match leaf.locate(search_key) {
            Ok(eid) => (true, eid),
            Err(eid) => (false, eid),
        };

        Ok(LocateResult {
            cursor: IndexCursor {
                pid,
                eid,
                ancestors,
            },
            found,
        })
    }

    /// Returns the entry under `cursor` and advances it, hopping to the next
    /// leaf when the current one is exhausted. `Ok(None)` marks the end of the
    /// tree; the cursor is then left in place, so further calls keep
    /// returning `Ok(None)`.
    pub fn read_forward(&self, cursor: &mut IndexCursor) -> Result<Option<(i32, RecordId)>> {
        let mut leaf = self.read_leaf(cursor.pid)?;

        while cursor.eid >= leaf.key_count() {
            let Some(next) = leaf.next_sibling() else {
                return Ok(None);
            };
            leaf = self.read_leaf(next)?;
            cursor.pid = next;
            cursor.eid = 0;
        }

        let entry = leaf.read_entry(cursor.eid)?;
        cursor.eid += 1;
        Ok(Some(entry))
    }

    /// Point lookup.
    pub fn get(&self, key: i32) -> Result<Option<RecordId>> {
        let LocateResult { mut cursor, found } = self.locate(key)?;
        if !found {
            return Ok(None);
        }
        Ok(self.read_forward(&mut cursor)?.map(|(_, rid)| rid))
    }

    /// Iterates entries whose keys fall in `range`, in ascending key order.
    pub fn scan<R: RangeBounds<i32>>(&self, range: R) -> Result<IndexIterator<'_>> {
        let cursor = match range.start_bound() {
            Bound::Included(&start) => self.locate(start)?.cursor,
            Bound::Excluded(&start) => {
                let LocateResult { mut cursor, found } = self.locate(start)?;
                if found {
                    cursor.eid += 1;
                }
                cursor
            }
            Bound::Unbounded => self.locate(i32::MIN)?.cursor,
        };

        Ok(IndexIterator::new(self, cursor, range.end_bound().cloned()))
    }

    /// Collects every entry whose key falls in `range`.
    pub fn range_scan<R: RangeBounds<i32>>(&self, range: R) -> Result<Vec<(i32, RecordId)>> {
        self.scan(range)?.collect()
    }

    /// Inserts `(key, rid)`. Inserting an existing key is a no-op that keeps
    /// the first `RecordId`.
    ///
    /// A full leaf is split and the separator pushed into its parent; full
    /// ancestors split in turn, walking the path recorded by `locate` upward.
    /// If the root splits, a new root is allocated and the tree grows by one
    /// level.
    pub fn insert(&mut self, key: i32, rid: RecordId) -> Result<()> {
        if !self.store.mode().is_writable() {
            return Err(IndexError::ReadOnly);
        }

        let LocateResult { cursor, found } = self.locate(key)?;
        if found {
            return Ok(());
        }

        let leaf_pid = cursor.pid;
        let mut leaf = self.read_leaf(leaf_pid)?;
        match leaf.insert(key, rid) {
            Ok(()) => return leaf.write(&mut self.store, leaf_pid),
            Err(IndexError::NodeFull) => {}
            Err(e) => return Err(e),
        }

        let mut sibling = LeafNode::new().with_capacity(self.options.leaf_keys());
        let mut separator = leaf.insert_and_split(key, rid, &mut sibling)?;
        let mut sibling_pid = self.allocate_page()?;

        sibling.set_next_sibling(leaf.next_sibling());
        leaf.set_next_sibling(Some(sibling_pid));
        leaf.write(&mut self.store, leaf_pid)?;
        sibling.write(&mut self.store, sibling_pid)?;
        debug!(
            leaf = %leaf_pid,
            sibling = %sibling_pid,
            separator,
            left = leaf.key_count(),
            right = sibling.key_count(),
            "split leaf"
        );

        let mut split_pid = leaf_pid;
        for &parent_pid in cursor.ancestors.iter().rev() {
            let mut parent = self.read_internal(parent_pid)?;
            match parent.insert(separator, sibling_pid) {
                Ok(()) => return parent.write(&mut self.store, parent_pid),
                Err(IndexError::NodeFull) => {}
                Err(e) => return Err(e),
            }

            let mut parent_sibling = InternalNode::new().with_capacity(self.options.internal_keys());
            separator = parent.insert_and_split(separator, sibling_pid, &mut parent_sibling)?;
            sibling_pid = self.allocate_page()?;
            parent.write(&mut self.store, parent_pid)?;
            parent_sibling.write(&mut self.store, sibling_pid)?;
            debug!(
                node = %parent_pid,
                sibling = %sibling_pid,
                separator,
                "split internal node"
            );

            split_pid = parent_pid;
        }

        self.grow_root(split_pid, separator, sibling_pid)
    }

    /// Puts a new root above the old root `left` and its new sibling `right`.
    fn grow_root(&mut self, left: PageId, separator: i32, right: PageId) -> Result<()> {
        debug_assert_eq!(left, self.meta.root_pid);

        let root_pid = self.allocate_page()?;
        let mut root = InternalNode::new().with_capacity(self.options.internal_keys());
        root.initialize_root(left, separator, right);
        root.write(&mut self.store, root_pid)?;

        self.meta.root_pid = root_pid;
        self.meta.height += 1;
        debug!(
            root = %root_pid,
            height = self.meta.height,
            separator,
            "grew new root"
        );
        Ok(())
    }
}
