use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use crate::common::{FileId, Page, PageId, Timestamp, DEFAULT_CACHE_CAPACITY};

/// One occupied cache slot
struct CacheSlot {
    file_id: FileId,
    page_id: PageId,
    /// Clock value of the most recent hit or fill
    last_access: Timestamp,
    data: Box<Page>,
}

struct CacheState {
    slots: Vec<Option<CacheSlot>>,
    /// Monotonic access clock, bumped on every hit and fill
    clock: Timestamp,
}

impl CacheState {
    fn position(&self, file_id: FileId, page_id: PageId) -> Option<usize> {
        self.slots.iter().position(|slot| {
            slot.as_ref()
                .is_some_and(|s| s.file_id == file_id && s.page_id == page_id)
        })
    }

    /// Picks the slot a fill should land in: the page's own slot if it is
    /// already cached, else the first empty slot, else the least recently
    /// accessed one.
    fn victim(&self, file_id: FileId, page_id: PageId) -> usize {
        if let Some(idx) = self.position(file_id, page_id) {
            return idx;
        }

        let mut victim = 0;
        let mut oldest = Timestamp::MAX;
        for (idx, slot) in self.slots.iter().enumerate() {
            match slot {
                None => return idx,
                Some(s) if s.last_access < oldest => {
                    victim = idx;
                    oldest = s.last_access;
                }
                Some(_) => {}
            }
        }
        victim
    }
}

/// Fixed-capacity read cache for disk pages.
///
/// Slots are keyed by `(FileId, PageId)`, so a single cache can be shared by
/// several `PageStore`s through an `Arc`. Replacement is approximate LRU: a
/// miss scans every slot and takes an empty one if present, otherwise the
/// slot with the smallest access stamp. When shared, the space available to
/// any one file shrinks as other files fill slots.
pub struct PageCache {
    capacity: usize,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PageCache {
    /// Creates a cache with `capacity` slots. A capacity of zero disables
    /// caching: every lookup misses and fills are dropped.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);

        Self {
            capacity,
            state: Mutex::new(CacheState { slots, clock: 0 }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Copies the cached page into `buf` and refreshes its access stamp.
    /// Returns false on a miss, leaving `buf` untouched.
    pub fn get(&self, file_id: FileId, page_id: PageId, buf: &mut Page) -> bool {
        let mut state = self.state.lock();

        let Some(idx) = state.position(file_id, page_id) else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return false;
        };

        state.clock += 1;
        let stamp = state.clock;
        if let Some(slot) = state.slots[idx].as_mut() {
            slot.last_access = stamp;
            buf.copy_from_slice(&slot.data[..]);
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Stores a copy of a page freshly read from disk, evicting if needed.
    pub fn fill(&self, file_id: FileId, page_id: PageId, data: &Page) {
        if self.capacity == 0 {
            return;
        }

        let mut state = self.state.lock();
        state.clock += 1;
        let stamp = state.clock;
        let idx = state.victim(file_id, page_id);

        match &mut state.slots[idx] {
            Some(slot) => {
                if slot.file_id != file_id || slot.page_id != page_id {
                    trace!(
                        evicted_file = %slot.file_id,
                        evicted_page = %slot.page_id,
                        slot = idx,
                        "page cache eviction"
                    );
                }
                slot.file_id = file_id;
                slot.page_id = page_id;
                slot.last_access = stamp;
                slot.data.copy_from_slice(data);
            }
            empty => {
                *empty = Some(CacheSlot {
                    file_id,
                    page_id,
                    last_access: stamp,
                    data: Box::new(*data),
                });
            }
        }

        trace!(file = %file_id, page = %page_id, slot = idx, "page cache fill");
    }

    /// Drops the cached copy of one page, if any.
    pub fn invalidate(&self, file_id: FileId, page_id: PageId) -> bool {
        let mut state = self.state.lock();
        match state.position(file_id, page_id) {
            Some(idx) => {
                state.slots[idx] = None;
                true
            }
            None => false,
        }
    }

    /// Drops every slot belonging to `file_id`. Returns how many were freed.
    pub fn evict_file(&self, file_id: FileId) -> usize {
        let mut state = self.state.lock();
        let mut freed = 0;
        for slot in state.slots.iter_mut() {
            if slot.as_ref().is_some_and(|s| s.file_id == file_id) {
                *slot = None;
                freed += 1;
            }
        }
        freed
    }

    /// Whether the page is currently cached. Does not touch access stamps.
    pub fn contains(&self, file_id: FileId, page_id: PageId) -> bool {
        self.state.lock().position(file_id, page_id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.state.lock().slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of occupied slots held by one file.
    pub fn len_for(&self, file_id: FileId) -> usize {
        self.state
            .lock()
            .slots
            .iter()
            .filter(|s| s.as_ref().is_some_and(|s| s.file_id == file_id))
            .count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}
