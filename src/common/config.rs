/// Size of a page in bytes (1 KB)
pub const PAGE_SIZE: usize = 1024;

/// Default number of slots in a page cache
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

/// Bytes of an on-disk `i32`
pub const INT_SIZE: usize = 4;

/// Node header: key count followed by the sibling link (leaf) or the
/// leading child pointer (internal node).
pub const NODE_HEADER_SIZE: usize = 2 * INT_SIZE;

/// Leaf entry: key + RecordId(page, slot)
pub const LEAF_ENTRY_SIZE: usize = 3 * INT_SIZE;

/// Internal entry: key + child PageId
pub const INTERNAL_ENTRY_SIZE: usize = 2 * INT_SIZE;

/// Maximum entries a leaf page can hold
pub const LEAF_MAX_KEYS: usize = (PAGE_SIZE - NODE_HEADER_SIZE) / LEAF_ENTRY_SIZE;

/// Maximum separator keys an internal page can hold
pub const INTERNAL_MAX_KEYS: usize = (PAGE_SIZE - NODE_HEADER_SIZE) / INTERNAL_ENTRY_SIZE;

/// Smallest leaf capacity that still splits into two non-empty halves
pub const MIN_LEAF_KEYS: usize = 2;

/// Smallest internal capacity that leaves a key on both sides of a promoted separator
pub const MIN_INTERNAL_KEYS: usize = 3;

/// Runtime knobs for a `TreeIndex`.
///
/// Capacities are clamped into `[MIN_*_KEYS, *_MAX_KEYS]`, so the on-disk
/// format never changes; lowering them only makes nodes split earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    pub leaf_capacity: usize,
    pub internal_capacity: usize,
    pub cache_capacity: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            leaf_capacity: LEAF_MAX_KEYS,
            internal_capacity: INTERNAL_MAX_KEYS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl IndexOptions {
    pub fn with_leaf_capacity(mut self, capacity: usize) -> Self {
        self.leaf_capacity = capacity;
        self
    }

    pub fn with_internal_capacity(mut self, capacity: usize) -> Self {
        self.internal_capacity = capacity;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub(crate) fn leaf_keys(&self) -> usize {
        self.leaf_capacity.clamp(MIN_LEAF_KEYS, LEAF_MAX_KEYS)
    }

    pub(crate) fn internal_keys(&self) -> usize {
        self.internal_capacity.clamp(MIN_INTERNAL_KEYS, INTERNAL_MAX_KEYS)
    }
}
