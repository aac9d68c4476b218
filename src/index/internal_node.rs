use crate::common::codec::{read_i32, write_i32};
use crate::common::{
    IndexError, Page, PageId, Result, INTERNAL_ENTRY_SIZE, INTERNAL_MAX_KEYS, INT_SIZE,
    MIN_INTERNAL_KEYS, NODE_HEADER_SIZE, PAGE_SIZE,
};
use crate::storage::disk::PageStore;

// Internal page layout:
// | key count (4) | child 0 (4) | key 0 (4) child 1 (4) | key 1 (4) child 2 (4) | ...
const KEY_COUNT_OFFSET: usize = 0;

#[inline]
fn key_offset(index: usize) -> usize {
    NODE_HEADER_SIZE + index * INTERNAL_ENTRY_SIZE
}

#[inline]
fn child_offset(index: usize) -> usize {
    INT_SIZE + index * INTERNAL_ENTRY_SIZE
}

/// A routing page: `key_count` separator keys interleaved with
/// `key_count + 1` child page ids.
///
/// Every key reachable through `child(i)` is `>= key(i - 1)` and `< key(i)`.
#[derive(Clone)]
pub struct InternalNode {
    data: Box<Page>,
    capacity: usize,
}

impl InternalNode {
    pub fn new() -> Self {
        Self {
            data: Box::new([0u8; PAGE_SIZE]),
            capacity: INTERNAL_MAX_KEYS,
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.clamp(MIN_INTERNAL_KEYS, INTERNAL_MAX_KEYS);
        self
    }

    pub fn decode(page: &Page) -> Result<Self> {
        let key_count = read_i32(page, KEY_COUNT_OFFSET);
        if key_count < 0 || key_count as usize > INTERNAL_MAX_KEYS {
            return Err(IndexError::IndexCorrupted(format!(
                "internal key count {} outside 0..={}",
                key_count, INTERNAL_MAX_KEYS
            )));
        }

        Ok(Self {
            data: Box::new(*page),
            capacity: INTERNAL_MAX_KEYS,
        })
    }

    pub fn encode(&self) -> &Page {
        &self.data
    }

    pub fn read(store: &PageStore, page_id: PageId) -> Result<Self> {
        if !page_id.is_node() {
            return Err(IndexError::InvalidPageId(page_id));
        }
        let page = store.read_page(page_id)?;
        Self::decode(&page)
    }

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

    /// Separator key `index`. Panics past the page.
    pub fn key(&self, index: usize) -> i32 {
        read_i32(&self.data[..], key_offset(index))
    }

    /// Child pointer `index`, `0..=key_count()`. Panics past the page.
    pub fn child(&self, index: usize) -> PageId {
        PageId::new(read_i32(&self.data[..], child_offset(index)))
    }

    fn set_key(&mut self, index: usize, key: i32) {
        write_i32(&mut self.data[..], key_offset(index), key);
    }

    fn set_child(&mut self, index: usize, child: PageId) {
        write_i32(&mut self.data[..], child_offset(index), child.as_i32());
    }

    pub fn keys(&self) -> Vec<i32> {
        (0..self.key_count()).map(|i| self.key(i)).collect()
    }

    pub fn children(&self) -> Vec<PageId> {
        (0..=self.key_count()).map(|i| self.child(i)).collect()
    }

    /// Number of separator keys `<= search_key`, i.e. the index of the child
    /// whose range holds `search_key`.
    fn child_index(&self, search_key: i32) -> usize {
        let mut left = 0;
        let mut right = self.key_count();

        while left < right {
            let mid = left + (right - left) / 2;
            if self.key(mid) <= search_key {
                left = mid + 1;
            } else {
                right = mid;
            }
        }

        left
    }

    /// Picks the child to descend into for `search_key`: the first child whose
    /// upper-bound separator is greater than the key, else the last child. A
    /// key equal to a separator routes right, where the separator's own entry
    /// lives.
    pub fn locate_child(&self, search_key: i32) -> PageId {
        self.child(self.child_index(search_key))
    }

    /// Inserts separator `key` with `child` as the pointer to its right.
    ///
    /// An existing key is a no-op success. Returns `IndexError::NodeFull` when
    /// no room is left.
    pub fn insert(&mut self, key: i32, child: PageId) -> Result<()> {
        let pos = self.child_index(key);
        if pos > 0 && self.key(pos - 1) == key {
            return Ok(());
        }

        let count = self.key_count();
        if count >= self.capacity {
            return Err(IndexError::NodeFull);
        }

        // (key i, child i + 1) pairs are contiguous, so one move shifts both
        let start = key_offset(pos);
        let end = key_offset(count);
        self.data.copy_within(start..end, start + INTERNAL_ENTRY_SIZE);
        self.set_key(pos, key);
        self.set_child(pos + 1, child);
        self.set_key_count(count + 1);
        Ok(())
    }

    /// Replaces the node's content and zeroes the unused tail.
    fn rewrite(&mut self, keys: &[i32], children: &[PageId]) {
        debug_assert_eq!(children.len(), keys.len() + 1);

        for (i, &child) in children.iter().enumerate() {
            self.set_child(i, child);
        }
        for (i, &key) in keys.iter().enumerate() {
            self.set_key(i, key);
        }
        self.data[key_offset(keys.len())..].fill(0);
        self.set_key_count(keys.len());
    }

    /// Inserts `(key, child)` into a full node by splitting it with `sibling`,
    /// which must be empty. Either precondition failing is `InvalidSplit`.
    ///
    /// Of the `n` separator keys (existing plus new), this node keeps the
    /// `n / 2` smallest, the next key is returned for insertion into the
    /// parent, and the sibling receives the rest. The returned key is kept in
    /// neither half, so the sibling's first key is strictly greater than it.
    pub fn insert_and_split(
        &mut self,
        key: i32,
        child: PageId,
        sibling: &mut InternalNode,
    ) -> Result<i32> {
        if !self.is_full() {
            return Err(IndexError::InvalidSplit(format!(
                "internal node holds {} of {} keys",
                self.key_count(),
                self.capacity
            )));
        }
        if sibling.key_count() != 0 {
            return Err(IndexError::InvalidSplit(
                "internal sibling is not empty".to_string(),
            ));
        }

        let mut keys = self.keys();
        let mut children = self.children();
        let pos = self.child_index(key);
        if pos == 0 || keys[pos - 1] != key {
            keys.insert(pos, key);
            children.insert(pos + 1, child);
        }

        let mid = keys.len() / 2;
        let promoted = keys[mid];
        self.rewrite(&keys[..mid], &children[..=mid]);
        sibling.rewrite(&keys[mid + 1..], &children[mid + 1..]);

        Ok(promoted)
    }

    /// Makes this node a two-child root: `left` holds keys `< key`, `right`
    /// holds keys `>= key`.
    pub fn initialize_root(&mut self, left: PageId, key: i32, right: PageId) {
        self.rewrite(&[key], &[left, right]);
    }
}

impl Default for InternalNode {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InternalNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InternalNode")
            .field("keys", &self.keys())
            .field("children", &self.children())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: i32) -> PageId {
        PageId::new(n)
    }

    /// Root over children 100, 101, ... with separators `keys`
    fn node_with(keys: &[i32], capacity: usize) -> InternalNode {
        let mut node = InternalNode::new().with_capacity(capacity);
        node.initialize_root(pid(100), keys[0], pid(101));
        for (i, &k) in keys.iter().enumerate().skip(1) {
            node.insert(k, pid(101 + i as i32)).unwrap();
        }
        node
    }

    #[test]
    fn test_internal_initialize_root() {
        let mut node = InternalNode::new();
        node.initialize_root(pid(1), 50, pid(2));

        assert_eq!(node.key_count(), 1);
        assert_eq!(node.keys(), vec![50]);
        assert_eq!(node.children(), vec![pid(1), pid(2)]);

        let page = node.encode();
        assert_eq!(read_i32(page, 0), 1);
        assert_eq!(read_i32(page, 4), 1);
        assert_eq!(read_i32(page, 8), 50);
        assert_eq!(read_i32(page, 12), 2);
    }

    #[test]
    fn test_internal_insert_out_of_order() {
        let mut node = InternalNode::new();
        node.initialize_root(pid(1), 50, pid(2));
        node.insert(80, pid(3)).unwrap();
        node.insert(20, pid(4)).unwrap();

        assert_eq!(node.keys(), vec![20, 50, 80]);
        // The new child sits to the right of its key
        assert_eq!(node.children(), vec![pid(1), pid(4), pid(2), pid(3)]);
    }

    #[test]
    fn test_internal_duplicate_insert_is_noop() {
        let mut node = node_with(&[10, 20, 30], 3);
        node.insert(20, pid(999)).unwrap();
        assert_eq!(node.keys(), vec![10, 20, 30]);
        assert!(!node.children().contains(&pid(999)));
    }

    #[test]
    fn test_internal_node_full() {
        let mut node = node_with(&[10, 20, 30], 3);
        assert!(node.is_full());
        assert!(matches!(node.insert(40, pid(7)), Err(IndexError::NodeFull)));
    }

    #[test]
    fn test_internal_locate_child() {
        let node = node_with(&[10, 20, 30], 10);
        // children: 100 | 10 | 101 | 20 | 102 | 30 | 103
        assert_eq!(node.locate_child(i32::MIN), pid(100));
        assert_eq!(node.locate_child(9), pid(100));
        assert_eq!(node.locate_child(10), pid(101));
        assert_eq!(node.locate_child(15), pid(101));
        assert_eq!(node.locate_child(20), pid(102));
        assert_eq!(node.locate_child(30), pid(103));
        assert_eq!(node.locate_child(i32::MAX), pid(103));
    }

    #[test]
    fn test_internal_split_promotes_middle_key() {
        let mut node = node_with(&[10, 20, 30], 3);
        let mut sibling = InternalNode::new().with_capacity(3);

        // keys 10 20 25 30 -> left [10, 20], promote 25, right [30]
        let promoted = node.insert_and_split(25, pid(200), &mut sibling).unwrap();

        assert_eq!(promoted, 25);
        assert_eq!(node.keys(), vec![10, 20]);
        assert_eq!(node.children(), vec![pid(100), pid(101), pid(102)]);
        assert_eq!(sibling.keys(), vec![30]);
        assert_eq!(sibling.children(), vec![pid(200), pid(103)]);
        assert!(sibling.key(0) > promoted);
    }

    #[test]
    fn test_internal_split_new_key_is_promoted_away() {
        let mut node = node_with(&[10, 20, 30, 40], 4);
        let mut sibling = InternalNode::new().with_capacity(4);

        // keys 10 20 25 30 40 -> left [10, 20], promote 25, right [30, 40]
        let promoted = node.insert_and_split(25, pid(200), &mut sibling).unwrap();

        assert_eq!(promoted, 25);
        assert_eq!(node.keys(), vec![10, 20]);
        assert_eq!(sibling.keys(), vec![30, 40]);
        assert_eq!(sibling.children(), vec![pid(200), pid(103), pid(104)]);
    }

    #[test]
    fn test_internal_split_full_page_balance() {
        let keys: Vec<i32> = (1..=INTERNAL_MAX_KEYS as i32).map(|k| k * 10).collect();
        let mut node = node_with(&keys, INTERNAL_MAX_KEYS);
        let mut sibling = InternalNode::new();

        let promoted = node.insert_and_split(5, pid(500), &mut sibling).unwrap();

        let left = node.key_count();
        let right = sibling.key_count();
        assert_eq!(left + right + 1, INTERNAL_MAX_KEYS + 1);
        assert!(left >= right && left - right <= 1);
        assert!(node.keys().iter().all(|&k| k < promoted));
        assert!(sibling.keys().iter().all(|&k| k > promoted));
        assert_eq!(node.children().len() + sibling.children().len(), INTERNAL_MAX_KEYS + 2);
    }

    #[test]
    fn test_internal_split_requires_full_node() {
        let mut node = node_with(&[10, 20], 4);
        let mut sibling = InternalNode::new();
        assert!(matches!(
            node.insert_and_split(15, pid(7), &mut sibling),
            Err(IndexError::InvalidSplit(_))
        ));
        assert_eq!(node.keys(), vec![10, 20]);

        let mut full = node_with(&[10, 20, 30], 3);
        let mut occupied = node_with(&[99], 3);
        assert!(matches!(
            full.insert_and_split(15, pid(7), &mut occupied),
            Err(IndexError::InvalidSplit(_))
        ));
        assert_eq!(full.keys(), vec![10, 20, 30]);
    }

    #[test]
    fn test_internal_encode_decode() {
        let node = node_with(&[5, 15, 25], 10);
        let decoded = InternalNode::decode(node.encode()).unwrap();
        assert_eq!(decoded.keys(), node.keys());
        assert_eq!(decoded.children(), node.children());
    }
}
