use std::ops::Bound;

use crate::common::{RecordId, Result};

use super::btree_index::{IndexCursor, TreeIndex};

/// Forward scan over the leaf level, stopping at an upper key bound.
///
/// Borrows the index, so the tree cannot be modified while a scan is live.
pub struct IndexIterator<'a> {
    index: &'a TreeIndex,
    cursor: IndexCursor,
    end: Bound<i32>,
    done: bool,
}

impl<'a> IndexIterator<'a> {
    pub fn new(index: &'a TreeIndex, cursor: IndexCursor, end: Bound<i32>) -> Self {
        Self {
            index,
            cursor,
            end,
            done: false,
        }
    }

    /// Current scan position.
    pub fn cursor(&self) -> &IndexCursor {
        &self.cursor
    }

    fn past_end(&self, key: i32) -> bool {
        match self.end {
            Bound::Included(end) => key > end,
            Bound::Excluded(end) => key >= end,
            Bound::Unbounded => false,
        }
    }

    pub fn next(&mut self) -> Result<Option<(i32, RecordId)>> {
        if self.done {
            return Ok(None);
        }

        match self.index.read_forward(&mut self.cursor) {
            Ok(Some((key, rid))) if !self.past_end(key) => Ok(Some((key, rid))),
            Ok(_) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => {
                self.done = true;
                Err(e)
            }
        }
    }
}

impl Iterator for IndexIterator<'_> {
    type Item = Result<(i32, RecordId)>;

    fn next(&mut self) -> Option<Self::Item> {
        IndexIterator::next(self).transpose()
    }
}

#[cfg(test)]
mod tests {
    use crate::common::{IndexOptions, PageId, RecordId, SlotId};
    use crate::index::TreeIndex;
    use crate::storage::disk::OpenMode;
    use tempfile::NamedTempFile;

    fn build(temp_file: &NamedTempFile, keys: &[i32]) -> TreeIndex {
        let options = IndexOptions::default()
            .with_leaf_capacity(4)
            .with_internal_capacity(4);
        let mut index =
            TreeIndex::open_with_options(temp_file.path(), OpenMode::ReadWrite, options).unwrap();
        for &k in keys {
            index
                .insert(k, RecordId::new(PageId::new(k), SlotId::new(1)))
                .unwrap();
        }
        index
    }

    fn keys_of(index: &TreeIndex, range: impl std::ops::RangeBounds<i32>) -> Vec<i32> {
        index
            .scan(range)
            .unwrap()
            .map(|entry| entry.unwrap().0)
            .collect()
    }

    #[test]
    fn test_scan_bounds() {
        let temp_file = NamedTempFile::new().unwrap();
        let keys: Vec<i32> = (0..40).map(|k| k * 5).collect();
        let index = build(&temp_file, &keys);

        assert_eq!(keys_of(&index, 10..=25), vec![10, 15, 20, 25]);
        assert_eq!(keys_of(&index, 10..25), vec![10, 15, 20]);
        assert_eq!(keys_of(&index, 11..24), vec![15, 20]);
        assert_eq!(keys_of(&index, 185..), vec![185, 190, 195]);
        assert_eq!(keys_of(&index, ..10), vec![0, 5]);
        assert_eq!(keys_of(&index, ..).len(), 40);
        assert!(keys_of(&index, 200..).is_empty());
        assert!(keys_of(&index, 21..24).is_empty());
    }

    #[test]
    fn test_scan_excluded_start() {
        use std::ops::Bound;

        let temp_file = NamedTempFile::new().unwrap();
        let keys: Vec<i32> = (1..=20).collect();
        let index = build(&temp_file, &keys);

        let range = (Bound::Excluded(4), Bound::Included(7));
        assert_eq!(keys_of(&index, range), vec![5, 6, 7]);

        let range = (Bound::Excluded(20), Bound::Unbounded);
        assert!(keys_of(&index, range).is_empty());
    }

    #[test]
    fn test_exhausted_iterator_stays_done() {
        let temp_file = NamedTempFile::new().unwrap();
        let index = build(&temp_file, &[1, 2, 3]);

        let mut iter = index.scan(2..).unwrap();
        assert_eq!(iter.next().unwrap().unwrap().0, 2);
        assert_eq!(iter.next().unwrap().unwrap().0, 3);
        assert!(iter.next().unwrap().is_none());
        assert!(iter.next().unwrap().is_none());
    }
}
