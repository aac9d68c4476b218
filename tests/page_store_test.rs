use std::sync::Arc;

use bruin_index::buffer::PageCache;
use bruin_index::common::{IndexError, PageId, PAGE_SIZE};
use bruin_index::storage::disk::{OpenMode, PageStore};

use tempfile::{tempdir, NamedTempFile};

fn page_filled(byte: u8) -> [u8; PAGE_SIZE] {
    [byte; PAGE_SIZE]
}

#[test]
fn test_page_store_create_file() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("fresh.idx");

    let store = PageStore::open(&path, OpenMode::ReadWrite).unwrap();
    assert!(path.exists());
    assert_eq!(store.end_page_id(), PageId::new(0));
    store.close().unwrap();
}

#[test]
fn test_page_store_open_missing_read_only() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("missing.idx");

    let result = PageStore::open(&path, OpenMode::ReadOnly);
    assert!(matches!(result, Err(IndexError::OpenFailed { .. })));
}

#[test]
fn test_page_store_read_write_page() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = PageStore::open(temp_file.path(), OpenMode::ReadWrite).unwrap();

    store.write(PageId::new(0), &page_filled(0xAA)).unwrap();
    store.write(PageId::new(3), &page_filled(0x33)).unwrap();
    assert_eq!(store.end_page_id(), PageId::new(4));

    assert_eq!(*store.read_page(PageId::new(3)).unwrap(), page_filled(0x33));
    // Pages skipped over by a write read back as zeros
    assert_eq!(*store.read_page(PageId::new(1)).unwrap(), page_filled(0));

    assert!(matches!(
        store.read_page(PageId::new(4)),
        Err(IndexError::InvalidPageId(_))
    ));
    assert!(matches!(
        store.write(PageId::new(-1), &page_filled(0)),
        Err(IndexError::InvalidPageId(_))
    ));
}

#[test]
fn test_page_store_persistence() {
    let temp_file = NamedTempFile::new().unwrap();
    {
        let mut store = PageStore::open(temp_file.path(), OpenMode::ReadWrite).unwrap();
        for i in 0..5u8 {
            store.write(PageId::new(i as i32), &page_filled(i + 1)).unwrap();
        }
        store.close().unwrap();
    }

    let store = PageStore::open(temp_file.path(), OpenMode::ReadOnly).unwrap();
    assert_eq!(store.end_page_id(), PageId::new(5));
    for i in 0..5u8 {
        assert_eq!(*store.read_page(PageId::new(i as i32)).unwrap(), page_filled(i + 1));
    }
}

#[test]
fn test_page_store_read_only_rejects_writes() {
    let temp_file = NamedTempFile::new().unwrap();
    {
        let mut store = PageStore::open(temp_file.path(), OpenMode::ReadWrite).unwrap();
        store.write(PageId::new(0), &page_filled(1)).unwrap();
        store.close().unwrap();
    }

    let mut store = PageStore::open(temp_file.path(), OpenMode::ReadOnly).unwrap();
    assert!(matches!(
        store.write(PageId::new(0), &page_filled(2)),
        Err(IndexError::WriteFailed { .. })
    ));
}

#[test]
fn test_page_store_shared_cache_keeps_files_apart() {
    let cache = Arc::new(PageCache::new(8));
    let file_a = NamedTempFile::new().unwrap();
    let file_b = NamedTempFile::new().unwrap();

    let mut store_a =
        PageStore::open_with_cache(file_a.path(), OpenMode::ReadWrite, cache.clone()).unwrap();
    let mut store_b =
        PageStore::open_with_cache(file_b.path(), OpenMode::ReadWrite, cache.clone()).unwrap();
    assert_ne!(store_a.file_id(), store_b.file_id());

    store_a.write(PageId::new(0), &page_filled(0xA0)).unwrap();
    store_b.write(PageId::new(0), &page_filled(0xB0)).unwrap();

    assert_eq!(*store_a.read_page(PageId::new(0)).unwrap(), page_filled(0xA0));
    assert_eq!(*store_b.read_page(PageId::new(0)).unwrap(), page_filled(0xB0));
    assert_eq!(cache.len(), 2);

    // Second reads are served from the cache
    assert_eq!(*store_a.read_page(PageId::new(0)).unwrap(), page_filled(0xA0));
    assert_eq!(store_a.num_reads(), 1);
    assert_eq!(cache.hits(), 1);

    store_a.close().unwrap();
    assert_eq!(cache.len_for(store_b.file_id()), 1);
    assert_eq!(cache.len(), 1);

    drop(store_b);
    assert!(cache.is_empty());
}

#[test]
fn test_page_store_write_invalidates_cached_page() {
    let temp_file = NamedTempFile::new().unwrap();
    let mut store = PageStore::open(temp_file.path(), OpenMode::ReadWrite).unwrap();

    store.write(PageId::new(0), &page_filled(1)).unwrap();
    assert_eq!(*store.read_page(PageId::new(0)).unwrap(), page_filled(1));
    assert!(store.cache().contains(store.file_id(), PageId::new(0)));

    store.write(PageId::new(0), &page_filled(2)).unwrap();
    assert!(!store.cache().contains(store.file_id(), PageId::new(0)));
    assert_eq!(*store.read_page(PageId::new(0)).unwrap(), page_filled(2));
    assert_eq!(store.num_writes(), 2);
}

#[test]
fn test_page_store_cache_eviction_under_pressure() {
    let cache = Arc::new(PageCache::new(4));
    let temp_file = NamedTempFile::new().unwrap();
    let mut store =
        PageStore::open_with_cache(temp_file.path(), OpenMode::ReadWrite, cache.clone()).unwrap();

    for i in 0..10 {
        store.write(PageId::new(i), &page_filled(i as u8)).unwrap();
    }
    for i in 0..10 {
        assert_eq!(*store.read_page(PageId::new(i)).unwrap(), page_filled(i as u8));
    }
    assert_eq!(cache.len(), 4);

    // The four most recent reads are the ones still cached
    for i in 6..10 {
        assert!(cache.contains(store.file_id(), PageId::new(i)));
    }
    assert_eq!(store.num_reads(), 10);
}
