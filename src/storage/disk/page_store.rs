use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::buffer::PageCache;
use crate::common::{FileId, IndexError, Page, PageId, Result, DEFAULT_CACHE_CAPACITY, PAGE_SIZE};

/// Source of process-unique file ids for cache keying
static NEXT_FILE_ID: AtomicU32 = AtomicU32::new(1);

/// How a page file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only; the file must exist.
    ReadOnly,
    /// Reads and writes; the file is created if absent.
    ReadWrite,
}

impl OpenMode {
    /// Parses the single-letter mode used by load scripts: `r`/`R` or `w`/`W`.
    pub fn from_char(mode: char) -> Result<Self> {
        match mode {
            'r' | 'R' => Ok(OpenMode::ReadOnly),
            'w' | 'W' => Ok(OpenMode::ReadWrite),
            other => Err(IndexError::InvalidMode(other.to_string())),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, OpenMode::ReadWrite)
    }
}

impl FromStr for OpenMode {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => OpenMode::from_char(c),
            _ => Err(IndexError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenMode::ReadOnly => write!(f, "r"),
            OpenMode::ReadWrite => write!(f, "w"),
        }
    }
}

/// PageStore reads and writes fixed-size pages of a single file.
/// Reads go through a `PageCache`; writes go straight to disk and invalidate
/// the written page's cache slot.
pub struct PageStore {
    /// The page file
    file: File,
    /// Path of the page file
    path: PathBuf,
    mode: OpenMode,
    /// Key of this file's slots in the cache
    file_id: FileId,
    /// One past the highest page id known to exist
    end_page_id: i32,
    cache: Arc<PageCache>,
    /// Number of pages read from disk (cache hits excluded)
    num_reads: AtomicU32,
    /// Number of pages written to disk
    num_writes: AtomicU32,
}

impl PageStore {
    /// Opens a page file with a private cache of `DEFAULT_CACHE_CAPACITY` slots.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        Self::open_with_cache(path, mode, Arc::new(PageCache::new(DEFAULT_CACHE_CAPACITY)))
    }

    /// Opens a page file whose reads are cached in `cache`, which may be
    /// shared with other stores.
    pub fn open_with_cache<P: AsRef<Path>>(
        path: P,
        mode: OpenMode,
        cache: Arc<PageCache>,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let open_failed = |source| IndexError::OpenFailed {
            path: path.clone(),
            source,
        };

        let file = match mode {
            OpenMode::ReadOnly => OpenOptions::new().read(true).open(&path),
            OpenMode::ReadWrite => OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&path),
        }
        .map_err(open_failed)?;

        let file_size = file.metadata().map_err(open_failed)?.len();
        let end_page_id = i32::try_from(file_size / PAGE_SIZE as u64).map_err(|_| {
            open_failed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "page file exceeds addressable page ids",
            ))
        })?;

        let file_id = FileId(NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed));
        debug!(
            path = %path.display(),
            %mode,
            %file_id,
            end_page_id,
            "opened page file"
        );

        Ok(Self {
            file,
            path,
            mode,
            file_id,
            end_page_id,
            cache,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads page `page_id` into `buf`, from the cache when possible.
    pub fn read(&self, page_id: PageId, buf: &mut Page) -> Result<()> {
        if page_id.0 < 0 || page_id.0 >= self.end_page_id {
            return Err(IndexError::InvalidPageId(page_id));
        }

        if self.cache.get(self.file_id, page_id, buf) {
            return Ok(());
        }

        let mut file = &self.file;
        file.seek(SeekFrom::Start(page_id.offset()))
            .map_err(|source| IndexError::SeekFailed { page_id, source })?;
        file.read_exact(buf)
            .map_err(|source| IndexError::ReadFailed { page_id, source })?;

        self.cache.fill(self.file_id, page_id, buf);
        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Reads page `page_id` into a fresh buffer.
    pub fn read_page(&self, page_id: PageId) -> Result<Box<Page>> {
        let mut buf = Box::new([0u8; PAGE_SIZE]);
        self.read(page_id, &mut buf)?;
        Ok(buf)
    }

    /// Writes `data` as page `page_id`, growing the file if the page lies past
    /// its current end.
    pub fn write(&mut self, page_id: PageId, data: &Page) -> Result<()> {
        if page_id.0 < 0 {
            return Err(IndexError::InvalidPageId(page_id));
        }
        let next_end = page_id
            .0
            .checked_add(1)
            .ok_or(IndexError::InvalidPageId(page_id))?;

        let mut file = &self.file;
        file.seek(SeekFrom::Start(page_id.offset()))
            .map_err(|source| IndexError::SeekFailed { page_id, source })?;
        file.write_all(data)
            .map_err(|source| IndexError::WriteFailed { page_id, source })?;

        self.cache.invalidate(self.file_id, page_id);

        self.end_page_id = self.end_page_id.max(next_end);

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Closes the file and releases all of its cache slots. Nothing is
    /// flushed implicitly beyond what `write` already sent to the OS.
    pub fn close(self) -> Result<()> {
        let evicted = self.cache.evict_file(self.file_id);

        if self.mode.is_writable() {
            self.file.sync_all().map_err(IndexError::CloseFailed)?;
        }

        debug!(
            path = %self.path.display(),
            file_id = %self.file_id,
            evicted,
            "closed page file"
        );
        Ok(())
    }

    /// One past the highest page id known to exist in the file.
    pub fn end_page_id(&self) -> PageId {
        PageId::new(self.end_page_id)
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    pub fn cache(&self) -> &Arc<PageCache> {
        &self.cache
    }

    /// Returns the number of pages read from disk.
    pub fn num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of pages written to disk.
    pub fn num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }
}

impl Drop for PageStore {
    fn drop(&mut self) {
        // A store dropped without `close` must not leave slots behind in a
        // shared cache.
        self.cache.evict_file(self.file_id);
    }
}
