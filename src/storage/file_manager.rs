//! File Manager - block-level I/O over a directory of database files.
//!
//! The [`FileManager`] handles all direct file operations:
//! - Reading and writing blocks
//! - Appending new blocks to a file
//! - Keeping one open handle per file

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::debug;
use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{Block, Error, Result};
use crate::storage::page::Page;

/// Manages block I/O for every file in one database directory.
///
/// # File Layout
/// Each file is a sequence of page-sized blocks:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Block 0 │ Block 1 │  ...    │ Block N │
/// │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096    ...    N×4096
/// ```
///
/// # Thread Safety
/// All operations take `&self` and are serialized by an internal mutex, so
/// one `FileManager` can be shared behind an `Arc`.
///
/// # Durability
/// Every write and append is followed by `fsync()`.
pub struct FileManager {
    dir: PathBuf,
    is_new: bool,
    files: Mutex<HashMap<String, File>>,
}

impl FileManager {
    /// Open the database directory, creating it if it does not exist.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let is_new = !dir.exists();
        if is_new {
            fs::create_dir_all(&dir)?;
        }
        debug!("opened database directory {} (new: {})", dir.display(), is_new);

        Ok(Self {
            dir,
            is_new,
            files: Mutex::new(HashMap::new()),
        })
    }

    /// Whether the directory was created by [`FileManager::open`].
    #[inline]
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Directory holding the database files.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read `block` into `page`.
    ///
    /// # Errors
    /// Returns `Error::BlockNotFound` if the block lies past the end of its file.
    pub fn read(&self, block: &Block, page: &mut Page) -> Result<()> {
        let mut files = self.files.lock();
        let file = Self::handle(&mut files, &self.dir, block.file())?;
        Self::check_exists(file, block)?;

        file.seek(SeekFrom::Start(Self::offset(block)))?;
        file.read_exact(page.as_mut_slice())?;
        Ok(())
    }

    /// Write `page` to an existing `block`.
    ///
    /// # Errors
    /// Returns `Error::BlockNotFound` if the block has not been appended yet.
    pub fn write(&self, block: &Block, page: &Page) -> Result<()> {
        let mut files = self.files.lock();
        let file = Self::handle(&mut files, &self.dir, block.file())?;
        Self::check_exists(file, block)?;

        file.seek(SeekFrom::Start(Self::offset(block)))?;
        file.write_all(page.as_slice())?;
        file.sync_all()?;
        Ok(())
    }

    /// Append `page` as a new block at the end of `filename`.
    ///
    /// Returns the identity of the new block.
    pub fn append(&self, filename: &str, page: &Page) -> Result<Block> {
        let mut files = self.files.lock();
        let file = Self::handle(&mut files, &self.dir, filename)?;

        let number = Self::blocks_in(file, filename)?;
        let block = Block::new(filename, number);
        file.seek(SeekFrom::Start(Self::offset(&block)))?;
        file.write_all(page.as_slice())?;
        file.sync_all()?;
        Ok(block)
    }

    /// Number of blocks currently in `filename` (0 if it does not exist yet).
    pub fn block_count(&self, filename: &str) -> Result<u32> {
        let mut files = self.files.lock();
        let file = Self::handle(&mut files, &self.dir, filename)?;
        Self::blocks_in(file, filename)
    }

    fn handle<'a>(
        files: &'a mut HashMap<String, File>,
        dir: &Path,
        filename: &str,
    ) -> Result<&'a mut File> {
        let file = match files.entry(filename.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(
                OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(dir.join(filename))?,
            ),
        };
        Ok(file)
    }

    fn blocks_in(file: &File, filename: &str) -> Result<u32> {
        let len = file.metadata()?.len();
        Self::blocks_for_len(len).ok_or_else(|| Error::FileTooLarge {
            file: filename.to_string(),
            len,
        })
    }

    /// Whole blocks in a file of `len` bytes, if numberable by a `u32`.
    #[inline]
    fn blocks_for_len(len: u64) -> Option<u32> {
        u32::try_from(len / PAGE_SIZE as u64).ok()
    }

    fn check_exists(file: &File, block: &Block) -> Result<()> {
        if block.number() >= Self::blocks_in(file, block.file())? {
            return Err(Error::BlockNotFound {
                file: block.file().to_string(),
                number: block.number(),
            });
        }
        Ok(())
    }

    #[inline]
    fn offset(block: &Block) -> u64 {
        block.number() as u64 * PAGE_SIZE as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("studentdb");

        let fm = FileManager::open(&path).unwrap();
        assert!(fm.is_new());
        assert!(path.is_dir());

        let fm = FileManager::open(&path).unwrap();
        assert!(!fm.is_new());
    }

    #[test]
    fn test_append_and_read_block() {
        let dir = tempdir().unwrap();
        let fm = FileManager::open(dir.path()).unwrap();

        let mut page = Page::new();
        page.set_int(0, 77).unwrap();
        let block = fm.append("t.tbl", &page).unwrap();
        assert_eq!(block, Block::new("t.tbl", 0));
        assert_eq!(fm.block_count("t.tbl").unwrap(), 1);

        let mut read = Page::new();
        fm.read(&block, &mut read).unwrap();
        assert_eq!(read.get_int(0).unwrap(), 77);
    }

    #[test]
    fn test_write_and_read_block() {
        let dir = tempdir().unwrap();
        let fm = FileManager::open(dir.path()).unwrap();
        let block = fm.append("t.tbl", &Page::new()).unwrap();

        let mut page = Page::new();
        page.set_string(10, "Paracel Storm").unwrap();
        fm.write(&block, &page).unwrap();

        let mut read = Page::new();
        fm.read(&block, &mut read).unwrap();
        assert_eq!(read.get_string(10).unwrap(), "Paracel Storm");
    }

    #[test]
    fn test_blocks_numbered_per_file() {
        let dir = tempdir().unwrap();
        let fm = FileManager::open(dir.path()).unwrap();

        for i in 0..3 {
            assert_eq!(fm.append("a.tbl", &Page::new()).unwrap().number(), i);
        }
        assert_eq!(fm.append("b.tbl", &Page::new()).unwrap().number(), 0);
        assert_eq!(fm.block_count("a.tbl").unwrap(), 3);
        assert_eq!(fm.block_count("missing.tbl").unwrap(), 0);
    }

    #[test]
    fn test_read_missing_block() {
        let dir = tempdir().unwrap();
        let fm = FileManager::open(dir.path()).unwrap();
        fm.append("t.tbl", &Page::new()).unwrap();

        let mut page = Page::new();
        let result = fm.read(&Block::new("t.tbl", 1), &mut page);
        assert!(matches!(result, Err(Error::BlockNotFound { number: 1, .. })));
    }

    #[test]
    fn test_write_missing_block() {
        let dir = tempdir().unwrap();
        let fm = FileManager::open(dir.path()).unwrap();

        let result = fm.write(&Block::new("t.tbl", 0), &Page::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_block_count_limited_to_u32() {
        let page = PAGE_SIZE as u64;
        assert_eq!(FileManager::blocks_for_len(0), Some(0));
        assert_eq!(FileManager::blocks_for_len(page * 3 + 10), Some(3));
        assert_eq!(
            FileManager::blocks_for_len(page * u32::MAX as u64),
            Some(u32::MAX)
        );
        assert_eq!(FileManager::blocks_for_len(page * (u32::MAX as u64 + 1)), None);
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();

        let block = {
            let fm = FileManager::open(dir.path()).unwrap();
            let mut page = Page::new();
            page.set_int(0, 0x42).unwrap();
            fm.append("t.tbl", &page).unwrap()
        };

        let fm = FileManager::open(dir.path()).unwrap();
        let mut page = Page::new();
        fm.read(&block, &mut page).unwrap();
        assert_eq!(page.get_int(0).unwrap(), 0x42);
    }
}
