use crate::page::PAGE_SIZE;
use crate::typedef::PageId;
use crate::Result;
use bytes::{Bytes, BytesMut};
use fs2::FileExt;
use pagepool_error::{errdata, errinput, Error};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

pub(crate) const DATA_DIR: &str = "src/disk/data/";

/// Grow the file in chunks of this many pages to keep resizes rare.
const GROWTH_PAGES: u64 = 64;

const EMPTY_PAGE: &[u8] = &[0; PAGE_SIZE];

/// Page-granular file storage for the buffer pool.
///
/// Pages are direct-mapped: page id `n` occupies the byte range starting at
/// `n * PAGE_SIZE`, so no offset table is kept. The file grows on demand and
/// is locked exclusively for the manager's lifetime.
#[derive(Debug)]
pub struct DiskManager {
    file: File,
    /// Current file length in bytes.
    file_len: u64,
    /// The highest page id handed out so far. Ids are never recycled, so a
    /// stale id held elsewhere (a replacer's eviction history, say) can
    /// never alias a newly allocated page.
    last_page_id: PageId,
    /// Pages currently allocated. Reads outside this set return nothing.
    live_pages: HashSet<PageId>,
}

impl DiskManager {
    /// Creates a new disk manager for the given database file `filename`.
    /// The file is truncated and locked exclusively at creation.
    pub fn new(filename: &str) -> Result<Self> {
        std::fs::create_dir_all(DATA_DIR)
            .map_err(|e| Error::IO(format!("Unable to create data dir: {}", e)))?;
        let path = Path::new(DATA_DIR).join(filename);

        let file = std::fs::OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::IO(format!("Unable to open file {}: {}", path.display(), e)))?;

        file.lock_exclusive()
            .map_err(|e| Error::IO(format!("Failed to acquire exclusive file lock: {}", e)))?;

        Ok(Self {
            file,
            file_len: 0,
            last_page_id: 0,
            live_pages: HashSet::new(),
        })
    }

    /// Allocates a fresh page id and zeroes its slot.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        self.last_page_id += 1;
        let page_id = self.last_page_id;

        self.grow_to_fit(page_id)?;
        self.live_pages.insert(page_id);
        self.write(page_id, EMPTY_PAGE)?;

        Ok(page_id)
    }

    /// Retires a page id. Its file slot is left behind; the id will not be
    /// handed out again.
    // TODO: reclaim retired slots once stale-id holders can be invalidated.
    pub fn deallocate_page(&mut self, page_id: PageId) -> Result<()> {
        if !self.live_pages.remove(&page_id) {
            return errinput!("Page ID {page_id} not found");
        }
        Ok(())
    }

    /// Reads a page if it is allocated. Returns `None` for retired or never
    /// allocated ids.
    pub(crate) fn read(&mut self, page_id: PageId) -> Result<Option<Bytes>> {
        if !self.live_pages.contains(&page_id) {
            return Ok(None);
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        let mut buf = BytesMut::zeroed(PAGE_SIZE);
        self.file.read_exact(&mut buf)?;
        Ok(Some(buf.freeze()))
    }

    /// Writes data to an allocated page. Must not exceed `PAGE_SIZE`.
    pub(crate) fn write(&mut self, page_id: PageId, data: &[u8]) -> Result<()> {
        if data.len() > PAGE_SIZE {
            return errdata!("Page data must fit in a page.");
        }
        if !self.live_pages.contains(&page_id) {
            return errinput!("Page ID {page_id} is not allocated");
        }

        self.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        self.file.write_all(data)?;
        self.file.sync_data()?;
        Ok(())
    }

    /// Byte position of a page under the direct mapping.
    fn offset(page_id: PageId) -> u64 {
        page_id as u64 * PAGE_SIZE as u64
    }

    /// Extends the file so the given page's slot exists.
    fn grow_to_fit(&mut self, page_id: PageId) -> Result<()> {
        let required = Self::offset(page_id) + PAGE_SIZE as u64;
        if required > self.file_len {
            let chunk = GROWTH_PAGES * PAGE_SIZE as u64;
            let new_len = required.next_multiple_of(chunk);
            self.file
                .set_len(new_len)
                .map_err(|e| Error::IO(format!("Failed to resize file: {}", e)))?;
            self.file_len = new_len;
        }
        Ok(())
    }

    /// Returns the current size of the database file.
    pub fn db_file_size(&self) -> Result<u64> {
        self.file
            .metadata()
            .map(|meta| meta.len())
            .map_err(|e| Error::IO(format!("Failed to get file size: {}", e)))
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::error!("failed to unlock database file: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_disk_manager_round_trip() {
        let mut dm = DiskManager::new("disk_manager_test.db").unwrap();

        let pid = dm.allocate_page().unwrap();
        let mut data = vec![0u8; PAGE_SIZE];
        data[..5].copy_from_slice(b"hello");
        dm.write(pid, &data).unwrap();

        let read = dm.read(pid).unwrap().expect("page should exist");
        assert_eq!(&read[..5], b"hello");

        // A page id never allocated reads back as absent.
        assert!(dm.read(9999).unwrap().is_none());
    }

    #[test]
    #[serial]
    fn test_disk_manager_pages_are_direct_mapped() {
        let mut dm = DiskManager::new("disk_manager_mapping_test.db").unwrap();

        let pid1 = dm.allocate_page().unwrap();
        let pid2 = dm.allocate_page().unwrap();
        dm.write(pid1, b"one").unwrap();
        dm.write(pid2, b"two").unwrap();

        // Writes land in their own slots.
        assert_eq!(&dm.read(pid1).unwrap().unwrap()[..3], b"one");
        assert_eq!(&dm.read(pid2).unwrap().unwrap()[..3], b"two");

        // The file covers both slots after one growth chunk.
        assert!(dm.db_file_size().unwrap() >= (pid2 as u64 + 1) * PAGE_SIZE as u64);
    }

    #[test]
    #[serial]
    fn test_disk_manager_retires_page_ids() {
        let mut dm = DiskManager::new("disk_manager_retire_test.db").unwrap();

        let pid1 = dm.allocate_page().unwrap();
        dm.deallocate_page(pid1).unwrap();

        // A retired page no longer reads or writes.
        assert!(dm.read(pid1).unwrap().is_none());
        assert!(dm.write(pid1, b"stale").is_err());
        assert!(dm.deallocate_page(pid1).is_err());

        // Retired ids are never handed out again.
        let pid2 = dm.allocate_page().unwrap();
        assert_ne!(pid1, pid2);
    }

    #[test]
    #[serial]
    fn test_disk_manager_rejects_oversized_writes() {
        let mut dm = DiskManager::new("disk_manager_oversize_test.db").unwrap();
        let pid = dm.allocate_page().unwrap();
        assert!(dm.write(pid, &vec![0u8; PAGE_SIZE + 1]).is_err());
    }
}
