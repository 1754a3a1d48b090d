use pagepool_error::{errinput, Error};

use crate::disk::disk_manager::DiskManager;
use crate::frame::PageFrame;
use crate::replacer::replacer::Replacer;
use crate::typedef::{FrameId, PageId};
use crate::Result;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Manages page allocation, caching, and eviction in the buffer pool.
///
/// The pool owns a fixed set of frames and consults its [`Replacer`] to pick
/// which frame to reuse once the free list runs dry. Pages are pinned while a
/// caller holds them and only pinless frames are offered to the replacer.
#[derive(Debug)]
pub struct BufferPoolManager {
    frames: Vec<PageFrame>,
    /// Maps resident page ids to their frames.
    page_table: HashMap<PageId, FrameId>,
    /// Decides which frame to reuse when the pool is full.
    replacer: Box<dyn Replacer>,
    /// Frames that have never held a page or were explicitly freed.
    free_list: VecDeque<FrameId>,
    disk_manager: Arc<Mutex<DiskManager>>,
}

impl BufferPoolManager {
    /// Initializes the buffer pool with a given size.
    pub fn new(
        pool_size: usize,
        disk_manager: Arc<Mutex<DiskManager>>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        let mut frames = Vec::with_capacity(pool_size);
        frames.resize_with(pool_size, PageFrame::new);

        Self {
            frames,
            page_table: HashMap::new(),
            replacer,
            free_list: (0..pool_size).collect(),
            disk_manager,
        }
    }

    /// Returns a free frame, evicting a resident page if necessary.
    fn get_free_frame(&mut self) -> Result<FrameId> {
        if let Some(frame_id) = self.free_list.pop_front() {
            return Ok(frame_id);
        }

        let frame_id = self.replacer.evict().ok_or(Error::BufferPool(
            "No evictable frame in buffer pool".to_string(),
        ))?;
        let frame = &mut self.frames[frame_id];
        assert_eq!(
            frame.pin_count(),
            0,
            "If page is evicted from replacer, its pin count must be 0."
        );
        debug!(
            "evicting page {} from frame {}",
            frame.page_id(),
            frame_id
        );

        // Write the old page back to disk before the frame is reused.
        if frame.is_dirty() {
            let mut disk = self.disk_manager.lock()?;
            disk.write(frame.page_id(), frame.data())?;
        }

        self.page_table.remove(&frame.page_id());
        frame.reset();

        Ok(frame_id)
    }

    /// Allocates a new page, loads it into a free frame, and pins it once.
    pub fn create_page(&mut self) -> Result<(PageId, FrameId)> {
        let frame_id = self.get_free_frame()?;
        let page_id = self.disk_manager.lock()?.allocate_page()?;

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, page_id);
        self.replacer.set_evictable(frame_id, false);

        let frame = &mut self.frames[frame_id];
        frame.set_page_id(page_id);
        frame.set_dirty(false);
        frame.increment_pin_count();
        Ok((page_id, frame_id))
    }

    /// Pins a page into a frame, reading it from disk on a miss, and returns
    /// the frame. Every call adds one pin; the caller must unpin it.
    pub fn pin_page(&mut self, page_id: PageId) -> Result<FrameId> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            self.replacer.record_access(frame_id, page_id);
            self.replacer.set_evictable(frame_id, false);
            self.frames[frame_id].increment_pin_count();
            return Ok(frame_id);
        }

        let frame_id = self.get_free_frame()?;
        let data = self.disk_manager.lock()?.read(page_id)?;
        let Some(data) = data else {
            // Nothing on disk under this id; hand the frame back.
            self.free_list.push_back(frame_id);
            return errinput!("page {page_id} does not exist");
        };

        self.page_table.insert(page_id, frame_id);
        self.replacer.record_access(frame_id, page_id);
        self.replacer.set_evictable(frame_id, false);

        let frame = &mut self.frames[frame_id];
        frame.set_page_id(page_id);
        frame.data_mut().copy_from_slice(&data);
        frame.set_dirty(false);
        frame.increment_pin_count();
        Ok(frame_id)
    }

    /// Drops one pin of a page; the last unpin makes the frame evictable.
    ///
    /// # Panics
    ///
    /// Panics if the page is not resident or was not pinned.
    pub fn unpin_page(&mut self, page_id: PageId, is_dirty: bool) {
        let Some(&frame_id) = self.page_table.get(&page_id) else {
            log::error!("unpin of page {page_id}, which is not in the buffer pool");
            panic!("attempted to unpin page {page_id}, which is not in the buffer pool");
        };
        let frame = &mut self.frames[frame_id];
        frame.decrement_pin_count();
        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.pin_count() == 0 {
            self.replacer.set_evictable(frame_id, true);
        }
    }

    /// Deletes a page from the buffer pool and disk.
    pub fn delete_page(&mut self, page_id: PageId) -> Result<()> {
        if let Some(&frame_id) = self.page_table.get(&page_id) {
            if self.frames[frame_id].pin_count() > 0 {
                return Err(Error::PagePinned(page_id));
            }
            if self.frames[frame_id].is_dirty() {
                self.flush_page(&page_id)?;
            }

            // Dropping the page is not a policy eviction, so the replacer
            // forgets it entirely and the frame goes back on the free list.
            self.page_table.remove(&page_id);
            self.replacer.remove(frame_id);
            self.frames[frame_id].reset();
            self.free_list.push_back(frame_id);
        }

        let mut disk = self.disk_manager.lock()?;
        disk.deallocate_page(page_id)?;
        Ok(())
    }

    /// Flushes a specific page to disk if it is dirty.
    pub fn flush_page(&mut self, page_id: &PageId) -> Result<()> {
        if let Some(&frame_id) = self.page_table.get(page_id) {
            let frame = &mut self.frames[frame_id];
            if frame.is_dirty() {
                let mut disk = self.disk_manager.lock()?;
                disk.write(*page_id, frame.data())?;
                frame.set_dirty(false);
            }
            Ok(())
        } else {
            Err(Error::BufferPool(format!(
                "Page {page_id:?} not found in buffer pool"
            )))
        }
    }

    /// Returns the frame behind a pinned page. The caller must ensure the
    /// frame id came from a pin that is still held.
    pub(crate) fn frame(&self, frame_id: FrameId) -> &PageFrame {
        &self.frames[frame_id]
    }

    /// Mutable variant of [`BufferPoolManager::frame`].
    pub(crate) fn frame_mut(&mut self, frame_id: FrameId) -> &mut PageFrame {
        &mut self.frames[frame_id]
    }

    /// Returns the total number of frames in the buffer pool.
    fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Returns the number of frames available for new pages.
    pub fn free_frame_count(&self) -> usize {
        self.free_list.len() + self.replacer.evictable_count()
    }

    /// Returns the pin count of a page, or `None` if it is not resident.
    fn get_pin_count(&self, page_id: PageId) -> Option<u16> {
        let frame_id = self.page_table.get(&page_id)?;
        Some(self.frames[*frame_id].pin_count())
    }
}
