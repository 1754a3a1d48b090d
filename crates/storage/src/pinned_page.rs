use crate::buffer_pool::BufferPoolManager;
use crate::typedef::{FrameId, PageId};
use crate::Result;
use bytes::Bytes;
use std::sync::{Arc, RwLock};

/// A page held resident for use outside the buffer pool's lock.
///
/// The pin keeps the replacer from victimizing the frame, so the frame id
/// captured here stays valid for as long as the guard lives. Each access
/// takes the pool lock for just that operation; the guard itself holds no
/// lock between calls.
///
/// Dropping the guard releases the pin and reports whether this guard wrote
/// to the page, which is what decides the write-back when the frame is
/// evicted later.
pub struct PinnedPage {
    bpm: Arc<RwLock<BufferPoolManager>>,
    page_id: PageId,
    frame_id: FrameId,
    /// True once this guard has written through [`PinnedPage::write`].
    dirty: bool,
}

impl PinnedPage {
    /// Allocates a new page and pins it.
    pub fn create(bpm: &Arc<RwLock<BufferPoolManager>>) -> Result<Self> {
        let (page_id, frame_id) = bpm.write()?.create_page()?;
        Ok(Self {
            bpm: Arc::clone(bpm),
            page_id,
            frame_id,
            dirty: false,
        })
    }

    /// Pins an existing page, reading it from disk if it is not resident.
    pub fn fetch(bpm: &Arc<RwLock<BufferPoolManager>>, page_id: PageId) -> Result<Self> {
        let frame_id = bpm.write()?.pin_page(page_id)?;
        Ok(Self {
            bpm: Arc::clone(bpm),
            page_id,
            frame_id,
            dirty: false,
        })
    }

    /// Returns the id of the pinned page.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Copies the page's current contents out of the pool.
    pub fn snapshot(&self) -> Bytes {
        let bpm = self.bpm.read().unwrap();
        Bytes::copy_from_slice(bpm.frame(self.frame_id).data())
    }

    /// Writes into the page at the given offset.
    pub fn write(&mut self, offset: usize, data: &[u8]) {
        let mut bpm = self.bpm.write().unwrap();
        bpm.frame_mut(self.frame_id).write(offset, data);
        drop(bpm);
        self.dirty = true;
    }
}

impl Drop for PinnedPage {
    fn drop(&mut self) {
        // A poisoned pool lock means some holder already panicked; skip the
        // unpin rather than panic again inside drop.
        if let Ok(mut bpm) = self.bpm.write() {
            bpm.unpin_page(self.page_id, self.dirty);
        }
    }
}
