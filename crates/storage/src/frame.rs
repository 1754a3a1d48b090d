use core::fmt;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::{
    page::{INVALID_PAGE_ID, PAGE_SIZE},
    typedef::PageId,
};

/// A buffer pool slot holding one page's contents and its metadata.
///
/// Frames carry no lock of their own; page contents are guarded by the
/// buffer pool's lock, and [`crate::pinned_page::PinnedPage`] goes through
/// it for every access.
pub struct PageFrame {
    page_id: PageId,
    is_dirty: bool,
    pin_cnt: AtomicU16,
    data: [u8; PAGE_SIZE],
}

impl fmt::Debug for PageFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFrame")
            .field("page_id", &self.page_id)
            .field("is_dirty", &self.is_dirty)
            .field("pin_cnt", &self.pin_cnt.load(Ordering::SeqCst))
            .finish()
    }
}

impl PageFrame {
    /// Creates a new, uninitialized frame.
    pub(crate) fn new() -> Self {
        Self {
            page_id: INVALID_PAGE_ID,
            is_dirty: false,
            pin_cnt: AtomicU16::new(0),
            data: [0; PAGE_SIZE],
        }
    }

    /// Returns the id of the page resident in this frame.
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Checks if the page has been modified since it was loaded.
    pub(crate) fn is_dirty(&self) -> bool {
        self.is_dirty
    }

    /// Returns the current pin count.
    pub(crate) fn pin_count(&self) -> u16 {
        self.pin_cnt.load(Ordering::Acquire)
    }

    /// Provides read-only access to the page data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Provides mutable access to the page data.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub(crate) fn set_page_id(&mut self, page_id: PageId) {
        self.page_id = page_id;
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.is_dirty = dirty;
    }

    /// Increments the pin count by 1.
    pub(crate) fn increment_pin_count(&self) {
        self.pin_cnt.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrements the pin count by 1.
    ///
    /// # Panics
    ///
    /// Panics if the pin count is already zero; an unpin without a matching
    /// pin means the caller's bookkeeping is broken.
    pub(crate) fn decrement_pin_count(&self) {
        let old = self.pin_cnt.fetch_sub(1, Ordering::SeqCst);
        if old == 0 {
            panic!(
                "Pin count should not be zero when decrementing. Page id: {}",
                self.page_id()
            );
        }
    }

    /// Resets the frame to its initial state.
    pub(crate) fn reset(&mut self) {
        self.page_id = INVALID_PAGE_ID;
        self.pin_cnt.store(0, Ordering::Release);
        self.is_dirty = false;
        self.data.fill(0);
    }

    /// Writes data into the page at the given offset and marks it dirty.
    pub(crate) fn write(&mut self, offset: usize, data: &[u8]) {
        if offset + data.len() > PAGE_SIZE {
            panic!("Write out of bounds");
        }
        self.data[offset..offset + data.len()].copy_from_slice(data);
        self.is_dirty = true;
    }
}
