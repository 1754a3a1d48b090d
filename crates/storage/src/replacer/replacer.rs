use std::fmt::Debug;

use crate::typedef::{FrameId, PageId};

/// A page replacement policy consulted by the buffer pool.
///
/// The replacer decides which frame to reuse when the pool is full. It never
/// performs IO and never touches page contents; it only tracks frame and page
/// identity as far as its policy needs. Every operation serializes on a latch
/// internal to the implementation, so callers may share a replacer freely.
pub trait Replacer: Send + Sync + Debug {
    /// Record the event that the given frame was accessed while holding the
    /// given page, making it the most recently used entry of the policy.
    /// Creates a new entry if the frame has not been seen before.
    fn record_access(&self, frame_id: FrameId, page_id: PageId);

    /// Admits (`true`) or withdraws (`false`) a frame from the candidate
    /// pool. A no-op when the frame is already in the requested state.
    ///
    /// # Panics
    ///
    /// Panics if the frame is not currently tracked by the replacer. This
    /// indicates a bookkeeping bug in the caller.
    fn set_evictable(&self, frame_id: FrameId, evictable: bool);

    /// Attempts to evict a frame based on the replacement policy.
    /// Returns `Some(frame_id)` if a victim was chosen, otherwise `None`
    /// (pool empty or every candidate pinned).
    fn evict(&self) -> Option<FrameId>;

    /// Removes a frame from the replacer entirely. Unlike [`Replacer::evict`]
    /// this is not a policy decision and leaves no trace of the frame's page.
    /// A no-op when the frame is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the frame is tracked but not evictable.
    fn remove(&self, frame_id: FrameId);

    /// Returns the number of evictable frames in the replacer.
    fn evictable_count(&self) -> usize;
}
