/// Index of a slot in the buffer pool's frame array.
pub type FrameId = usize;

/// Identifier of a logical page on disk.
pub type PageId = u32;
