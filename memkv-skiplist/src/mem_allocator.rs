use std::{alloc::Layout, ptr::NonNull, sync::Arc};

use crate::error::Result;

mod block_arena;

pub mod prelude {
    pub use super::MemAllocator;
    pub use super::block_arena::{BlockArena, DEFAULT_BLOCK_SIZE};
}

/// Source of node memory for a skip list.
///
/// # Safety
///
/// A pointer returned by `allocate` must point to at least `layout.size()`
/// bytes aligned to `layout.align()`, and that range must stay valid, unmoved
/// and never handed out again until the allocator itself is dropped. The skip
/// list keeps references into it for its whole lifetime.
pub unsafe trait MemAllocator: Send + Sync {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>>;

    fn mem_usage(&self) -> usize;
}

unsafe impl<A> MemAllocator for Arc<A>
where
    A: MemAllocator + ?Sized,
{
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        self.as_ref().allocate(layout)
    }

    fn mem_usage(&self) -> usize {
        self.as_ref().mem_usage()
    }
}
