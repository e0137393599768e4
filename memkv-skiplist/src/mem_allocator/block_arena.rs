use std::{
    alloc::{self, Layout},
    mem,
    ptr::{self, NonNull},
    sync::atomic::{AtomicUsize, Ordering::*},
};

use parking_lot::Mutex;

use super::MemAllocator;
use crate::error::{Error, Result};

pub const DEFAULT_BLOCK_SIZE: usize = 4096;

const BLOCK_ALIGN: usize = mem::align_of::<usize>();

struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
}

struct BlockArenaInner {
    blocks: Vec<Block>,
    ptr: NonNull<u8>,
    remaining_size: usize,
}

// Every pointer in here refers to a block owned by the arena.
unsafe impl Send for BlockArenaInner {}

impl BlockArenaInner {
    fn alloc_block(&mut self, size: usize, align: usize) -> Result<NonNull<u8>> {
        let layout = Layout::from_size_align(size, align.max(BLOCK_ALIGN))?;
        // SAFETY: callers never ask for an empty block.
        let ptr = unsafe { alloc::alloc(layout) };
        let ptr = NonNull::new(ptr).ok_or(Error::OutOfMemory {
            size,
            align: layout.align(),
        })?;
        self.blocks.push(Block { ptr, layout });
        Ok(ptr)
    }
}

/// Bump allocator handing out ranges carved from fixed-size blocks.
///
/// Nothing is freed individually: all blocks are released together when the
/// arena drops. Requests bigger than a quarter of a block get a block of
/// their own so the tail of the current block is not wasted.
///
/// The bump state sits behind a mutex. A skip list only allocates from its
/// writer, so the lock is never contended there.
pub struct BlockArena {
    inner: Mutex<BlockArenaInner>,
    block_size: usize,
    memory_usage: AtomicUsize,
}

impl BlockArena {
    pub fn new() -> Self {
        Self::with_block_size(DEFAULT_BLOCK_SIZE)
    }

    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            inner: Mutex::new(BlockArenaInner {
                blocks: Vec::new(),
                ptr: NonNull::dangling(),
                remaining_size: 0,
            }),
            block_size: block_size.max(BLOCK_ALIGN),
            memory_usage: AtomicUsize::new(0),
        }
    }

    /// `n` bytes with no alignment guarantee.
    pub fn allocate_bytes(&self, n: usize) -> Result<NonNull<u8>> {
        self.alloc(Layout::from_size_align(n, 1)?)
    }

    /// `n` bytes aligned for a pointer.
    pub fn allocate_aligned(&self, n: usize) -> Result<NonNull<u8>> {
        self.alloc(Layout::from_size_align(n, BLOCK_ALIGN)?)
    }

    pub fn alloc(&self, layout: Layout) -> Result<NonNull<u8>> {
        if layout.size() == 0 {
            return Ok(dangling(layout.align()));
        }

        let mut inner = self.inner.lock();

        if layout.size() + layout.align() > self.block_size / 4 {
            let ptr = inner.alloc_block(layout.size(), layout.align())?;
            self.account(layout.size());
            return Ok(ptr);
        }

        let mut slop = align_offset(inner.ptr, layout.align());
        if slop + layout.size() > inner.remaining_size {
            let block = inner.alloc_block(self.block_size, BLOCK_ALIGN)?;
            self.account(self.block_size);
            inner.ptr = block;
            inner.remaining_size = self.block_size;
            slop = align_offset(block, layout.align());
        }

        let need = slop + layout.size();
        debug_assert!(need <= inner.remaining_size);
        // SAFETY: the `need` bytes past the cursor lie inside the current block.
        let (aligned, tail) = unsafe {
            let aligned = inner.ptr.add(slop);
            (aligned, aligned.add(layout.size()))
        };
        inner.ptr = tail;
        inner.remaining_size -= need;
        Ok(aligned)
    }

    fn account(&self, size: usize) {
        let usage = self.memory_usage.fetch_add(size, Relaxed) + size;
        tracing::debug!(block_size = size, memory_usage = usage, "arena allocated a new block");
    }

    pub fn memory_usage(&self) -> usize {
        self.memory_usage.load(Relaxed)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }
}

impl Default for BlockArena {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BlockArena {
    fn drop(&mut self) {
        for block in self.inner.get_mut().blocks.drain(..) {
            // SAFETY: each block was obtained from `alloc::alloc` with this layout.
            unsafe { alloc::dealloc(block.ptr.as_ptr(), block.layout) };
        }
    }
}

unsafe impl MemAllocator for BlockArena {
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>> {
        self.alloc(layout)
    }

    fn mem_usage(&self) -> usize {
        self.memory_usage()
    }
}

fn align_offset(ptr: NonNull<u8>, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (ptr.as_ptr() as usize).wrapping_neg() & (align - 1)
}

fn dangling(align: usize) -> NonNull<u8> {
    // SAFETY: alignments are never zero.
    unsafe { NonNull::new_unchecked(ptr::without_provenance_mut(align)) }
}
