use std::{
    alloc::Layout,
    cmp::Ordering::*,
    fmt,
    iter::FusedIterator,
    marker::PhantomData,
    mem::{self, MaybeUninit},
    ptr::{self, NonNull},
    slice,
    sync::{
        Arc,
        atomic::{AtomicPtr, AtomicUsize, Ordering::*},
    },
};

use crossbeam::utils::CachePadded;

use crate::{
    comparator::prelude::*,
    error::Result,
    mem_allocator::prelude::*,
    options::{MAX_HEIGHT_LIMIT, SkipListOptions},
    random::Random,
};

/// Header of a variable-length node.
///
/// The node's tower of `height` forward pointers is laid out directly after
/// the header, at offset `size_of::<Node<K>>()`. The header holds a `usize`,
/// so that offset is always aligned for `AtomicPtr`. `tower[0]` is the
/// lowest level link.
#[repr(C)]
struct Node<K> {
    key: MaybeUninit<K>,
    height: usize,
}

impl<K> Node<K> {
    fn layout(height: usize) -> Result<Layout> {
        let tower = Layout::array::<AtomicPtr<Self>>(height)?;
        let (layout, offset) = Layout::new::<Self>().extend(tower)?;
        debug_assert_eq!(offset, mem::size_of::<Self>());
        Ok(layout.pad_to_align())
    }

    /// Allocates a node whose key is left uninitialized.
    fn new_in(height: usize, a: &impl MemAllocator) -> Result<*mut Self> {
        let layout = Self::layout(height)?;
        let p = a.allocate(layout)?.as_ptr().cast::<Self>();
        debug_assert!(p.is_aligned());

        // SAFETY: `p` is valid for `layout`, which covers the header and the
        // whole tower.
        unsafe {
            ptr::write(
                p,
                Node {
                    key: MaybeUninit::uninit(),
                    height,
                },
            );
            let tower = Self::tower_ptr(p);
            for level in 0..height {
                ptr::write(tower.add(level), AtomicPtr::new(ptr::null_mut()));
            }
        }
        Ok(p)
    }

    /// # Safety
    ///
    /// `this` must come from `new_in`.
    unsafe fn tower_ptr(this: *mut Self) -> *mut AtomicPtr<Self> {
        unsafe { this.cast::<u8>().add(mem::size_of::<Self>()).cast() }
    }

    /// The node's forward pointers; indexing at or above its height panics.
    ///
    /// # Safety
    ///
    /// `this` must point at a live node.
    unsafe fn tower<'a>(this: *mut Self) -> &'a [AtomicPtr<Self>] {
        unsafe { slice::from_raw_parts(Self::tower_ptr(this), (*this).height) }
    }

    /// Reader-visible load, pairs with the release in `set_next`.
    unsafe fn next(this: *mut Self, level: usize) -> *mut Self {
        unsafe { Self::tower(this)[level].load(Acquire) }
    }

    /// Publishes `node` at `level`. Everything written to `node` before this
    /// call is visible to any reader that loads it from here.
    unsafe fn set_next(this: *mut Self, level: usize, node: *mut Self) {
        unsafe { Self::tower(this)[level].store(node, Release) }
    }

    unsafe fn no_barrier_next(this: *mut Self, level: usize) -> *mut Self {
        unsafe { Self::tower(this)[level].load(Relaxed) }
    }

    unsafe fn no_barrier_set_next(this: *mut Self, level: usize, node: *mut Self) {
        unsafe { Self::tower(this)[level].store(node, Relaxed) }
    }

    /// # Safety
    ///
    /// `this` must be a live node other than the head sentinel.
    unsafe fn key<'a>(this: *mut Self) -> &'a K {
        unsafe { (*this).key.assume_init_ref() }
    }
}

struct Inner<K, C, A> {
    height: CachePadded<AtomicUsize>,
    len: CachePadded<AtomicUsize>,
    head: NonNull<Node<K>>,
    max_height: usize,
    c: C,
    a: A,
    _marker: PhantomData<K>,
}

// Nodes are only reachable through `Inner`, and keys are shared between
// threads by reference.
unsafe impl<K, C, A> Send for Inner<K, C, A>
where
    K: Send + Sync,
    C: Send,
    A: Send,
{
}

unsafe impl<K, C, A> Sync for Inner<K, C, A>
where
    K: Send + Sync,
    C: Sync,
    A: Sync,
{
}

impl<K, C, A> Inner<K, C, A>
where
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    fn head(&self) -> *mut Node<K> {
        self.head.as_ptr()
    }

    fn height(&self) -> usize {
        self.height.load(Acquire)
    }

    fn len(&self) -> usize {
        self.len.load(Relaxed)
    }

    fn key_is_after_node(&self, key: &K, n: *mut Node<K>) -> bool {
        !n.is_null() && self.c.compare(unsafe { Node::key(n) }, key) == Less
    }

    /// First node whose key is `>= key`, or null. When `prev` is given, it
    /// receives the rightmost node before that position on every level below
    /// the current height.
    fn find_greater_or_equal(
        &self,
        key: &K,
        mut prev: Option<&mut [*mut Node<K>]>,
    ) -> *mut Node<K> {
        let mut cur = self.head();
        let mut level = self.height() - 1;
        loop {
            let next = unsafe { Node::next(cur, level) };
            if self.key_is_after_node(key, next) {
                cur = next;
                continue;
            }

            if let Some(prev) = prev.as_deref_mut() {
                prev[level] = cur;
            }
            if level == 0 {
                return next;
            }
            level -= 1;
        }
    }

    /// Rightmost node whose key is `< key`, or the head.
    fn find_less_than(&self, key: &K) -> *mut Node<K> {
        let head = self.head();
        let mut cur = head;
        let mut level = self.height() - 1;
        loop {
            let next = unsafe { Node::next(cur, level) };
            if next.is_null() || self.c.compare(unsafe { Node::key(next) }, key) != Less {
                if level == 0 {
                    return cur;
                }
                level -= 1;
            } else {
                cur = next;
            }
        }
    }

    /// Last node of the list, or the head when empty.
    fn find_last(&self) -> *mut Node<K> {
        let mut cur = self.head();
        let mut level = self.height() - 1;
        loop {
            let next = unsafe { Node::next(cur, level) };
            if !next.is_null() {
                cur = next;
                continue;
            }
            if level == 0 {
                return cur;
            }
            level -= 1;
        }
    }

    fn find_first(&self) -> *mut Node<K> {
        unsafe { Node::next(self.head(), 0) }
    }

    /// Maps the head sentinel and null to `None`.
    fn key_of<'a>(&self, node: *mut Node<K>) -> Option<&'a K> {
        if node.is_null() || ptr::eq(node, self.head()) {
            None
        } else {
            Some(unsafe { Node::key(node) })
        }
    }
}

impl<K, C, A> Drop for Inner<K, C, A> {
    fn drop(&mut self) {
        if !mem::needs_drop::<K>() {
            return;
        }
        // Keys are dropped here; their memory goes away with the allocator.
        unsafe {
            let mut cur = Node::next(self.head.as_ptr(), 0);
            while !cur.is_null() {
                let next = Node::next(cur, 0);
                (*cur).key.assume_init_drop();
                cur = next;
            }
        }
    }
}

/// Read handle of a skip list.
///
/// Cheap to clone, `Send` and `Sync`. Any number of readers may run while
/// the writer inserts; they never take a lock and never see a partially
/// linked node.
pub struct SkipListReader<K, C, A = BlockArena> {
    inner: Arc<Inner<K, C, A>>,
}

impl<K, C, A> Clone for SkipListReader<K, C, A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, C, A> SkipListReader<K, C, A>
where
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    pub fn contains(&self, key: &K) -> bool {
        let node = self.inner.find_greater_or_equal(key, None);
        !node.is_null() && self.inner.c.equal(key, unsafe { Node::key(node) })
    }

    /// The smallest key `>= key`.
    pub fn find_greater_or_equal(&self, key: &K) -> Option<&K> {
        self.inner
            .key_of(self.inner.find_greater_or_equal(key, None))
    }

    /// The largest key `< key`.
    pub fn find_less_than(&self, key: &K) -> Option<&K> {
        self.inner.key_of(self.inner.find_less_than(key))
    }

    pub fn find_first(&self) -> Option<&K> {
        self.inner.key_of(self.inner.find_first())
    }

    pub fn find_last(&self) -> Option<&K> {
        self.inner.key_of(self.inner.find_last())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current maximum height over all nodes; never decreases.
    pub fn height(&self) -> usize {
        self.inner.height()
    }

    pub fn max_height(&self) -> usize {
        self.inner.max_height
    }

    pub fn mem_usage(&self) -> usize {
        self.inner.a.mem_usage()
    }

    pub fn comparator(&self) -> &C {
        &self.inner.c
    }

    /// Keys in ascending order.
    pub fn iter(&self) -> Iter<'_, K> {
        Iter::new(self.inner.find_first())
    }

    /// Keys in ascending order, starting at the first key `>= key`.
    pub fn range_from(&self, key: &K) -> Iter<'_, K> {
        Iter::new(self.inner.find_greater_or_equal(key, None))
    }

    /// Seekable cursor that keeps the list alive on its own.
    pub fn cursor(&self) -> SkipListIter<K, C, A> {
        SkipListIter::new(self.clone())
    }
}

impl<K, C, A> fmt::Debug for SkipListReader<K, C, A>
where
    K: fmt::Debug,
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Write handle of a skip list.
///
/// There is exactly one per list: it is not `Clone` and [`SkipList::insert`]
/// takes `&mut self`, so two inserts can never overlap. Readers are obtained
/// with [`SkipList::reader`] and stay valid after the writer is dropped.
pub struct SkipList<K, C, A = BlockArena> {
    reader: SkipListReader<K, C, A>,
    rnd: Random,
    branching: u32,
}

impl<K, C> SkipList<K, C>
where
    C: Comparator<Item = K>,
{
    /// A list with default options.
    pub fn new(c: C) -> Result<Self> {
        SkipListOptions::default().build(c)
    }
}

impl<K, C, A> SkipList<K, C, A>
where
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    pub(crate) fn with_allocator(c: C, a: A, opts: &SkipListOptions) -> Result<Self> {
        debug_assert!(opts.max_height <= MAX_HEIGHT_LIMIT);
        let head = Node::new_in(opts.max_height, &a)?;
        let inner = Inner {
            height: CachePadded::new(AtomicUsize::new(1)),
            len: CachePadded::new(AtomicUsize::new(0)),
            // SAFETY: allocators never return null.
            head: unsafe { NonNull::new_unchecked(head) },
            max_height: opts.max_height,
            c,
            a,
            _marker: PhantomData,
        };
        Ok(Self {
            reader: SkipListReader {
                inner: Arc::new(inner),
            },
            rnd: Random::new(opts.seed),
            branching: opts.branching,
        })
    }

    /// Inserts `key`.
    ///
    /// Returns `Ok(false)` and leaves the list untouched when an equal key is
    /// already present. An allocation failure is returned as an error and
    /// also leaves the list untouched.
    pub fn insert(&mut self, key: K) -> Result<bool> {
        let inner = &*self.reader.inner;
        let head = inner.head();

        let mut prev = [ptr::null_mut(); MAX_HEIGHT_LIMIT];
        let found = inner.find_greater_or_equal(&key, Some(&mut prev[..]));
        if !found.is_null() && inner.c.equal(&key, unsafe { Node::key(found) }) {
            tracing::warn!(len = inner.len(), "skip list rejected a duplicate key");
            return Ok(false);
        }

        let height = self.rnd.random_height(inner.max_height, self.branching);
        let node = Node::new_in(height, &inner.a)?;
        unsafe { (*node).key.write(key) };

        let cur_height = inner.height();
        if height > cur_height {
            // Nothing has been linked at these levels yet.
            for p in &mut prev[cur_height..height] {
                *p = head;
            }
            // A reader that still sees the old height starts lower, which is
            // fine. One that sees the new height finds null heads up there
            // until the links below are published.
            inner.height.store(height, Release);
            tracing::debug!(from = cur_height, to = height, "raised skip list height");
        }

        // The node's own pointer goes first with no barrier, since nobody can
        // reach the node yet. The release store into `prev` then publishes it
        // together with its key and that pointer.
        for (level, &p) in prev.iter().enumerate().take(height) {
            unsafe {
                Node::no_barrier_set_next(node, level, Node::no_barrier_next(p, level));
                Node::set_next(p, level, node);
            }
        }

        inner.len.fetch_add(1, Relaxed);
        Ok(true)
    }

    pub fn reader(&self) -> SkipListReader<K, C, A> {
        self.reader.clone()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.reader.contains(key)
    }

    pub fn find_greater_or_equal(&self, key: &K) -> Option<&K> {
        self.reader.find_greater_or_equal(key)
    }

    pub fn find_less_than(&self, key: &K) -> Option<&K> {
        self.reader.find_less_than(key)
    }

    pub fn find_first(&self) -> Option<&K> {
        self.reader.find_first()
    }

    pub fn find_last(&self) -> Option<&K> {
        self.reader.find_last()
    }

    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    pub fn height(&self) -> usize {
        self.reader.height()
    }

    pub fn max_height(&self) -> usize {
        self.reader.max_height()
    }

    pub fn mem_usage(&self) -> usize {
        self.reader.mem_usage()
    }

    pub fn comparator(&self) -> &C {
        self.reader.comparator()
    }

    pub fn iter(&self) -> Iter<'_, K> {
        self.reader.iter()
    }

    pub fn range_from(&self, key: &K) -> Iter<'_, K> {
        self.reader.range_from(key)
    }

    pub fn cursor(&self) -> SkipListIter<K, C, A> {
        self.reader.cursor()
    }
}

impl<K, C, A> fmt::Debug for SkipList<K, C, A>
where
    K: fmt::Debug,
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reader.fmt(f)
    }
}

/// Borrowing iterator over level 0.
pub struct Iter<'a, K> {
    cur: *mut Node<K>,
    _marker: PhantomData<&'a K>,
}

unsafe impl<K: Sync> Send for Iter<'_, K> {}
unsafe impl<K: Sync> Sync for Iter<'_, K> {}

impl<K> Iter<'_, K> {
    fn new(cur: *mut Node<K>) -> Self {
        Self {
            cur,
            _marker: PhantomData,
        }
    }
}

impl<'a, K> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() {
            return None;
        }
        let node = self.cur;
        unsafe {
            self.cur = Node::next(node, 0);
            Some(Node::key(node))
        }
    }
}

impl<K> FusedIterator for Iter<'_, K> {}

/// Seekable cursor over a skip list.
///
/// Holds its own reader handle, so it can be moved to another thread or
/// outlive the writer.
pub struct SkipListIter<K, C, A = BlockArena> {
    list: SkipListReader<K, C, A>,
    cur: *mut Node<K>,
}

unsafe impl<K, C, A> Send for SkipListIter<K, C, A> where SkipListReader<K, C, A>: Send {}

unsafe impl<K, C, A> Sync for SkipListIter<K, C, A> where SkipListReader<K, C, A>: Sync {}

impl<K, C, A> SkipListIter<K, C, A>
where
    C: Comparator<Item = K>,
    A: MemAllocator,
{
    pub fn new(list: SkipListReader<K, C, A>) -> Self {
        SkipListIter {
            list,
            cur: ptr::null_mut(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.cur.is_null()
    }

    pub fn key(&self) -> Option<&K> {
        self.list.inner.key_of(self.cur)
    }

    pub fn next(&mut self) {
        assert!(self.is_valid());
        self.cur = unsafe { Node::next(self.cur, 0) };
    }

    pub fn prev(&mut self) {
        assert!(self.is_valid());
        let inner = &self.list.inner;
        let node = inner.find_less_than(unsafe { Node::key(self.cur) });
        self.cur = if ptr::eq(node, inner.head()) {
            ptr::null_mut()
        } else {
            node
        };
    }

    pub fn seek(&mut self, key: &K) {
        self.cur = self.list.inner.find_greater_or_equal(key, None);
    }

    pub fn seek_to_first(&mut self) {
        self.cur = self.list.inner.find_first();
    }

    pub fn seek_to_last(&mut self) {
        let inner = &self.list.inner;
        let node = inner.find_last();
        self.cur = if ptr::eq(node, inner.head()) {
            ptr::null_mut()
        } else {
            node
        };
    }
}
