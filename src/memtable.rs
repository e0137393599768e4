use std::{cmp, ops::Bound, sync::Arc};

use bytes::Bytes;
use memkv_skiplist::{
    Iter as ListKeys, SkipList, SkipListIter, SkipListReader, options::SkipListOptions,
};
use parking_lot::Mutex;

use crate::{
    comparator::prelude::*,
    error::{Error, Result},
    format::{
        MAX_SEQ, MemTableEntry, Seq, ValueType, get_mem_internal_key, get_mem_value,
        make_lookup_key, make_memtable_key, make_seek_key,
    },
    iterator::Iter,
    options::MemTableOptions,
};

/// Orders memtable entries by their internal key.
#[derive(Clone, Debug)]
pub struct MemTableKeyComparator<C> {
    c: InternalKeyComparator<C>,
}

impl<C> MemTableKeyComparator<C>
where
    C: Comparator<Item = [u8]>,
{
    pub fn new(c: InternalKeyComparator<C>) -> Self {
        Self { c }
    }

    pub fn user_comparator(&self) -> &C {
        self.c.user_comparator()
    }
}

impl<C> Comparator for MemTableKeyComparator<C>
where
    C: Comparator<Item = [u8]>,
{
    type Item = Bytes;

    fn compare(&self, a: &Bytes, b: &Bytes) -> cmp::Ordering {
        self.c
            .compare(get_mem_internal_key(a), get_mem_internal_key(b))
    }
}

type List<C> = SkipList<Bytes, MemTableKeyComparator<C>>;
type ListReader<C> = SkipListReader<Bytes, MemTableKeyComparator<C>>;
type ListIter<C> = SkipListIter<Bytes, MemTableKeyComparator<C>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    Found(Bytes),
    /// The newest visible version is a tombstone.
    Deleted,
    NotFound,
}

/// In-memory write buffer.
///
/// Holds the skip list's single writer handle, so writes need `&mut self`.
/// Lookups go through a [`MemTableReader`] and can run on other threads
/// while writes happen.
pub struct MemTable<C = BytewiseComparator>
where
    C: Comparator<Item = [u8]>,
{
    list: List<C>,
    reader: MemTableReader<C>,
    id: u32,
    data_size: usize,
}

impl MemTable<BytewiseComparator> {
    pub fn new(id: u32) -> Result<Self> {
        MemTableOptions::new().id(id).build(BytewiseComparator)
    }
}

impl<C> MemTable<C>
where
    C: Comparator<Item = [u8]>,
{
    pub(crate) fn with_options(c: C, id: u32, opts: &SkipListOptions) -> Result<Self> {
        let list = opts.build(MemTableKeyComparator::new(InternalKeyComparator::new(c)))?;
        let reader = MemTableReader {
            list: list.reader(),
        };
        Ok(Self {
            list,
            reader,
            id,
            data_size: 0,
        })
    }

    /// Returns `Ok(false)` if `key` was already written at `seq`, whether by
    /// a put or a delete.
    pub fn put(&mut self, seq: Seq, key: &[u8], value: &[u8]) -> Result<bool> {
        self.add(seq, ValueType::Value, key, value)
    }

    /// Writes a tombstone for `key`.
    pub fn delete(&mut self, seq: Seq, key: &[u8]) -> Result<bool> {
        self.add(seq, ValueType::Deletion, key, &[])
    }

    fn add(&mut self, seq: Seq, value_type: ValueType, key: &[u8], value: &[u8]) -> Result<bool> {
        if seq > MAX_SEQ {
            return Err(Error::SequenceOverflow(seq));
        }

        if self.reader.written_at(key, seq)? {
            tracing::warn!(
                id = self.id,
                seq,
                ?value_type,
                "memtable rejected a second write at the same sequence"
            );
            return Ok(false);
        }

        let entry = make_memtable_key(seq, value_type, key, value)?;
        let size = entry.len();
        let inserted = self.list.insert(entry)?;
        if inserted {
            self.data_size += size;
        }
        tracing::trace!(id = self.id, seq, ?value_type, inserted, "memtable add");
        Ok(inserted)
    }

    pub fn get(&self, key: &[u8], seq: Seq) -> Result<LookupResult> {
        self.reader.get(key, seq)
    }

    pub fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<Scan<'_, C>> {
        self.reader.scan(lower, upper)
    }

    pub fn iter(&self) -> MemTableIter<C> {
        self.reader.iter()
    }

    pub fn reader(&self) -> MemTableReader<C> {
        self.reader.clone()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Arena memory plus the encoded entries.
    pub fn approximate_memory_usage(&self) -> usize {
        self.list.mem_usage() + self.data_size
    }
}

/// Lock-free read side of a [`MemTable`].
pub struct MemTableReader<C = BytewiseComparator> {
    list: ListReader<C>,
}

impl<C> Clone for MemTableReader<C> {
    fn clone(&self) -> Self {
        Self {
            list: self.list.clone(),
        }
    }
}

impl<C> MemTableReader<C>
where
    C: Comparator<Item = [u8]>,
{
    fn user_comparator(&self) -> &C {
        self.list.comparator().user_comparator()
    }

    /// Newest version of `key` with a sequence number `<= seq`.
    pub fn get(&self, key: &[u8], seq: Seq) -> Result<LookupResult> {
        let lookup = make_lookup_key(seq.min(MAX_SEQ), key)?;
        let Some(entry) = self.list.find_greater_or_equal(&lookup) else {
            return Ok(LookupResult::NotFound);
        };

        let entry = MemTableEntry::decode(entry)?;
        if !self.user_comparator().equal(&entry.user_key, key) {
            return Ok(LookupResult::NotFound);
        }
        Ok(match entry.value_type {
            ValueType::Value => LookupResult::Found(entry.value),
            ValueType::Deletion => LookupResult::Deleted,
        })
    }

    /// Whether an entry of `key` with exactly `seq` exists, of either type.
    fn written_at(&self, key: &[u8], seq: Seq) -> Result<bool> {
        // Sorts at or before both types at `seq`, and after every newer one.
        let lookup = make_lookup_key(seq, key)?;
        let Some(entry) = self.list.find_greater_or_equal(&lookup) else {
            return Ok(false);
        };
        let entry = MemTableEntry::decode(entry)?;
        Ok(entry.seq == seq && self.user_comparator().equal(&entry.user_key, key))
    }

    /// Every entry, all versions and tombstones included, whose user key is
    /// within the bounds. Versions of a user key come newest first.
    pub fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<Scan<'_, C>> {
        let (iter, skip) = match lower {
            Bound::Included(key) => (self.list.range_from(&make_lookup_key(MAX_SEQ, key)?), None),
            Bound::Excluded(key) => (
                self.list.range_from(&make_lookup_key(MAX_SEQ, key)?),
                Some(Bytes::copy_from_slice(key)),
            ),
            Bound::Unbounded => (self.list.iter(), None),
        };
        Ok(Scan {
            iter,
            skip,
            upper: upper.map(Bytes::copy_from_slice),
            c: self.user_comparator(),
            done: false,
        })
    }

    pub fn iter(&self) -> MemTableIter<C> {
        MemTableIter {
            iter: self.list.cursor(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Range scan over a memtable, see [`MemTableReader::scan`].
pub struct Scan<'a, C> {
    iter: ListKeys<'a, Bytes>,
    skip: Option<Bytes>,
    upper: Bound<Bytes>,
    c: &'a C,
    done: bool,
}

impl<C> Scan<'_, C>
where
    C: Comparator<Item = [u8]>,
{
    fn below_upper(&self, user_key: &[u8]) -> bool {
        match &self.upper {
            Bound::Included(upper) => self.c.compare(user_key, upper).is_le(),
            Bound::Excluded(upper) => self.c.compare(user_key, upper).is_lt(),
            Bound::Unbounded => true,
        }
    }
}

impl<C> Iterator for Scan<'_, C>
where
    C: Comparator<Item = [u8]>,
{
    type Item = Result<MemTableEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let entry = match MemTableEntry::decode(self.iter.next()?) {
                Ok(entry) => entry,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            };

            if let Some(skip) = &self.skip {
                if self.c.equal(&entry.user_key, skip) {
                    continue;
                }
                self.skip = None;
            }

            if !self.below_upper(&entry.user_key) {
                self.done = true;
                break;
            }
            return Some(Ok(entry));
        }
        None
    }
}

/// Cursor over every memtable entry in internal key order.
pub struct MemTableIter<C> {
    iter: ListIter<C>,
}

impl<C> Iter for MemTableIter<C>
where
    C: Comparator<Item = [u8]>,
{
    fn prev(&mut self) {
        self.iter.prev();
    }

    fn next(&mut self) {
        self.iter.next();
    }

    fn key(&self) -> Option<&[u8]> {
        self.iter.key().map(|entry| get_mem_internal_key(entry))
    }

    fn value(&self) -> Option<&[u8]> {
        self.iter.key().map(|entry| get_mem_value(entry))
    }

    fn rewind(&mut self, from_last: bool) {
        match from_last {
            false => self.iter.seek_to_first(),
            true => self.iter.seek_to_last(),
        }
    }

    fn seek(&mut self, key: &[u8]) {
        match make_seek_key(key) {
            Ok(target) => self.iter.seek(&target),
            Err(e) => panic!("seek target is not an internal key: {e}"),
        }
    }

    fn is_valid(&self) -> bool {
        self.iter.is_valid()
    }
}

/// Memtable handle shared by an engine's threads.
///
/// Writers are serialized by a mutex around the single skip-list writer;
/// readers never touch the lock.
pub struct SharedMemTable<C = BytewiseComparator>
where
    C: Comparator<Item = [u8]>,
{
    writer: Arc<Mutex<MemTable<C>>>,
    reader: MemTableReader<C>,
    id: u32,
}

impl<C> Clone for SharedMemTable<C>
where
    C: Comparator<Item = [u8]>,
{
    fn clone(&self) -> Self {
        Self {
            writer: self.writer.clone(),
            reader: self.reader.clone(),
            id: self.id,
        }
    }
}

impl<C> SharedMemTable<C>
where
    C: Comparator<Item = [u8]>,
{
    pub fn new(table: MemTable<C>) -> Self {
        let reader = table.reader();
        let id = table.id();
        Self {
            writer: Arc::new(Mutex::new(table)),
            reader,
            id,
        }
    }

    pub fn put(&self, seq: Seq, key: &[u8], value: &[u8]) -> Result<bool> {
        self.writer.lock().put(seq, key, value)
    }

    pub fn delete(&self, seq: Seq, key: &[u8]) -> Result<bool> {
        self.writer.lock().delete(seq, key)
    }

    pub fn get(&self, key: &[u8], seq: Seq) -> Result<LookupResult> {
        self.reader.get(key, seq)
    }

    pub fn scan(&self, lower: Bound<&[u8]>, upper: Bound<&[u8]>) -> Result<Scan<'_, C>> {
        self.reader.scan(lower, upper)
    }

    pub fn reader(&self) -> MemTableReader<C> {
        self.reader.clone()
    }

    pub fn len(&self) -> usize {
        self.reader.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reader.is_empty()
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn approximate_memory_usage(&self) -> usize {
        self.writer.lock().approximate_memory_usage()
    }
}
