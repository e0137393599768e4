use memkv_skiplist::options::SkipListOptions;

use crate::{
    comparator::prelude::*,
    error::Result,
    memtable::MemTable,
};

#[derive(Debug, Clone, Default)]
pub struct MemTableOptions {
    id: u32,
    skip_list: SkipListOptions,
}

impl MemTableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Identifier the engine uses to order memtables.
    pub fn id(&mut self, id: u32) -> &mut Self {
        self.id = id;
        self
    }

    /// Options for the underlying skip list.
    pub fn skip_list(&mut self, opts: SkipListOptions) -> &mut Self {
        self.skip_list = opts;
        self
    }

    pub fn build<C>(&self, c: C) -> Result<MemTable<C>>
    where
        C: Comparator<Item = [u8]>,
    {
        MemTable::with_options(c, self.id, &self.skip_list)
    }
}
