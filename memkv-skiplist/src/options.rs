use crate::{
    comparator::Comparator,
    error::{Error, Result},
    mem_allocator::prelude::*,
    skip_list::SkipList,
};

/// Upper bound for [`SkipListOptions::max_height`].
pub const MAX_HEIGHT_LIMIT: usize = 32;

pub const DEFAULT_MAX_HEIGHT: usize = 20;

pub const DEFAULT_BRANCHING: u32 = 4;

pub const DEFAULT_SEED: u64 = 0xdeadbeef;

/// Smallest accepted [`SkipListOptions::arena_block_size`].
pub const MIN_ARENA_BLOCK_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct SkipListOptions {
    pub(crate) max_height: usize,
    pub(crate) branching: u32,
    pub(crate) seed: u64,
    pub(crate) arena_block_size: usize,
}

impl Default for SkipListOptions {
    fn default() -> Self {
        Self {
            max_height: DEFAULT_MAX_HEIGHT,
            branching: DEFAULT_BRANCHING,
            seed: DEFAULT_SEED,
            arena_block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl SkipListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of levels the head sentinel is built with.
    pub fn max_height(&mut self, height: usize) -> &mut Self {
        self.max_height = height;
        self
    }

    /// A node climbs one more level with probability `1 / branching`.
    pub fn branching(&mut self, branching: u32) -> &mut Self {
        self.branching = branching;
        self
    }

    /// Seed of the list's private height generator.
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = seed;
        self
    }

    /// Size of each arena block in bytes, at least [`MIN_ARENA_BLOCK_SIZE`].
    pub fn arena_block_size(&mut self, size: usize) -> &mut Self {
        self.arena_block_size = size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_HEIGHT_LIMIT).contains(&self.max_height) {
            return Err(Error::InvalidOptions(format!(
                "max_height must be in [1, {MAX_HEIGHT_LIMIT}], got {}",
                self.max_height
            )));
        }
        if self.branching < 2 {
            return Err(Error::InvalidOptions(format!(
                "branching must be at least 2, got {}",
                self.branching
            )));
        }
        if self.arena_block_size < MIN_ARENA_BLOCK_SIZE {
            return Err(Error::InvalidOptions(format!(
                "arena_block_size must be at least {MIN_ARENA_BLOCK_SIZE}, got {}",
                self.arena_block_size
            )));
        }
        Ok(())
    }

    /// Builds a list backed by a fresh [`BlockArena`].
    pub fn build<K, C>(&self, c: C) -> Result<SkipList<K, C>>
    where
        C: Comparator<Item = K>,
    {
        self.validate()?;
        SkipList::with_allocator(c, BlockArena::with_block_size(self.arena_block_size), self)
    }

    /// Builds a list on top of a caller-supplied allocator.
    pub fn build_in<K, C, A>(&self, c: C, a: A) -> Result<SkipList<K, C, A>>
    where
        C: Comparator<Item = K>,
        A: MemAllocator,
    {
        self.validate()?;
        SkipList::with_allocator(c, a, self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{comparator::prelude::*, error::Error, options::*};

    #[test]
    fn test_default_options() {
        let opts = SkipListOptions::new();
        assert!(opts.validate().is_ok());
        assert_eq!(opts.max_height, DEFAULT_MAX_HEIGHT);
        assert_eq!(opts.branching, DEFAULT_BRANCHING);
    }

    #[test]
    fn test_reject_bad_options() {
        let cases = [
            SkipListOptions::new().max_height(0).clone(),
            SkipListOptions::new().max_height(MAX_HEIGHT_LIMIT + 1).clone(),
            SkipListOptions::new().branching(1).clone(),
            SkipListOptions::new().arena_block_size(64).clone(),
            SkipListOptions::new()
                .arena_block_size(MIN_ARENA_BLOCK_SIZE - 1)
                .clone(),
        ];
        for opts in cases {
            let res = opts.build::<u64, _>(DefaultComparator::default());
            assert!(matches!(res, Err(Error::InvalidOptions(_))), "{opts:?}");
        }

        let smallest = SkipListOptions::new()
            .arena_block_size(MIN_ARENA_BLOCK_SIZE)
            .clone();
        assert!(smallest.validate().is_ok());
    }

    #[test]
    fn test_build_with_options() {
        let list = SkipListOptions::new()
            .max_height(4)
            .branching(2)
            .seed(1)
            .build(DefaultComparator::<u64>::default())
            .unwrap();
        assert_eq!(list.max_height(), 4);
        assert_eq!(list.height(), 1);
    }
}
