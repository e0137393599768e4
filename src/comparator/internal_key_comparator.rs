use std::cmp::{self, Ordering::*};

use crate::format::{get_key_tag, get_user_key};

use super::Comparator;

/// Orders internal keys by user key ascending, then by tag descending, so
/// the newest version of a user key comes first.
#[derive(Clone, Debug, Default)]
pub struct InternalKeyComparator<C> {
    c: C,
}

impl<C> InternalKeyComparator<C>
where
    C: Comparator<Item = [u8]>,
{
    pub fn new(c: C) -> Self {
        Self { c }
    }

    pub fn user_comparator(&self) -> &C {
        &self.c
    }
}

impl<C> Comparator for InternalKeyComparator<C>
where
    C: Comparator<Item = [u8]>,
{
    type Item = [u8];

    fn compare(&self, a: &[u8], b: &[u8]) -> cmp::Ordering {
        match self.c.compare(get_user_key(a), get_user_key(b)) {
            Equal => get_key_tag(a).cmp(&get_key_tag(b)).reverse(),
            res => res,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering::*;

    use crate::{
        comparator::prelude::*,
        format::{ValueType, make_internal_key},
    };

    fn key(user_key: &[u8], seq: u64) -> Vec<u8> {
        make_internal_key(user_key, seq, ValueType::Value).to_vec()
    }

    #[test]
    fn internal_key_compare() {
        let cmp = InternalKeyComparator::new(BytewiseComparator);

        assert_eq!(cmp.compare(&key(b"key1", 1), &key(b"key2", 3)), Less);
        assert_eq!(cmp.compare(&key(b"key2", 1), &key(b"key1", 0)), Greater);
        assert_eq!(cmp.compare(&key(b"key", 1), &key(b"key", 1)), Equal);
        assert_eq!(cmp.compare(&key(b"key", 1), &key(b"key", 2)), Greater);
        assert_eq!(cmp.compare(&key(b"key", 2), &key(b"key", 1)), Less);
    }

    #[test]
    fn deletion_sorts_after_value_at_same_seq() {
        let cmp = InternalKeyComparator::new(BytewiseComparator);
        let put = make_internal_key(b"key", 7, ValueType::Value);
        let del = make_internal_key(b"key", 7, ValueType::Deletion);
        assert_eq!(cmp.compare(&put, &del), Less);
    }
}
