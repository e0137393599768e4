use std::cmp;

use super::Comparator;

/// Lexicographic order over raw bytes.
#[derive(Clone, Copy, Debug, Default)]
pub struct BytewiseComparator;

impl Comparator for BytewiseComparator {
    type Item = [u8];

    fn compare(&self, a: &[u8], b: &[u8]) -> cmp::Ordering {
        a.cmp(b)
    }
}
