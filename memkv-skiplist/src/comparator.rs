use std::cmp;

mod default_comparator;

pub mod prelude {
    pub use super::Comparator;
    pub use super::default_comparator::{DefaultComparator, FnComparator};
}

/// Total order over keys, supplied once when a skip list is built.
///
/// Implementations must be consistent across calls: the list relies on the
/// same pair of keys always comparing the same way.
pub trait Comparator: Send + Sync {
    type Item: ?Sized;

    fn compare(&self, a: &Self::Item, b: &Self::Item) -> cmp::Ordering;

    fn equal(&self, a: &Self::Item, b: &Self::Item) -> bool {
        self.compare(a, b).is_eq()
    }
}

impl<C> Comparator for &C
where
    C: Comparator + ?Sized,
{
    type Item = C::Item;

    fn compare(&self, a: &Self::Item, b: &Self::Item) -> cmp::Ordering {
        (**self).compare(a, b)
    }
}
