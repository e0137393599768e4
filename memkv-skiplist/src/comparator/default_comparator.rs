use std::{cmp, fmt, marker::PhantomData};

use super::Comparator;

/// Orders keys by their [`Ord`] implementation.
pub struct DefaultComparator<T: ?Sized> {
    _marker: PhantomData<fn(&T, &T)>,
}

impl<T: ?Sized> DefaultComparator<T> {
    pub const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Comparator for DefaultComparator<T>
where
    T: Ord + ?Sized,
{
    type Item = T;

    fn compare(&self, a: &Self::Item, b: &Self::Item) -> cmp::Ordering {
        a.cmp(b)
    }
}

impl<T: ?Sized> Default for DefaultComparator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Clone for DefaultComparator<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for DefaultComparator<T> {}

impl<T: ?Sized> fmt::Debug for DefaultComparator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DefaultComparator")
    }
}

/// Adapts a closure into a [`Comparator`].
pub struct FnComparator<T: ?Sized, F> {
    f: F,
    _marker: PhantomData<fn(&T, &T)>,
}

impl<T, F> FnComparator<T, F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> cmp::Ordering + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _marker: PhantomData,
        }
    }
}

impl<T, F> Comparator for FnComparator<T, F>
where
    T: ?Sized,
    F: Fn(&T, &T) -> cmp::Ordering + Send + Sync,
{
    type Item = T;

    fn compare(&self, a: &Self::Item, b: &Self::Item) -> cmp::Ordering {
        (self.f)(a, b)
    }
}

impl<T: ?Sized, F: Clone> Clone for FnComparator<T, F> {
    fn clone(&self) -> Self {
        Self {
            f: self.f.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized, F> fmt::Debug for FnComparator<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnComparator")
    }
}
