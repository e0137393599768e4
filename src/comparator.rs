mod bytewise_comparator;
mod internal_key_comparator;

pub use memkv_skiplist::comparator::Comparator;

pub mod prelude {
    pub use super::{
        Comparator, bytewise_comparator::BytewiseComparator,
        internal_key_comparator::InternalKeyComparator,
    };
}
