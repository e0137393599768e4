use crate::format::Seq;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SkipList: {0}")]
    SkipList(#[from] memkv_skiplist::Error),

    #[error("Decode: {0}")]
    Decode(String),

    #[error("Internal key of {0} bytes does not fit a u32 length prefix")]
    KeyTooLarge(usize),

    #[error("Sequence number {0} does not fit in 56 bits")]
    SequenceOverflow(Seq),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
