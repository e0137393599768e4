use std::alloc::LayoutError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Out of memory: failed to allocate {size} bytes (align {align})")]
    OutOfMemory { size: usize, align: usize },

    #[error("Layout error: {0}")]
    Layout(#[from] LayoutError),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
