/// Seekable cursor over encoded internal keys.
pub trait Iter {
    fn prev(&mut self);

    fn next(&mut self);

    /// Internal key at the cursor.
    fn key(&self) -> Option<&[u8]>;

    fn value(&self) -> Option<&[u8]>;

    /// Moves to the first entry, or to the last one when `from_last` is set.
    fn rewind(&mut self, from_last: bool);

    /// Moves to the first entry whose internal key is `>= key`.
    ///
    /// # Panics
    ///
    /// If `key` is not an encoded internal key, i.e. shorter than its 8-byte
    /// tag.
    fn seek(&mut self, key: &[u8]);

    fn is_valid(&self) -> bool;
}
