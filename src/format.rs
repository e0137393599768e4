//! Key encodings used by the memtable.
//!
//! An internal key is the user key followed by an 8-byte little-endian tag,
//! `seq << 8 | value_type`. A memtable entry, which is what the skip list
//! stores, is `u32 LE internal key length | internal key | value`.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

pub type Seq = u64;

/// Largest sequence number that fits in a tag.
pub const MAX_SEQ: Seq = (1 << 56) - 1;

const TAG_SIZE: usize = std::mem::size_of::<u64>();
const LEN_SIZE: usize = std::mem::size_of::<u32>();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueType {
    Deletion = 0,
    Value = 1,
}

/// Highest type, so a lookup key sorts before every entry with the same
/// user key and sequence number.
pub(crate) const VALUE_TYPE_FOR_SEEK: ValueType = ValueType::Value;

impl TryFrom<u8> for ValueType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ValueType::Deletion),
            1 => Ok(ValueType::Value),
            v => Err(Error::Decode(format!("unknown value type {v}"))),
        }
    }
}

pub fn pack_tag(seq: Seq, value_type: ValueType) -> u64 {
    debug_assert!(seq <= MAX_SEQ);
    (seq << 8) | value_type as u64
}

pub fn unpack_tag(tag: u64) -> Result<(Seq, ValueType)> {
    Ok((tag >> 8, ValueType::try_from((tag & 0xff) as u8)?))
}

pub fn get_user_key(internal_key: &[u8]) -> &[u8] {
    assert!(internal_key.len() >= TAG_SIZE);
    &internal_key[..internal_key.len() - TAG_SIZE]
}

pub fn get_key_tag(internal_key: &[u8]) -> u64 {
    assert!(internal_key.len() >= TAG_SIZE);
    (&internal_key[internal_key.len() - TAG_SIZE..]).get_u64_le()
}

pub fn get_key_seq(internal_key: &[u8]) -> Seq {
    get_key_tag(internal_key) >> 8
}

pub fn make_internal_key(user_key: &[u8], seq: Seq, value_type: ValueType) -> Bytes {
    let mut buf = BytesMut::with_capacity(user_key.len() + TAG_SIZE);
    buf.put(user_key);
    buf.put_u64_le(pack_tag(seq, value_type));
    buf.freeze()
}

/// Length prefix of an internal key; it must fit in a `u32`.
fn encode_ikey_len(ikey_len: usize) -> Result<u32> {
    u32::try_from(ikey_len).map_err(|_| Error::KeyTooLarge(ikey_len))
}

pub fn make_memtable_key(
    seq: Seq,
    value_type: ValueType,
    user_key: &[u8],
    value: &[u8],
) -> Result<Bytes> {
    let ikey_len = user_key.len() + TAG_SIZE;
    let prefix = encode_ikey_len(ikey_len)?;
    let mut buf = BytesMut::with_capacity(LEN_SIZE + ikey_len + value.len());
    buf.put_u32_le(prefix);
    buf.put(user_key);
    buf.put_u64_le(pack_tag(seq, value_type));
    buf.put(value);
    Ok(buf.freeze())
}

/// Memtable key that sorts before every entry of `user_key` visible at `seq`.
pub fn make_lookup_key(seq: Seq, user_key: &[u8]) -> Result<Bytes> {
    make_memtable_key(seq, VALUE_TYPE_FOR_SEEK, user_key, &[])
}

/// Wraps an already encoded internal key as a memtable key with no value.
pub fn make_seek_key(internal_key: &[u8]) -> Result<Bytes> {
    if internal_key.len() < TAG_SIZE {
        return Err(Error::Decode(format!(
            "internal key too short: {} bytes",
            internal_key.len()
        )));
    }
    let prefix = encode_ikey_len(internal_key.len())?;
    let mut buf = BytesMut::with_capacity(LEN_SIZE + internal_key.len());
    buf.put_u32_le(prefix);
    buf.put(internal_key);
    Ok(buf.freeze())
}

fn mem_internal_key_range(entry: &[u8]) -> Result<(usize, usize)> {
    if entry.len() < LEN_SIZE {
        return Err(Error::Decode(format!(
            "memtable entry too short: {} bytes",
            entry.len()
        )));
    }
    let ikey_len = (&entry[..LEN_SIZE]).get_u32_le() as usize;
    if ikey_len < TAG_SIZE || LEN_SIZE + ikey_len > entry.len() {
        return Err(Error::Decode(format!(
            "bad internal key length {ikey_len} in a {} byte entry",
            entry.len()
        )));
    }
    Ok((LEN_SIZE, LEN_SIZE + ikey_len))
}

/// Internal key part of an entry built by [`make_memtable_key`].
pub fn get_mem_internal_key(entry: &[u8]) -> &[u8] {
    let ikey_len = (&entry[..LEN_SIZE]).get_u32_le() as usize;
    &entry[LEN_SIZE..LEN_SIZE + ikey_len]
}

/// Value part of an entry built by [`make_memtable_key`].
pub fn get_mem_value(entry: &[u8]) -> &[u8] {
    let ikey_len = (&entry[..LEN_SIZE]).get_u32_le() as usize;
    &entry[LEN_SIZE + ikey_len..]
}

/// One decoded memtable entry. The byte fields share the entry's buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemTableEntry {
    pub user_key: Bytes,
    pub seq: Seq,
    pub value_type: ValueType,
    pub value: Bytes,
}

impl MemTableEntry {
    pub fn decode(entry: &Bytes) -> Result<Self> {
        let (start, end) = mem_internal_key_range(entry)?;
        let (seq, value_type) = unpack_tag(get_key_tag(&entry[start..end]))?;
        Ok(Self {
            user_key: entry.slice(start..end - TAG_SIZE),
            seq,
            value_type,
            value: entry.slice(end..),
        })
    }

    pub fn is_deletion(&self) -> bool {
        self.value_type == ValueType::Deletion
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use crate::{error::Error, format::*};

    #[test]
    fn internal_key_parts() {
        let ikey = make_internal_key(b"apple", 42, ValueType::Deletion);
        assert_eq!(get_user_key(&ikey), b"apple");
        assert_eq!(get_key_seq(&ikey), 42);
        assert_eq!(
            unpack_tag(get_key_tag(&ikey)).unwrap(),
            (42, ValueType::Deletion)
        );
    }

    #[test]
    fn memtable_key_parts() {
        let entry = make_memtable_key(MAX_SEQ, ValueType::Value, b"k", b"some value").unwrap();
        assert_eq!(get_mem_value(&entry), b"some value");
        assert_eq!(get_user_key(get_mem_internal_key(&entry)), b"k");

        let decoded = MemTableEntry::decode(&entry).unwrap();
        assert_eq!(decoded.user_key, Bytes::from_static(b"k"));
        assert_eq!(decoded.seq, MAX_SEQ);
        assert_eq!(decoded.value_type, ValueType::Value);
        assert_eq!(decoded.value, Bytes::from_static(b"some value"));
        assert!(!decoded.is_deletion());
    }

    #[test]
    fn lookup_key_has_no_value() {
        let lookup = make_lookup_key(9, b"user").unwrap();
        assert!(get_mem_value(&lookup).is_empty());
        assert_eq!(
            make_seek_key(get_mem_internal_key(&lookup)).unwrap(),
            lookup
        );
    }

    #[test]
    fn decode_rejects_malformed() {
        let cases = [
            Bytes::from_static(b"\x01"),
            Bytes::from_static(b"\x04\x00\x00\x00abcd"),
            Bytes::from_static(b"\xff\x00\x00\x00abcdefgh"),
        ];
        for case in cases.iter() {
            assert!(matches!(MemTableEntry::decode(case), Err(Error::Decode(_))));
        }

        let mut bad_type = make_memtable_key(1, ValueType::Value, b"k", b"").unwrap().to_vec();
        bad_type[5] = 9;
        assert!(matches!(
            MemTableEntry::decode(&Bytes::from(bad_type)),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn key_length_prefix_is_checked() {
        assert!(matches!(
            encode_ikey_len(u32::MAX as usize + 1),
            Err(Error::KeyTooLarge(len)) if len == u32::MAX as usize + 1
        ));
        assert_eq!(encode_ikey_len(u32::MAX as usize).unwrap(), u32::MAX);

        assert!(matches!(make_seek_key(b"short"), Err(Error::Decode(_))));
        assert!(make_seek_key(&make_internal_key(b"", 0, ValueType::Deletion)).is_ok());
    }
}
