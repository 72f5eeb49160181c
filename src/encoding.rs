//! Canonical byte encoding helpers.
//!
//! Integers are big-endian, byte strings are prefixed with their length as `u16`, lists with
//! their length as `u8`. Readers take `&mut &[u8]` and advance the cursor past whatever they
//! consumed.

use core::convert::{TryFrom, TryInto};
use core::fmt;

pub(crate) trait Int {
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_int {
    ($($type:ty),*) => {
        $(
            impl Int for $type {
                type Bytes = [u8; core::mem::size_of::<$type>()];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$type>::from_be_bytes(bytes)
                }
            }
        )*
    }
}

impl_int!(u8, u16, u32, u64);

pub(crate) fn be<T: Int>(bytes: &mut &[u8]) -> Result<T, UnexpectedEnd> {
    let size = core::mem::size_of::<T::Bytes>();
    if bytes.len() < size {
        return Err(UnexpectedEnd);
    }
    let byte_arr: T::Bytes = bytes[..size].try_into().map_err(|_| UnexpectedEnd)?;
    *bytes = &bytes[size..];
    Ok(T::from_be_bytes(byte_arr))
}

pub(crate) fn array32(bytes: &mut &[u8]) -> Result<[u8; 32], UnexpectedEnd> {
    match bytes.get(..32) {
        Some(array) => {
            let array = array.try_into().expect("statically valid");
            *bytes = &bytes[32..];
            Ok(array)
        },
        None => Err(UnexpectedEnd),
    }
}

pub(crate) fn array64(bytes: &mut &[u8]) -> Result<[u8; 64], UnexpectedEnd> {
    match bytes.get(..64) {
        Some(array) => {
            let array = array.try_into().expect("statically valid");
            *bytes = &bytes[64..];
            Ok(array)
        },
        None => Err(UnexpectedEnd),
    }
}

/// Reads a `u16`-length-prefixed byte string.
pub(crate) fn byte_string(bytes: &mut &[u8]) -> Result<Vec<u8>, UnexpectedEnd> {
    let len = usize::from(be::<u16>(bytes)?);
    let data = bytes.get(..len).ok_or(UnexpectedEnd)?.to_vec();
    *bytes = &bytes[len..];
    Ok(data)
}

pub(crate) fn utf8_string(bytes: &mut &[u8]) -> Result<String, InvalidString> {
    let data = byte_string(bytes)?;
    String::from_utf8(data).map_err(|_| InvalidString::NotUtf8)
}

/// Writes a `u16`-length-prefixed byte string.
///
/// Callers validate lengths before encoding, longer inputs are a bug.
pub(crate) fn put_byte_string(out: &mut Vec<u8>, data: &[u8]) {
    let len = u16::try_from(data.len()).expect("length validated by the builder");
    out.reserve(2 + data.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(data);
}

pub(crate) fn put_optional_array32(out: &mut Vec<u8>, data: Option<&[u8; 32]>) {
    match data {
        Some(data) => {
            out.push(1);
            out.extend_from_slice(data);
        },
        None => out.push(0),
    }
}

pub(crate) fn optional_array32(bytes: &mut &[u8]) -> Result<Option<[u8; 32]>, InvalidFlag> {
    match be::<u8>(bytes)? {
        0 => Ok(None),
        1 => Ok(Some(array32(bytes)?)),
        flag => Err(InvalidFlag::Value(flag)),
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnexpectedEnd;

impl fmt::Display for UnexpectedEnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("unexpected end of input")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InvalidString {
    UnexpectedEnd,
    NotUtf8,
}

impl From<UnexpectedEnd> for InvalidString {
    fn from(_: UnexpectedEnd) -> Self {
        InvalidString::UnexpectedEnd
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum InvalidFlag {
    UnexpectedEnd,
    Value(u8),
}

impl From<UnexpectedEnd> for InvalidFlag {
    fn from(_: UnexpectedEnd) -> Self {
        InvalidFlag::UnexpectedEnd
    }
}

/// Just to avoid duplicating version values (SSOT).
macro_rules! version_enum {
    (pub enum $name:ident { $($variant:ident = $value:expr),* $(,)? }) => {
        #[must_use = "Protect the code against forgetting to handle new variants"]
        #[derive(Copy, Clone, Eq, PartialEq, Debug)]
        pub enum $name {
            $($variant = $value,)*
        }

        impl $name {
            pub const fn from_num(num: u8) -> Option<Self> {
                match num {
                    $(
                        $value => Some(Self::$variant),
                    )*
                    _ => None,
                }
            }
        }
    }
}

version_enum! {
    pub enum EncodingVersion {
        V1 = 0x01,
    }
}

impl EncodingVersion {
    pub const CURRENT: Self = Self::V1;

    pub fn serialize(self, out: &mut Vec<u8>) {
        out.push(self as u8);
    }

    pub fn deserialize(bytes: &mut &[u8]) -> Result<Self, VersionDeserError> {
        let num = be::<u8>(bytes)?;
        Self::from_num(num).ok_or(VersionDeserError::UnsupportedVersion(num))
    }
}

/// Error returned when deserializing version number fails.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum VersionDeserError {
    /// The input data is too short.
    UnexpectedEnd,
    /// The version number is not supported (currently always higher).
    UnsupportedVersion(u8),
}

impl From<UnexpectedEnd> for VersionDeserError {
    fn from(_: UnexpectedEnd) -> Self {
        Self::UnexpectedEnd
    }
}

impl fmt::Display for VersionDeserError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VersionDeserError::UnexpectedEnd => f.write_str("unexpected end of input"),
            VersionDeserError::UnsupportedVersion(version) => write!(f, "unsupported encoding version {}", version),
        }
    }
}
