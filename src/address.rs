//! Ledger addresses.
//!
//! An address is a 32-byte ed25519 public key. Its text form is the unpadded base32 encoding of
//! the key followed by a 4-byte checksum, the tail of SHA-512/256 of the key.

use core::fmt;
use core::str::FromStr;
use data_encoding::BASE32_NOPAD;

/// Length of the checksum appended to the key in the text form.
const CHECKSUM_LEN: usize = 4;

/// Length of the text form.
pub const ENCODED_LEN: usize = 58;

/// Domain separator for application addresses.
const APP_ID_PREFIX: &[u8] = b"appID";

/// Computes SHA-512/256 of concatenated `parts`.
pub(crate) fn sha512_256(parts: &[&[u8]]) -> [u8; 32] {
    use bitcoin::hashes::{sha512_256, Hash, HashEngine};

    let mut engine = sha512_256::Hash::engine();
    for part in parts {
        engine.input(part);
    }
    sha512_256::Hash::from_engine(engine).to_byte_array()
}

/// Account or application address.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Address([u8; 32]);

impl Address {
    /// The all-zero address.
    pub const ZERO: Address = Address([0; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the escrow address controlled by the application `app_id`.
    ///
    /// This is `SHA-512/256("appID" || app_id as big-endian u64)` and must stay bit-exact because
    /// the ledger derives the same address on its side.
    pub fn for_application(app_id: u64) -> Self {
        Address(sha512_256(&[APP_ID_PREFIX, &app_id.to_be_bytes()]))
    }

    fn checksum(&self) -> [u8; CHECKSUM_LEN] {
        let hash = sha512_256(&[&self.0]);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&hash[32 - CHECKSUM_LEN..]);
        checksum
    }

    pub(crate) fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.0);
    }

    pub(crate) fn deserialize(bytes: &mut &[u8]) -> Result<Self, crate::encoding::UnexpectedEnd> {
        crate::encoding::array32(bytes).map(Address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut buf = [0u8; 32 + CHECKSUM_LEN];
        buf[..32].copy_from_slice(&self.0);
        buf[32..].copy_from_slice(&self.checksum());
        f.write_str(&BASE32_NOPAD.encode(&buf))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENCODED_LEN {
            return Err(AddressError::InvalidLength(s.len()));
        }
        let decoded = BASE32_NOPAD.decode(s.as_bytes()).map_err(|_| AddressError::InvalidEncoding)?;
        // 58 base32 characters always decode to 36 bytes
        if decoded.len() != 32 + CHECKSUM_LEN {
            return Err(AddressError::InvalidEncoding);
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&decoded[..32]);
        let address = Address(key);
        if address.checksum()[..] != decoded[32..] {
            return Err(AddressError::ChecksumMismatch);
        }
        Ok(address)
    }
}

impl core::convert::TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Conversion into an address that may fail.
///
/// Builder entry points accept anything implementing this so that both parsed addresses and
/// user-supplied strings go through the same validation.
pub trait IntoAddress {
    fn into_address(self) -> Result<Address, AddressError>;
}

impl IntoAddress for Address {
    fn into_address(self) -> Result<Address, AddressError> {
        Ok(self)
    }
}

impl IntoAddress for &Address {
    fn into_address(self) -> Result<Address, AddressError> {
        Ok(*self)
    }
}

impl IntoAddress for &str {
    fn into_address(self) -> Result<Address, AddressError> {
        self.parse()
    }
}

impl IntoAddress for &String {
    fn into_address(self) -> Result<Address, AddressError> {
        self.parse()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum AddressError {
    InvalidLength(usize),
    InvalidEncoding,
    ChecksumMismatch,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressError::InvalidLength(len) => write!(f, "address has {} characters, expected {}", len, ENCODED_LEN),
            AddressError::InvalidEncoding => f.write_str("address is not valid base32"),
            AddressError::ChecksumMismatch => f.write_str("address checksum doesn't match"),
        }
    }
}

impl std::error::Error for AddressError {}

#[cfg(test)]
impl quickcheck::Arbitrary for Address {
    fn arbitrary(gen: &mut quickcheck::Gen) -> Self {
        let mut key = [0u8; 32];
        for byte in &mut key {
            *byte = u8::arbitrary(gen);
        }
        Address(key)
    }
}
