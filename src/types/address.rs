//! 20-byte account addresses with the canonical `hx` text form.

use chaincore_derive::BinaryCodec;
use std::fmt;

/// Address length in bytes.
pub const ADDRESS_SIZE: usize = 20;

/// Fixed-size 20-byte account address.
///
/// Derived from a public key as the last 20 bytes of its SHA3-256 hash.
/// The canonical text form is `hx` followed by 40 lowercase hex digits; that
/// exact string feeds the transaction hash, so `Display` here is
/// consensus-critical.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, BinaryCodec)]
pub struct Address(pub [u8; ADDRESS_SIZE]);

impl Address {
    /// All-zero address reserved for the system contract.
    pub const SYSTEM: Address = Address([0u8; ADDRESS_SIZE]);

    pub const fn zero() -> Address {
        Address([0u8; ADDRESS_SIZE])
    }

    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Builds an address from a slice, requiring exactly [`ADDRESS_SIZE`] bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Address> {
        let bytes: [u8; ADDRESS_SIZE] = slice.try_into().ok()?;
        Some(Address(bytes))
    }

    /// Parses the canonical `hx`-prefixed hex form.
    pub fn from_hex(s: &str) -> Option<Address> {
        let digits = s.strip_prefix("hx")?;
        if digits.len() != ADDRESS_SIZE * 2 || !digits.is_ascii() {
            return None;
        }
        let mut bytes = [0u8; ADDRESS_SIZE];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).ok()?;
        }
        Some(Address(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hx")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
