//! 32-byte SHA3-256 hash type with incremental hashing support.

use crate::types::encoding::EncodeSink;
use chaincore_derive::BinaryCodec;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// SHA3-256 digest length in bytes.
pub const HASH_LEN: usize = 32;

/// Fixed-size 32-byte hash used as a transaction and block identifier.
///
/// `Copy` on purpose: ids are passed around constantly during admission and
/// candidate selection, and a 32-byte stack copy beats reference indirection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Ord, PartialOrd, Default, BinaryCodec)]
pub struct Hash(pub [u8; HASH_LEN]);

impl Hash {
    /// All-zero sentinel hash.
    pub const fn zero() -> Hash {
        Hash([0u8; HASH_LEN])
    }

    pub const fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn to_vec(self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Builds a hash from a slice, requiring exactly [`HASH_LEN`] bytes.
    pub fn from_slice(slice: &[u8]) -> Option<Hash> {
        let bytes: [u8; HASH_LEN] = slice.try_into().ok()?;
        Some(Hash(bytes))
    }

    /// One-shot SHA3-256 over a byte slice.
    pub fn sha3_of(data: &[u8]) -> Hash {
        let mut builder = Hash::sha3();
        builder.update(data);
        builder.finalize()
    }

    /// Starts an incremental SHA3-256 computation.
    pub fn sha3() -> HashBuilder {
        HashBuilder::new()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Incremental SHA3-256 builder.
///
/// Implements [`EncodeSink`] so encodable values hash without an
/// intermediate buffer.
pub struct HashBuilder {
    hasher: Sha3_256,
}

impl HashBuilder {
    pub fn new() -> Self {
        Self {
            hasher: Sha3_256::new(),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn chain(mut self, data: &[u8]) -> Self {
        self.hasher.update(data);
        self
    }

    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

impl Default for HashBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeSink for HashBuilder {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::encoding::{Decode, Encode};

    #[test]
    fn sha3_of_matches_incremental() {
        let one_shot = Hash::sha3_of(b"icx_sendTransaction");
        let incremental = Hash::sha3().chain(b"icx_").chain(b"sendTransaction").finalize();
        assert_eq!(one_shot, incremental);
    }

    #[test]
    fn from_slice_checks_length() {
        assert!(Hash::from_slice(&[0u8; 32]).is_some());
        assert!(Hash::from_slice(&[0u8; 31]).is_none());
        assert!(Hash::from_slice(&[0u8; 33]).is_none());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let hash = Hash::from_slice(&[0xAB; 32]).unwrap();
        assert_eq!(hash.to_string(), "ab".repeat(32));
    }

    #[test]
    fn codec_roundtrip() {
        let hash = Hash::sha3_of(b"roundtrip");
        let bytes = hash.to_bytes();
        assert_eq!(bytes.len(), HASH_LEN);
        assert_eq!(Hash::from_bytes(&bytes).unwrap(), hash);
    }

    #[test]
    fn builder_sink_matches_manual_update() {
        let mut builder = Hash::sha3();
        42u64.encode(&mut builder);
        let via_sink = builder.finalize();

        let via_update = Hash::sha3_of(&42u64.to_le_bytes());
        assert_eq!(via_sink, via_update);
    }
}
