//! Recoverable ECDSA key pairs on secp256k1.
//!
//! Transactions do not carry the sender's public key; the 65-byte signature
//! (`r || s || v`) lets the verifier recover it from the signed digest and
//! derive the sender address. Address derivation: SHA3-256 over the 64-byte
//! uncompressed public key (point coordinates without the SEC1 tag), last 20
//! bytes.

use crate::types::address::{Address, ADDRESS_SIZE};
use crate::types::encoding::{Decode, DecodeError, Encode, EncodeSink};
use chaincore_derive::Error;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use rand_core::OsRng;
use sha3::{Digest, Sha3_256};
use std::fmt;

/// Length of the wire signature: 64 bytes `r || s` plus one recovery byte.
pub const SIGNATURE_SIZE: usize = 65;

/// Errors from signature recovery and key handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature bytes are malformed or do not recover a valid public key.
    #[error("signature recovery failed")]
    InvalidSignature,
}

/// Private signing key.
///
/// Never serialized; exists only on submitting clients and in tests.
#[derive(Clone)]
pub struct PrivateKey {
    key: SigningKey,
}

impl PrivateKey {
    /// Generates a fresh key from OS entropy.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::random(&mut OsRng),
        }
    }

    /// Builds a key from raw scalar bytes, rejecting invalid scalars.
    pub fn from_bytes(bytes: &[u8; 32]) -> Option<Self> {
        SigningKey::from_bytes(bytes.into()).ok().map(|key| Self { key })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: *self.key.verifying_key(),
        }
    }

    /// Signs a 32-byte digest, producing the recoverable wire signature.
    pub fn sign_recoverable(&self, digest: &[u8]) -> Result<Signature, CryptoError> {
        let (signature, recovery) = self
            .key
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let mut bytes = [0u8; SIGNATURE_SIZE];
        bytes[..64].copy_from_slice(&signature.to_bytes());
        bytes[64] = recovery.to_byte();
        Ok(Signature(bytes))
    }
}

/// Public key recovered from a signature or derived from a private key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// Derives the 20-byte account address for this key.
    pub fn to_address(&self) -> Address {
        let point = self.key.to_encoded_point(false);
        // Skip the SEC1 tag byte; hash the 64-byte coordinate pair.
        let digest: [u8; 32] = Sha3_256::digest(&point.as_bytes()[1..]).into();

        let mut addr = [0u8; ADDRESS_SIZE];
        addr.copy_from_slice(&digest[32 - ADDRESS_SIZE..]);
        Address(addr)
    }
}

/// 65-byte recoverable signature in wire order `r || s || v`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_SIZE]);

impl Signature {
    pub fn from_slice(slice: &[u8]) -> Option<Signature> {
        let bytes: [u8; SIGNATURE_SIZE] = slice.try_into().ok()?;
        Some(Signature(bytes))
    }

    /// Recovers the signing public key from the digest this signature covers.
    pub fn recover(&self, digest: &[u8]) -> Result<PublicKey, CryptoError> {
        let signature = EcdsaSignature::from_slice(&self.0[..64])
            .map_err(|_| CryptoError::InvalidSignature)?;
        let recovery =
            RecoveryId::from_byte(self.0[64]).ok_or(CryptoError::InvalidSignature)?;
        let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery)
            .map_err(|_| CryptoError::InvalidSignature)?;
        Ok(PublicKey { key })
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl Encode for Signature {
    fn encode<S: EncodeSink>(&self, out: &mut S) {
        out.write(&self.0);
    }
}

impl Decode for Signature {
    fn decode(input: &mut &[u8]) -> Result<Self, DecodeError> {
        let bytes = <[u8; SIGNATURE_SIZE]>::decode(input)?;
        Ok(Signature(bytes))
    }
}
