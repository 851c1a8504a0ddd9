//! Cryptographic primitives for transaction authorization.
//!
//! - [`key_pair`]: recoverable ECDSA key pairs on secp256k1 and the 65-byte
//!   wire signature, plus address derivation from public keys

pub mod key_pair;
