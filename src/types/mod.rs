//! Core type definitions for the transactional node core.
//!
//! - `Address`: 20-byte account identifier with the canonical `hx` text form
//! - `Hash`: fixed-size 32-byte SHA3-256 hash
//! - `HexInt`: arbitrary-precision integer with the consensus hex text form
//! - `encoding`: deterministic binary serialization traits
//!
//! All types are tuned for validation workloads: `Copy` where small enough,
//! allocation-free encoding via [`encoding::EncodeSink`].

pub mod address;
pub mod encoding;
pub mod hash;
pub mod hexint;
