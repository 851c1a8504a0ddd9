//! Core transactional data structures.
//!
//! - `Transaction`: version-3 transaction with canonical hash and wire codec
//! - `tx_serializer`: canonical serialization of JSON data payloads
//! - `Block`: minimal block model for catch-up and finalization
//! - `Receipt`: execution outcome of a finalized transaction

pub mod block;
pub mod receipt;
pub mod transaction;
pub mod tx_serializer;
