//! Derive macros for the chaincore crate.
//!
//! Provides:
//! - `#[derive(BinaryCodec)]` - deterministic binary serialization
//! - `#[derive(Error)]` - error enum boilerplate (in-tree thiserror replacement)

mod binary_codec;
mod error;

use proc_macro::TokenStream;

/// Implements the crate's `Encode` and `Decode` traits for a type.
#[proc_macro_derive(BinaryCodec)]
pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    binary_codec::derive_binary_codec(input)
}

/// Implements `Display` and `Error` for an error enum from `#[error("...")]`
/// attributes.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
