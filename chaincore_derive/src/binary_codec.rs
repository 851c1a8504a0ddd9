//! Derive macro for the crate's binary codec.
//!
//! Generates `Encode` and `Decode` implementations that serialize fields in
//! declaration order. The resulting format is deterministic, which makes it
//! suitable both for wire exchange and for feeding hashers directly.
//!
//! Supported shapes:
//!
//! - named structs: `struct Tx { version: u16, timestamp: i64 }`
//! - tuple structs: `struct Hash([u8; 32])`
//! - unit structs
//! - enums with unit or tuple variants (one `u8` discriminant per variant)
//!
//! Struct-variant enums and unions are rejected with a compile error.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields};

pub fn derive_binary_codec(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Struct(data) => struct_impl(&data.fields),
        Data::Enum(data) => enum_impl(data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            &input,
            "BinaryCodec cannot be derived for unions",
        )),
    };

    let (encode_body, decode_body) = match body {
        Ok(pair) => pair,
        Err(err) => return err.to_compile_error().into(),
    };

    let expanded = quote! {
        impl #impl_generics crate::types::encoding::Encode for #name #ty_generics #where_clause {
            fn encode<S: crate::types::encoding::EncodeSink>(&self, out: &mut S) {
                #encode_body
            }
        }

        impl #impl_generics crate::types::encoding::Decode for #name #ty_generics #where_clause {
            fn decode(
                input: &mut &[u8],
            ) -> ::std::result::Result<Self, crate::types::encoding::DecodeError> {
                #decode_body
            }
        }
    };
    TokenStream::from(expanded)
}

/// Builds the encode/decode bodies for a struct of any field shape.
fn struct_impl(fields: &Fields) -> syn::Result<(TokenStream2, TokenStream2)> {
    match fields {
        Fields::Named(named) => {
            let idents: Vec<_> = named.named.iter().map(|f| &f.ident).collect();
            let encode = quote! {
                #(crate::types::encoding::Encode::encode(&self.#idents, out);)*
            };
            let decode = quote! {
                Ok(Self {
                    #(#idents: crate::types::encoding::Decode::decode(input)?,)*
                })
            };
            Ok((encode, decode))
        }
        Fields::Unnamed(unnamed) => {
            let indices: Vec<_> = (0..unnamed.unnamed.len()).map(syn::Index::from).collect();
            let decodes = indices
                .iter()
                .map(|_| quote! { crate::types::encoding::Decode::decode(input)?, });
            let encode = quote! {
                #(crate::types::encoding::Encode::encode(&self.#indices, out);)*
            };
            let decode = quote! { Ok(Self(#(#decodes)*)) };
            Ok((encode, decode))
        }
        Fields::Unit => Ok((quote! { let _ = out; }, quote! { let _ = input; Ok(Self) })),
    }
}

/// Builds the encode/decode bodies for an enum with unit/tuple variants.
///
/// Discriminants follow Rust's rules: explicit `Variant = n` values are kept,
/// everything else increments from the previous variant.
fn enum_impl(data: &syn::DataEnum) -> syn::Result<(TokenStream2, TokenStream2)> {
    let mut next: u8 = 0;
    let mut encode_arms = Vec::new();
    let mut decode_arms = Vec::new();

    for variant in &data.variants {
        let tag = match &variant.discriminant {
            Some((_, expr)) => parse_discriminant(expr)?,
            None => next,
        };
        next = tag.wrapping_add(1);

        let ident = &variant.ident;
        match &variant.fields {
            Fields::Unit => {
                encode_arms.push(quote! {
                    Self::#ident => crate::types::encoding::Encode::encode(&#tag, out),
                });
                decode_arms.push(quote! { #tag => Ok(Self::#ident), });
            }
            Fields::Unnamed(fields) => {
                let bindings: Vec<_> = (0..fields.unnamed.len())
                    .map(|i| quote::format_ident!("v{}", i))
                    .collect();
                let decodes = bindings
                    .iter()
                    .map(|_| quote! { crate::types::encoding::Decode::decode(input)?, });
                encode_arms.push(quote! {
                    Self::#ident(#(#bindings),*) => {
                        crate::types::encoding::Encode::encode(&#tag, out);
                        #(crate::types::encoding::Encode::encode(#bindings, out);)*
                    }
                });
                decode_arms.push(quote! { #tag => Ok(Self::#ident(#(#decodes)*)), });
            }
            Fields::Named(_) => {
                return Err(syn::Error::new_spanned(
                    variant,
                    "BinaryCodec does not support struct-variant enums",
                ));
            }
        }
    }

    let encode = quote! {
        match self {
            #(#encode_arms)*
        }
    };
    let decode = quote! {
        let tag: u8 = crate::types::encoding::Decode::decode(input)?;
        match tag {
            #(#decode_arms)*
            _ => Err(crate::types::encoding::DecodeError::InvalidValue),
        }
    };
    Ok((encode, decode))
}

fn parse_discriminant(expr: &syn::Expr) -> syn::Result<u8> {
    if let syn::Expr::Lit(lit) = expr {
        if let syn::Lit::Int(int) = &lit.lit {
            return int.base10_parse::<u8>();
        }
    }
    Err(syn::Error::new_spanned(
        expr,
        "enum discriminant must be a u8 integer literal",
    ))
}
