//! Derive macro for error enums.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations from
//! `#[error("...")]` attributes, keeping the crate free of a `thiserror`
//! dependency.
//!
//! ```ignore
//! #[derive(Debug, Error)]
//! pub enum PoolError {
//!     #[error("transaction already exists in the pool")]
//!     DuplicateTransaction,
//!     #[error("pool is full: size={size} used={used}")]
//!     PoolOverflow { size: usize, used: usize },
//! }
//! ```
//!
//! Tuple variants interpolate with positional arguments (`{0}`, `{1}`),
//! struct variants with field names. Only enums are supported; every variant
//! must carry an `#[error("...")]` attribute.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Lit, Meta};

pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let Data::Enum(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            input,
            "Error can only be derived for enums",
        ));
    };

    let arms = data
        .variants
        .iter()
        .map(|variant| {
            let ident = &variant.ident;
            let message = error_message(variant)?;

            Ok(match &variant.fields {
                Fields::Unit => quote! {
                    Self::#ident => write!(f, #message),
                },
                Fields::Unnamed(fields) => {
                    let bindings: Vec<_> = (0..fields.unnamed.len())
                        .map(|i| quote::format_ident!("v{}", i))
                        .collect();
                    let format = positional_to_named(&message, fields.unnamed.len());
                    quote! {
                        Self::#ident(#(#bindings),*) =>
                            write!(f, #format, #(#bindings = #bindings),*),
                    }
                }
                Fields::Named(fields) => {
                    let names: Vec<_> = fields.named.iter().map(|f| &f.ident).collect();
                    quote! {
                        Self::#ident { #(#names),* } =>
                            write!(f, #message, #(#names = #names),*),
                    }
                }
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                match self {
                    #(#arms)*
                }
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Pulls the message string out of a variant's `#[error("...")]` attribute.
fn error_message(variant: &syn::Variant) -> syn::Result<String> {
    for attr in &variant.attrs {
        if !attr.path().is_ident("error") {
            continue;
        }
        if let Meta::List(list) = &attr.meta {
            if let Ok(Lit::Str(lit)) = syn::parse2::<Lit>(list.tokens.clone()) {
                return Ok(lit.value());
            }
        }
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "expected #[error(\"message\")] with a string literal",
        ));
    }
    Err(syn::Error::new_spanned(
        variant,
        format!(
            "variant `{}` is missing its #[error(\"...\")] attribute",
            variant.ident
        ),
    ))
}

/// Rewrites `{0}`, `{1}`, ... into the named bindings used by the match arms.
fn positional_to_named(format: &str, count: usize) -> String {
    let mut out = format.to_string();
    for i in (0..count).rev() {
        out = out.replace(&format!("{{{i}}}"), &format!("{{v{i}}}"));
    }
    out
}
