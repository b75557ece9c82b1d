//! Derive macros for the sparkfield particle engine.
//!
//! This crate provides two derive macros:
//!
//! - [`ConfigFields`] - Generates the key list, structural key list, a
//!   field-wise diff and a per-key copy for configuration structs
//! - [`GpuEnum`] - Gives unit enums stable `u32` ids for use in uniforms
//!
//! # Usage
//!
//! These macros are re-exported from the main `sparkfield` crate. You don't
//! need to add this crate directly:
//!
//! ```ignore
//! use sparkfield::{ConfigFields, GpuEnum};
//!
//! #[derive(ConfigFields, Clone, PartialEq)]
//! struct Options {
//!     #[config(structural)]
//!     max_particles: u32,
//!     gravity: [f32; 3],
//! }
//!
//! #[derive(GpuEnum, Clone, Copy, PartialEq)]
//! enum Falloff {
//!     Constant,
//!     InverseSquare,
//! }
//! ```
//!
//! # Key Names
//!
//! Keys are the camelCase form of the Rust field name, matching
//! `#[serde(rename_all = "camelCase")]`. Use `#[config(rename = "...")]` to
//! override a key and `#[config(skip)]` to leave a field out of the diff.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derive macro for enums whose values are passed to shaders.
///
/// Variants are assigned sequential IDs starting from 0, in declaration order.
/// WGSL code that switches on these ids must use the same order.
///
/// # Generated Items
///
/// For an enum `Easing`:
///
/// - `impl From<Easing> for u32` - Convert variant to integer
/// - `impl From<u32> for Easing` - Convert integer to variant (invalid values default to first variant)
/// - `Easing::count() -> u32` - Returns number of variants
///
/// # Requirements
///
/// - Must be an enum (not a struct)
/// - All variants must be unit variants (no fields)
#[proc_macro_derive(GpuEnum)]
pub fn derive_gpu_enum(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return syn::Error::new_spanned(name, "GpuEnum derive only supports enums")
                .to_compile_error()
                .into()
        }
    };

    for variant in variants.iter() {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(
                variant,
                format!(
                    "GpuEnum variants must be unit variants (no fields). Found fields on variant '{}'",
                    variant.ident
                ),
            )
            .to_compile_error()
            .into();
        }
    }

    let Some(first_variant) = variants.first().map(|v| &v.ident) else {
        return syn::Error::new_spanned(name, "GpuEnum needs at least one variant")
            .to_compile_error()
            .into();
    };

    let into_arms = variants.iter().enumerate().map(|(i, variant)| {
        let variant_name = &variant.ident;
        let idx = i as u32;
        quote! { #name::#variant_name => #idx }
    });

    let from_arms = variants.iter().enumerate().map(|(i, variant)| {
        let variant_name = &variant.ident;
        let idx = i as u32;
        quote! { #idx => #name::#variant_name }
    });

    let variant_count = variants.len() as u32;

    let expanded = quote! {
        impl From<#name> for u32 {
            fn from(value: #name) -> u32 {
                match value {
                    #(#into_arms),*
                }
            }
        }

        impl From<u32> for #name {
            fn from(value: u32) -> #name {
                match value {
                    #(#from_arms,)*
                    _ => #name::#first_variant,
                }
            }
        }

        impl #name {
            /// Number of variants, i.e. the number of distinct GPU ids.
            pub const fn count() -> u32 {
                #variant_count
            }
        }
    };

    TokenStream::from(expanded)
}

/// Derive macro for configuration structs.
///
/// Implements `sparkfield::ConfigFields`, which the feature composer uses to
/// find out which keys changed between two configurations and whether any of
/// them forces a rebuild of GPU resources.
///
/// # Field Attributes
///
/// - `#[config(structural)]` - changing this field requires recreating GPU resources
/// - `#[config(rename = "key")]` - override the camelCase key
/// - `#[config(skip)]` - exclude the field from keys and diffs
///
/// # Requirements
///
/// - Must be a struct with named fields
/// - Every non-skipped field must implement `PartialEq` and `Clone`
#[proc_macro_derive(ConfigFields, attributes(config))]
pub fn derive_config_fields(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(name, "ConfigFields requires named fields")
                    .to_compile_error()
                    .into()
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "ConfigFields derive only supports structs")
                .to_compile_error()
                .into()
        }
    };

    let mut keys = Vec::new();
    let mut structural_keys = Vec::new();
    let mut comparisons = Vec::new();
    let mut copies = Vec::new();

    for field in fields.iter() {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        let mut structural = false;
        let mut skip = false;
        let mut rename: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("config") {
                continue;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("structural") {
                    structural = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    skip = true;
                    Ok(())
                } else if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    rename = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported config attribute; expected `structural`, `skip` or `rename`"))
                }
            });
            if let Err(err) = parsed {
                return err.to_compile_error().into();
            }
        }

        if skip {
            continue;
        }

        let key = rename.unwrap_or_else(|| camel_case(&ident.to_string()));
        if structural {
            structural_keys.push(key.clone());
        }
        comparisons.push(quote! {
            if self.#ident != other.#ident {
                changed.push(#key);
            }
        });
        copies.push(quote! {
            #key => {
                self.#ident = ::std::clone::Clone::clone(&source.#ident);
                true
            }
        });
        keys.push(key);
    }

    let expanded = quote! {
        impl sparkfield::ConfigFields for #name {
            const KEYS: &'static [&'static str] = &[#(#keys),*];
            const STRUCTURAL_KEYS: &'static [&'static str] = &[#(#structural_keys),*];

            fn changed_keys(&self, other: &Self) -> ::std::vec::Vec<&'static str> {
                let mut changed = ::std::vec::Vec::new();
                #(#comparisons)*
                changed
            }

            fn copy_key(&mut self, source: &Self, key: &str) -> bool {
                match key {
                    #(#copies)*
                    _ => false,
                }
            }
        }
    };

    TokenStream::from(expanded)
}

/// `max_particles` -> `maxParticles`.
fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
