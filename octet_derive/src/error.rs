//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use octet_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum VMError {
//!     #[error("unknown register or flag: {0}")]
//!     UnknownSymbol(String),
//!
//!     #[error("invalid opcode {opcode} at offset {offset}")]
//!     InvalidInstruction { opcode: u8, offset: usize },
//!
//!     #[error("division by zero")]
//!     DivisionByZero,
//! }
//! ```
//!
//! Placeholders name tuple fields by position (`{0}`, `{1:?}`) and struct
//! fields by name (`{label}`, `{offset:>4}`). Fields the message does not
//! mention are not passed to `write!`.

use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use syn::{Data, DeriveInput, Fields, Ident, Lit, Meta, parse_macro_input};

/// Derives `Display` and `Error` for an enum or struct.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let body = match &input.data {
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| {
                    let variant_name = &variant.ident;
                    let message = message_from_attrs(
                        &variant.attrs,
                        &variant.ident,
                        &format!("variant `{variant_name}`"),
                    )?;
                    let (pattern, write) = render_fields(&variant.fields, &message, false);
                    Ok(quote! { Self::#variant_name #pattern => #write, })
                })
                .collect::<syn::Result<Vec<_>>>()?;

            if arms.is_empty() {
                quote! { match *self {} }
            } else {
                quote! { match self { #(#arms)* } }
            }
        }
        Data::Struct(data_struct) => {
            let message =
                message_from_attrs(&input.attrs, &input.ident, &format!("type `{name}`"))?;
            let (pattern, write) = render_fields(&data_struct.fields, &message, true);
            quote! {
                let Self #pattern = self;
                #write
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds the destructuring pattern and the `write!` call for one set of fields.
///
/// Only the fields referenced by the message are bound; the rest are skipped
/// with `..` so `write!` never receives an unused named argument.
fn render_fields(
    fields: &Fields,
    message: &str,
    is_struct: bool,
) -> (proc_macro2::TokenStream, proc_macro2::TokenStream) {
    let referenced = placeholder_names(message);

    match fields {
        Fields::Unit if is_struct => (quote! { {} }, quote! { write!(f, #message) }),
        Fields::Unit => (quote! {}, quote! { write!(f, #message) }),
        Fields::Unnamed(unnamed) => {
            let bindings: Vec<proc_macro2::TokenStream> = (0..unnamed.unnamed.len())
                .map(|i| {
                    if referenced.iter().any(|r| r == &i.to_string()) {
                        let ident = format_ident!("f{}", i);
                        quote! { #ident }
                    } else {
                        quote! { _ }
                    }
                })
                .collect();
            let used: Vec<Ident> = (0..unnamed.unnamed.len())
                .filter(|i| referenced.iter().any(|r| r == &i.to_string()))
                .map(|i| format_ident!("f{}", i))
                .collect();
            let format_str = positional_to_named(message, unnamed.unnamed.len());
            (
                quote! { ( #(#bindings),* ) },
                quote! { write!(f, #format_str, #(#used = #used),*) },
            )
        }
        Fields::Named(named) => {
            let used: Vec<Ident> = named
                .named
                .iter()
                .filter_map(|field| field.ident.clone())
                .filter(|ident| referenced.iter().any(|r| ident == r))
                .collect();
            (
                quote! { { #(#used,)* .. } },
                quote! { write!(f, #message, #(#used = #used),*) },
            )
        }
    }
}

/// Extracts the message from an `#[error("...")]` attribute.
fn message_from_attrs<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    for attr in attrs {
        if !attr.path().is_ident("error") {
            continue;
        }

        let Meta::List(meta_list) = &attr.meta else {
            return Err(syn::Error::new_spanned(
                &attr.meta,
                "invalid #[error] attribute; use #[error(\"message\")] to describe the error",
            ));
        };

        return match syn::parse2::<Lit>(meta_list.tokens.clone()) {
            Ok(Lit::Str(lit_str)) => Ok(lit_str.value()),
            _ => Err(syn::Error::new_spanned(
                &attr.meta,
                "#[error] expects a string literal, e.g. #[error(\"invalid opcode: {0}\")]",
            )),
        };
    }

    Err(syn::Error::new_spanned(
        target,
        format!("missing #[error(\"...\")] attribute on {target_desc}"),
    ))
}

/// Returns the argument names referenced by `{...}` placeholders.
///
/// `{{` and `}}` are escapes. The name ends at `:` (format spec) or `}`.
fn placeholder_names(message: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = message.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
            }
            '{' => {
                let mut name = String::new();
                for inner in chars.by_ref() {
                    if inner == '}' || inner == ':' {
                        break;
                    }
                    name.push(inner);
                }
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            _ => {}
        }
    }

    names
}

/// Rewrites positional placeholders `{0}`/`{0:spec}` to `{f0}`/`{f0:spec}`.
fn positional_to_named(message: &str, field_count: usize) -> String {
    let mut result = message.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}
