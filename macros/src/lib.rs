#![warn(missing_docs)]

//! This crate contains the derive macro which lets field-less enums be used as typed command
//! arguments in `quartz_dispatch`.

extern crate proc_macro;

use proc_macro2::Literal;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Error, Fields};

/// Implements `FromArgument` for a field-less enum. Each variant is matched by its name in
/// kebab-case, so `GameMode::SurvivalMode` is written `survival-mode`. The variant keywords are
/// also the type's suggestions.
#[proc_macro_derive(FromArgument)]
pub fn derive_from_argument(item: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    let data_enum = match input.data {
        Data::Enum(data_enum) => data_enum,
        _ =>
            return Error::new_spanned(
                input,
                "FromArgument can only be derived on enums whose variants are field-less.",
            )
            .to_compile_error()
            .into(),
    };

    let mut arg_literals = Vec::new();
    let mut match_arms = Vec::new();
    for variant in &data_enum.variants {
        if !matches!(&variant.fields, Fields::Unit) {
            return Error::new_spanned(variant, "Variants cannot have fields.")
                .to_compile_error()
                .into();
        }

        let arg_repr = Literal::string(&pascal_to_kebab(&variant.ident.to_string()));
        let variant_name = &variant.ident;

        match_arms.push(quote! {
            #arg_repr => ::core::result::Result::Ok(Self::#variant_name)
        });
        arg_literals.push(arg_repr);
    }

    let ident = &input.ident;
    let ident_str = Literal::string(&ident.to_string());

    // Since all the variants are field-less, we don't need to worry about copying over generics.
    (quote! {
        impl<'a> ::quartz_dispatch::FromArgument<'a> for #ident {
            fn matches(arg: &str) -> bool {
                [#( #arg_literals ),*].iter().any(|&lit| arg == lit)
            }

            fn partial_matches(partial_arg: &str) -> bool {
                [#( #arg_literals ),*].iter().any(|lit| lit.starts_with(partial_arg))
            }

            fn from_arg(
                arg: &'a str,
                _context: &::quartz_dispatch::Context<'_>,
            ) -> ::core::result::Result<Self, ::quartz_dispatch::Error> {
                match arg {
                    #( #match_arms, )*
                    _ => ::core::result::Result::Err(format!(
                        "\"{}\" does not match any variant in enum {}",
                        arg, #ident_str
                    ))
                }
            }

            fn suggestions() -> ::std::vec::Vec<::std::string::String> {
                ::std::vec![#( ::std::string::String::from(#arg_literals) ),*]
            }
        }
    })
    .into()
}

fn pascal_to_kebab(pascal: &str) -> String {
    let mut result = String::with_capacity(pascal.len());
    for ch in pascal.chars() {
        if ch.is_uppercase() && !result.is_empty() {
            result.push('-');
        }

        result.extend(ch.to_lowercase());
    }

    result
}
