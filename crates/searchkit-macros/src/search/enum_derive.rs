//! Implementation of the `#[derive(SearchableEnum)]` macro.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::parse_search_attrs;
use super::derive::to_screaming_snake_case;

/// Generates `SearchEnum` and `SearchScalar` for a unit-only enum.
///
/// Member names are the variant names in SCREAMING_SNAKE_CASE unless a
/// variant carries `#[search(rename = "...")]`.
pub fn searchable_enum_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let enum_name = &input.ident;
    let type_name = enum_name.to_string();

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "SearchableEnum cannot be derived for generic enums",
        ));
    }

    let variants = match &input.data {
        Data::Enum(data) => &data.variants,
        _ => {
            return Err(Error::new(
                input.span(),
                "SearchableEnum can only be derived for enums",
            ))
        }
    };
    if variants.is_empty() {
        return Err(Error::new(
            input.span(),
            "SearchableEnum requires at least one variant",
        ));
    }

    let mut members: Vec<String> = Vec::with_capacity(variants.len());
    let mut ordinal_arms: Vec<TokenStream> = Vec::with_capacity(variants.len());

    for (ordinal, variant) in variants.iter().enumerate() {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(Error::new(
                variant.span(),
                "SearchableEnum variants must not carry data",
            ));
        }

        let attrs = parse_search_attrs(&variant.attrs)?;
        if attrs.operators.is_some() || attrs.skip {
            return Err(Error::new(
                attrs.span,
                "enum variants only accept #[search(rename = \"...\")]",
            ));
        }
        let member = attrs
            .rename
            .unwrap_or_else(|| to_screaming_snake_case(&variant.ident.to_string()));
        if members.contains(&member) {
            return Err(Error::new(
                variant.span(),
                format!("duplicate enum member name '{member}'"),
            ));
        }
        members.push(member);

        let variant_name = &variant.ident;
        let ordinal = ordinal as u32;
        ordinal_arms.push(quote! {
            #enum_name::#variant_name => #ordinal,
        });
    }

    let expanded = quote! {
        impl ::searchkit::SearchEnum for #enum_name {
            const ENUM_TYPE: ::searchkit::EnumType =
                ::searchkit::EnumType::new(#type_name, &[#(#members),*]);

            fn ordinal(&self) -> u32 {
                match self {
                    #(#ordinal_arms)*
                }
            }
        }

        impl ::searchkit::SearchScalar for #enum_name {
            const FIELD_TYPE: ::searchkit::FieldType =
                ::searchkit::FieldType::Enum(<Self as ::searchkit::SearchEnum>::ENUM_TYPE);

            fn search_value(&self) -> ::std::option::Option<::searchkit::Value> {
                ::std::option::Option::Some(::searchkit::SearchEnum::enum_value(self))
            }
        }
    };

    Ok(expanded)
}
