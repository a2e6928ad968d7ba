//! Implementation of the `#[derive(Searchable)]` macro.
//!
//! This macro generates implementations of `Searchable`, `Record`, and
//! `Relation`, plus field id constants.

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{spanned::Spanned, Data, DeriveInput, Error, Fields, Result};

use super::attrs::{parse_search_attrs, SearchKind};

/// Main implementation of the Searchable derive macro.
pub fn searchable_derive_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let record_name = struct_name.to_string();

    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            "Searchable cannot be derived for generic structs",
        ));
    }

    // Ensure we have a struct with named fields
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new(
                    input.span(),
                    "Searchable can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new(
                input.span(),
                "Searchable can only be derived for structs",
            ))
        }
    };

    let mut attributes: Vec<TokenStream> = Vec::new();
    let mut slot_arms: Vec<TokenStream> = Vec::new();
    let mut flattened: Vec<TokenStream> = Vec::new();
    let mut field_constants: Vec<TokenStream> = Vec::new();

    for field in fields.iter() {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new(field.span(), "expected named field"))?;
        let ty = &field.ty;

        let search_attrs = parse_search_attrs(&field.attrs)?;
        if search_attrs.skip || !search_attrs.present {
            continue;
        }

        // Attribute names are camelCase so naming conventions can split them
        let attribute_name = to_camel_case(&field_name.to_string());

        let mut attribute = match search_attrs.kind {
            SearchKind::Scalar => quote! {
                ::searchkit::Attribute::scalar(
                    #attribute_name,
                    <#ty as ::searchkit::SearchScalar>::FIELD_TYPE,
                )
            },
            SearchKind::Elements => quote! {
                ::searchkit::Attribute::elements(
                    #attribute_name,
                    <<#ty as ::searchkit::SearchElements>::Item as ::searchkit::SearchScalar>::FIELD_TYPE,
                )
            },
            SearchKind::One => quote! {
                ::searchkit::Attribute::to_one::<<#ty as ::searchkit::Relation>::Target>(#attribute_name)
            },
            SearchKind::Many => quote! {
                ::searchkit::Attribute::to_many::<<#ty as ::searchkit::Relation>::Target>(#attribute_name)
            },
            SearchKind::Flatten => quote! {
                ::searchkit::Attribute::flatten::<<#ty as ::searchkit::Relation>::Target>(#attribute_name)
            },
        };
        if let Some(id) = &search_attrs.rename {
            attribute = quote! { #attribute.rename(#id) };
        }
        if let Some(operators) = &search_attrs.operators {
            let variants = operators.iter().map(|v| format_ident!("{}", v));
            attribute = quote! {
                #attribute.operators(::searchkit::OperatorSet::from_slice(&[
                    #(::searchkit::FilterOperator::#variants),*
                ]))
            };
        }
        attributes.push(attribute);

        if search_attrs.kind.is_value() {
            let id = search_attrs.rename.clone().unwrap_or_else(|| attribute_name.clone());
            let const_name = format_ident!("{}", to_screaming_snake_case(&id));
            field_constants.push(quote! {
                /// Search field id under the identity naming convention.
                pub const #const_name: &'static str = #id;
            });
        }

        match search_attrs.kind {
            SearchKind::Scalar => slot_arms.push(quote! {
                #attribute_name => ::searchkit::Slot::Value(
                    ::searchkit::SearchScalar::search_value(&self.#field_name)
                ),
            }),
            SearchKind::Elements => slot_arms.push(quote! {
                #attribute_name => ::searchkit::Slot::Values(
                    ::searchkit::SearchElements::element_values(&self.#field_name)
                ),
            }),
            SearchKind::One => slot_arms.push(quote! {
                #attribute_name => ::searchkit::Slot::One(
                    ::searchkit::Relation::related(&self.#field_name)
                        .into_iter()
                        .next()
                        .map(|related| related as &dyn ::searchkit::Record)
                ),
            }),
            SearchKind::Many => slot_arms.push(quote! {
                #attribute_name => ::searchkit::Slot::Many(
                    ::searchkit::Relation::related(&self.#field_name)
                        .into_iter()
                        .map(|related| related as &dyn ::searchkit::Record)
                        .collect()
                ),
            }),
            SearchKind::Flatten => flattened.push(quote! {
                for base in ::searchkit::Relation::related(&self.#field_name) {
                    let slot = ::searchkit::Record::slot(base, attribute);
                    if !slot.is_missing() {
                        return slot;
                    }
                }
            }),
        }
    }

    let expanded = quote! {
        impl #struct_name {
            #(#field_constants)*
        }

        impl ::searchkit::Searchable for #struct_name {
            fn record_name() -> &'static str {
                #record_name
            }

            fn search_attributes() -> ::std::vec::Vec<::searchkit::Attribute> {
                ::std::vec![#(#attributes),*]
            }
        }

        impl ::searchkit::Record for #struct_name {
            fn slot(&self, attribute: &str) -> ::searchkit::Slot<'_> {
                match attribute {
                    #(#slot_arms)*
                    _ => {
                        #(#flattened)*
                        ::searchkit::Slot::Missing
                    }
                }
            }
        }

        impl ::searchkit::Relation for #struct_name {
            type Target = Self;

            fn related(&self) -> ::std::vec::Vec<&Self> {
                ::std::vec![self]
            }
        }
    };

    Ok(expanded)
}

/// Convert a snake_case field name to camelCase.
fn to_camel_case(s: &str) -> String {
    let s = s.strip_prefix("r#").unwrap_or(s);
    let mut result = String::with_capacity(s.len());
    let mut upper_next = false;

    for c in s.chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.extend(c.to_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }

    result
}

/// Convert a string to SCREAMING_SNAKE_CASE.
pub(super) fn to_screaming_snake_case(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 4);
    let mut prev_was_lower = false;

    for c in s.chars() {
        if c.is_uppercase() {
            if prev_was_lower {
                result.push('_');
            }
            result.push(c);
            prev_was_lower = false;
        } else if c == '_' || c == '-' || c == '.' {
            result.push('_');
            prev_was_lower = false;
        } else {
            result.push(c.to_ascii_uppercase());
            prev_was_lower = true;
        }
    }

    result
}
