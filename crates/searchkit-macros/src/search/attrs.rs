//! Attribute parsing for the search derive macros.
//!
//! This module provides parsers for the `#[search(...)]` attributes used by
//! the `Searchable` and `SearchableEnum` derive macros.

use proc_macro2::Span;
use syn::{
    ext::IdentExt,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Error, Ident, Lit, Meta, Result, Token,
};

/// How a field takes part in search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchKind {
    /// A directly supported value: `#[search]`
    #[default]
    Scalar,
    /// A collection of values: `#[search(elements)]`
    Elements,
    /// A single related record: `#[search(one)]`
    One,
    /// A collection of related records: `#[search(many)]`
    Many,
    /// A base record whose fields belong to this one: `#[search(flatten)]`
    Flatten,
}

impl SearchKind {
    fn from_ident(ident: &Ident) -> Option<Self> {
        match ident.to_string().as_str() {
            "elements" => Some(SearchKind::Elements),
            "one" => Some(SearchKind::One),
            "many" => Some(SearchKind::Many),
            "flatten" => Some(SearchKind::Flatten),
            _ => None,
        }
    }

    /// Whether the field emits exactly one search field of its own.
    pub fn is_value(self) -> bool {
        matches!(self, SearchKind::Scalar | SearchKind::Elements)
    }
}

/// Maps an operator name to its `FilterOperator` variant.
///
/// Accepts short names (`eq`, `gte`, `in`) and the wire names (`EQUAL`,
/// `GREATER_THAN_OR_EQUAL`, `IN`).
pub fn operator_variant(name: &str) -> Option<&'static str> {
    let variant = match name {
        "eq" | "EQUAL" => "Equal",
        "ne" | "NOT_EQUAL" => "NotEqual",
        "in" | "IN" => "In",
        "not_in" | "NOT_IN" => "NotIn",
        "like" | "LIKE" => "Like",
        "not_like" | "NOT_LIKE" => "NotLike",
        "gt" | "GREATER_THAN" => "GreaterThan",
        "gte" | "GREATER_THAN_OR_EQUAL" => "GreaterThanOrEqual",
        "lt" | "LESS_THAN" => "LessThan",
        "lte" | "LESS_THAN_OR_EQUAL" => "LessThanOrEqual",
        "is_null" | "IS_NULL" => "IsNull",
        "is_not_null" | "IS_NOT_NULL" => "IsNotNull",
        _ => return None,
    };
    Some(variant)
}

/// Field-level attributes from `#[search(...)]`.
#[derive(Debug, Clone)]
pub struct SearchAttr {
    /// The field carries a `#[search]` attribute at all.
    pub present: bool,
    pub kind: SearchKind,
    /// Exclude this field.
    pub skip: bool,
    /// Explicit id, bypassing the naming convention.
    pub rename: Option<String>,
    /// `FilterOperator` variant names for the operator restriction.
    pub operators: Option<Vec<&'static str>>,
    /// The span for error reporting.
    pub span: Span,
}

impl Default for SearchAttr {
    fn default() -> Self {
        SearchAttr {
            present: false,
            kind: SearchKind::Scalar,
            skip: false,
            rename: None,
            operators: None,
            span: Span::call_site(),
        }
    }
}

impl Parse for SearchAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = SearchAttr {
            present: true,
            span: input.span(),
            ..SearchAttr::default()
        };
        let mut kind_set = false;

        let content: Punctuated<Meta, Token![,]> = Punctuated::parse_terminated(input)?;

        for meta in content {
            match &meta {
                // search(one), search(skip), ...
                Meta::Path(p) => {
                    if p.is_ident("skip") {
                        attr.skip = true;
                        continue;
                    }
                    let kind = p.get_ident().and_then(SearchKind::from_ident).ok_or_else(|| {
                        Error::new(
                            p.span(),
                            "unknown search attribute. Expected: one, many, elements, flatten, or skip",
                        )
                    })?;
                    if kind_set {
                        return Err(Error::new(
                            p.span(),
                            "only one of one, many, elements, flatten may be given",
                        ));
                    }
                    attr.kind = kind;
                    kind_set = true;
                }

                // rename = "customId"
                Meta::NameValue(nv) => {
                    if !nv.path.is_ident("rename") {
                        return Err(Error::new(
                            nv.path.span(),
                            "unknown attribute. Expected: rename",
                        ));
                    }
                    match &nv.value {
                        syn::Expr::Lit(syn::ExprLit {
                            lit: Lit::Str(s), ..
                        }) if !s.value().is_empty() => attr.rename = Some(s.value()),
                        _ => {
                            return Err(Error::new(
                                nv.value.span(),
                                "rename must be a non-empty string literal",
                            ))
                        }
                    }
                }

                // operators(eq, in, like)
                Meta::List(list) => {
                    if !list.path.is_ident("operators") {
                        return Err(Error::new(
                            list.path.span(),
                            "unknown attribute. Expected: operators(...)",
                        ));
                    }
                    // Operator names include keywords such as `in`
                    let names = list.parse_args_with(|input: ParseStream| {
                        Punctuated::<Ident, Token![,]>::parse_terminated_with(input, Ident::parse_any)
                    })?;
                    let mut operators = Vec::with_capacity(names.len());
                    for name in &names {
                        let variant = operator_variant(&name.unraw().to_string()).ok_or_else(|| {
                            Error::new(
                                name.span(),
                                format!(
                                    "unknown operator: '{}'. Expected one of: eq, ne, in, not_in, like, not_like, gt, gte, lt, lte, is_null, is_not_null",
                                    name
                                ),
                            )
                        })?;
                        if !operators.contains(&variant) {
                            operators.push(variant);
                        }
                    }
                    if operators.is_empty() {
                        return Err(Error::new(list.span(), "operators(...) must not be empty"));
                    }
                    attr.operators = Some(operators);
                }
            }
        }

        if attr.skip && (kind_set || attr.rename.is_some() || attr.operators.is_some()) {
            return Err(Error::new(
                attr.span,
                "skip cannot be combined with other search attributes",
            ));
        }

        Ok(attr)
    }
}

/// Extract the `#[search]` / `#[search(...)]` attribute from a field's
/// attributes.
pub fn parse_search_attrs(attrs: &[Attribute]) -> Result<SearchAttr> {
    for attr in attrs {
        if attr.path().is_ident("search") {
            return match &attr.meta {
                Meta::Path(_) => Ok(SearchAttr {
                    present: true,
                    span: attr.span(),
                    ..SearchAttr::default()
                }),
                _ => attr.parse_args::<SearchAttr>(),
            };
        }
    }
    Ok(SearchAttr::default())
}
