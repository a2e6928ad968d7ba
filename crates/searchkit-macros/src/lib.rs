//! Derive macros for searchkit.
//!
//! ## Derive Macros
//!
//! - [`Searchable`] - Register a struct's searchable attributes and generate
//!   record access for the in-memory executor
//! - [`SearchableEnum`] - Make a unit enum usable as a search field type
//!
//! The generated code refers to `::searchkit`, so use these macros through
//! the `searchkit` crate's `derive` feature rather than directly.

mod search;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Derives `Searchable`, `Record`, and `Relation` for a struct.
///
/// Only fields annotated with `#[search]` take part in search.
///
/// # Field Attributes
///
/// | Attribute | Description |
/// |-----------|-------------|
/// | `#[search]` | A value field; its type must implement `SearchScalar` |
/// | `#[search(elements)]` | A collection of values (`Vec<T>`, `BTreeSet<T>`, `HashSet<T>`) |
/// | `#[search(one)]` | A single related record (`T`, `Option<T>`, `Box<T>`) |
/// | `#[search(many)]` | A collection of related records (`Vec<T>`) |
/// | `#[search(flatten)]` | A base record whose fields are emitted as this record's own |
/// | `#[search(rename = "...")]` | Use a fixed id instead of the naming convention |
/// | `#[search(operators(eq, in))]` | Restrict the operators allowed on the field |
/// | `#[search(skip)]` | Exclude this field |
///
/// Attribute names are the field names in camelCase (`first_name` becomes
/// `firstName`), so that the snake_case and dot.case conventions can split
/// them.
///
/// # Generated Code
///
/// The macro generates:
///
/// 1. Field id constants for value fields (e.g., `Customer::FIRST_NAME`)
/// 2. `Searchable::search_attributes()`
/// 3. `Record::slot()`, used by the in-memory executor
/// 4. `Relation` with `Target = Self`, so the struct can be the target of
///    `one`, `many`, and `flatten` fields
///
/// # Example
///
/// ```ignore
/// use searchkit::{Searchable, SearchableEnum};
///
/// #[derive(SearchableEnum)]
/// enum Status { Active, OnHold }
///
/// #[derive(Searchable)]
/// struct Address {
///     #[search]
///     city: String,
/// }
///
/// #[derive(Searchable)]
/// struct Customer {
///     #[search(operators(eq, like))]
///     first_name: String,
///
///     #[search]
///     status: Status,
///
///     #[search(elements)]
///     tags: Vec<String>,
///
///     #[search(one)]
///     address: Option<Address>,
///
///     #[search(skip)]
///     password_hash: String,
/// }
///
/// assert_eq!(Customer::FIRST_NAME, "firstName");
/// ```
#[proc_macro_derive(Searchable, attributes(search))]
pub fn searchable_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    search::searchable_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

/// Derives `SearchEnum` and `SearchScalar` for a unit-only enum.
///
/// Member names are the variant names in SCREAMING_SNAKE_CASE (`OnHold`
/// becomes `ON_HOLD`); `#[search(rename = "...")]` on a variant overrides
/// it. Filter values are upper-cased before matching, so `"on_hold"` selects
/// `OnHold`.
///
/// ```ignore
/// use searchkit::SearchableEnum;
///
/// #[derive(SearchableEnum)]
/// enum Priority {
///     Low,
///     High,
///     #[search(rename = "P0")]
///     Critical,
/// }
/// ```
#[proc_macro_derive(SearchableEnum, attributes(search))]
pub fn searchable_enum_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    search::searchable_enum_derive_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
