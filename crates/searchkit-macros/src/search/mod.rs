//! Implementation of the `#[derive(Searchable)]` and
//! `#[derive(SearchableEnum)]` macros.
//!
//! This module provides derive macro support for searchkit, generating the
//! registration and record access traits from struct and enum annotations.

mod attrs;
mod derive;
mod enum_derive;

pub use derive::searchable_derive_impl;
pub use enum_derive::searchable_enum_derive_impl;
