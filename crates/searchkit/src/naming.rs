//! Naming conventions for generated search field ids.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// A lowercase letter or digit followed by an uppercase letter.
static WORD_BOUNDARY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([a-z0-9])([A-Z])").unwrap_or_else(|err| panic!("invalid boundary regex: {err}"))
});

/// How attribute names become field ids, and how nested ids are joined.
///
/// | Convention | `createdAt` | `orders` + `totalAmount` |
/// |------------|-------------|--------------------------|
/// | `Identity` | `createdAt` | `ordersTotalAmount` |
/// | `SnakeCase` | `created_at` | `orders_total_amount` |
/// | `DotCase` | `created.at` | `orders.total.amount` |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    /// Names are used as written; nested ids are joined camelCase.
    #[default]
    #[serde(alias = "camel_case")]
    Identity,
    SnakeCase,
    #[serde(alias = "dot.case")]
    DotCase,
}

impl NamingConvention {
    /// Formats a single attribute name as an id.
    pub fn format_id(self, name: &str) -> String {
        match self {
            NamingConvention::Identity => name.to_string(),
            NamingConvention::SnakeCase => split_words(name, "_"),
            NamingConvention::DotCase => split_words(name, "."),
        }
    }

    /// Joins a parent id with an already formatted nested id.
    pub fn merge(self, parent: &str, nested: &str) -> String {
        match self {
            NamingConvention::Identity => {
                let mut chars = nested.chars();
                match chars.next() {
                    Some(first) => {
                        let mut merged = String::with_capacity(parent.len() + nested.len());
                        merged.push_str(parent);
                        merged.extend(first.to_uppercase());
                        merged.push_str(chars.as_str());
                        merged
                    }
                    None => parent.to_string(),
                }
            }
            NamingConvention::SnakeCase => format!("{parent}_{nested}"),
            NamingConvention::DotCase => format!("{parent}.{nested}"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NamingConvention::Identity => "identity",
            NamingConvention::SnakeCase => "snake_case",
            NamingConvention::DotCase => "dot_case",
        }
    }
}

impl fmt::Display for NamingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn split_words(name: &str, separator: &str) -> String {
    let replacement = format!("${{1}}{separator}${{2}}");
    WORD_BOUNDARY
        .replace_all(name, replacement.as_str())
        .to_lowercase()
}
