//! Search fields and the per-record catalogue.

use std::collections::HashMap;

use crate::error::{Result, SearchError};
use crate::op::{CapabilityTable, OperatorSet};
use crate::value::FieldType;

/// A discovered, addressable attribute of a root record.
///
/// # Example
///
/// ```
/// use searchkit::{FieldType, SearchField};
///
/// let total = SearchField::new("ordersTotal", "orders.total", FieldType::Decimal)
///     .multi_valued();
/// assert!(total.distinct);
/// assert_eq!(total.segments().collect::<Vec<_>>(), ["orders", "total"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchField {
    /// Externally visible name, unique within a catalogue.
    pub id: String,
    /// Dotted traversal from the root record to the attribute.
    pub path: String,
    pub field_type: FieldType,
    /// The path passes through a to-many hop or ends in an element collection.
    pub multi_valued: bool,
    /// Resolving the path can produce duplicate root rows.
    pub distinct: bool,
    /// Explicit operator restriction; `None` allows everything the type supports.
    pub allowed_operators: Option<OperatorSet>,
    /// The final path segment is itself a collection of values.
    pub element_collection: bool,
}

impl SearchField {
    pub fn new(id: impl Into<String>, path: impl Into<String>, field_type: FieldType) -> Self {
        SearchField {
            id: id.into(),
            path: path.into(),
            field_type,
            multi_valued: false,
            distinct: false,
            allowed_operators: None,
            element_collection: false,
        }
    }

    /// A field whose path is its id.
    pub fn simple(id: impl Into<String>, field_type: FieldType) -> Self {
        let id = id.into();
        SearchField::new(id.clone(), id, field_type)
    }

    /// Marks the field as reached through a fan-out hop. Implies `distinct`.
    pub fn multi_valued(mut self) -> Self {
        self.multi_valued = true;
        self.distinct = true;
        self
    }

    /// Marks the field as a collection of plain values.
    pub fn element_collection(mut self) -> Self {
        self.element_collection = true;
        self.multi_valued()
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn with_operators(mut self, operators: OperatorSet) -> Self {
        self.allowed_operators = Some(operators);
        self
    }

    /// Whether results can be ordered by this field. Fields that fan out to
    /// several values per root row cannot.
    pub fn sortable(&self) -> bool {
        !self.distinct && !self.multi_valued
    }

    /// Path segments, root side first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}

/// The ordered collection of search fields for one root record.
#[derive(Debug, Clone)]
pub struct Catalogue {
    record: String,
    fields: Vec<SearchField>,
    index: HashMap<String, usize>,
}

impl Catalogue {
    /// Builds a catalogue, checking its invariants.
    ///
    /// Fails with a configuration error on a duplicate id, an empty path or
    /// path segment, a multi-valued field not marked distinct, or an operator
    /// restriction that is empty or not allowed for the field's type.
    pub fn new(
        record: impl Into<String>,
        fields: Vec<SearchField>,
        capabilities: &CapabilityTable,
    ) -> Result<Self> {
        let record = record.into();
        let mut index = HashMap::with_capacity(fields.len());

        for (position, field) in fields.iter().enumerate() {
            if field.id.is_empty() {
                return Err(SearchError::configuration(
                    &record,
                    format!("field with path '{}' has an empty id", field.path),
                ));
            }
            if field.path.is_empty() || field.segments().any(str::is_empty) {
                return Err(SearchError::configuration(
                    &record,
                    format!("field '{}' has an invalid path '{}'", field.id, field.path),
                ));
            }
            if field.multi_valued && !field.distinct {
                return Err(SearchError::configuration(
                    &record,
                    format!("multi-valued field '{}' must be distinct", field.id),
                ));
            }
            if let Some(restricted) = field.allowed_operators {
                if restricted.is_empty() {
                    return Err(SearchError::configuration(
                        &record,
                        format!("field '{}' permits no filter operators", field.id),
                    ));
                }
                let supported = capabilities.operators_for(field.field_type.kind());
                if !restricted.is_subset(supported) {
                    return Err(SearchError::configuration(
                        &record,
                        format!(
                            "field '{}' of type {} restricts to {restricted}, but only {supported} apply",
                            field.id, field.field_type
                        ),
                    ));
                }
            }
            if index.insert(field.id.clone(), position).is_some() {
                return Err(SearchError::configuration(
                    &record,
                    format!("duplicate search field id '{}'", field.id),
                ));
            }
        }

        Ok(Catalogue {
            record,
            fields,
            index,
        })
    }

    /// Name of the root record.
    pub fn record(&self) -> &str {
        &self.record
    }

    pub fn get(&self, id: &str) -> Option<&SearchField> {
        self.index.get(id).map(|&i| &self.fields[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Field ids in catalogue order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchField> {
        self.fields.iter()
    }

    pub fn fields(&self) -> &[SearchField] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<'a> IntoIterator for &'a Catalogue {
    type Item = &'a SearchField;
    type IntoIter = std::slice::Iter<'a, SearchField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
