//! Field metadata discovery.
//!
//! Walks a record's registered attributes, recursing through relationships,
//! and flattens them into a [`Catalogue`]. Catalogues are memoized per record
//! type for the life of the discoverer.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};

use crate::error::{Result, SearchError};
use crate::field::{Catalogue, SearchField};
use crate::naming::NamingConvention;
use crate::op::{CapabilityTable, OperatorSet};
use crate::schema::{Attribute, AttributeKind, RecordType};

/// Builds and caches catalogues.
///
/// Concurrent first-time discovery of the same type may walk it more than
/// once; the first catalogue stored wins and every caller receives it.
#[derive(Debug, Default)]
pub struct FieldDiscoverer {
    naming: NamingConvention,
    cache: RwLock<HashMap<TypeId, Arc<Catalogue>>>,
}

impl FieldDiscoverer {
    pub fn new(naming: NamingConvention) -> Self {
        FieldDiscoverer {
            naming,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn naming(&self) -> NamingConvention {
        self.naming
    }

    /// Returns the catalogue for `record`, building it on first use.
    pub fn discover(
        &self,
        record: RecordType,
        capabilities: &CapabilityTable,
    ) -> Result<Arc<Catalogue>> {
        if let Some(cached) = self.cached(record) {
            trace!(record = record.name(), "search catalogue cache hit");
            return Ok(cached);
        }

        let mut stack = Vec::new();
        let fields = self.collect(record, &mut stack)?;
        let catalogue = Arc::new(Catalogue::new(record.name(), fields, capabilities)?);
        debug!(
            record = record.name(),
            fields = catalogue.len(),
            naming = %self.naming,
            "built search catalogue"
        );

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(cache.entry(record.type_id()).or_insert(catalogue)))
    }

    /// Returns the memoized catalogue, if `record` was already discovered.
    pub fn cached(&self, record: RecordType) -> Option<Arc<Catalogue>> {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&record.type_id())
            .cloned()
    }

    /// Every memoized catalogue, in record name order.
    pub fn cached_catalogues(&self) -> Vec<Arc<Catalogue>> {
        let mut catalogues: Vec<_> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        catalogues.sort_by(|a, b| a.record().cmp(b.record()));
        catalogues
    }

    /// Number of memoized catalogues.
    pub fn cached_len(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn collect(&self, record: RecordType, stack: &mut Vec<RecordType>) -> Result<Vec<SearchField>> {
        stack.push(record);
        let mut fields = Vec::new();

        for attribute in record.attributes() {
            let id = match attribute.id {
                Some(explicit) => explicit.to_string(),
                None => self.naming.format_id(attribute.name),
            };

            match attribute.kind {
                AttributeKind::Scalar(field_type) => {
                    let mut field = SearchField::new(id, attribute.name, field_type);
                    field.allowed_operators = attribute.operators;
                    fields.push(field);
                }
                AttributeKind::Elements(field_type) => {
                    let mut field =
                        SearchField::new(id, attribute.name, field_type).element_collection();
                    field.allowed_operators = attribute.operators;
                    fields.push(field);
                }
                AttributeKind::ToOne(target)
                | AttributeKind::ToMany(target)
                | AttributeKind::Flatten(target) => {
                    // Recursion guard
                    if stack.contains(&target) {
                        trace!(
                            record = record.name(),
                            attribute = attribute.name,
                            target = target.name(),
                            "skipping attribute pointing back into the recursion stack"
                        );
                        continue;
                    }
                    let nested = self.collect(target, stack)?;
                    fields.extend(
                        nested
                            .into_iter()
                            .map(|field| self.lift(&attribute, &id, field)),
                    );
                }
                AttributeKind::Unsupported(type_name) => {
                    return Err(SearchError::configuration(
                        record.name(),
                        format!(
                            "attribute '{}' of type {type_name} is marked searchable but is not a supported value, collection, or relationship",
                            attribute.name
                        ),
                    ));
                }
            }
        }

        stack.pop();
        Ok(fields)
    }

    /// Re-roots a nested field under the relationship `attribute`.
    fn lift(&self, attribute: &Attribute, parent_id: &str, mut field: SearchField) -> SearchField {
        field.allowed_operators = narrow(attribute.operators, field.allowed_operators);

        match attribute.kind {
            AttributeKind::Flatten(_) => return field,
            AttributeKind::ToMany(_) => {
                field.multi_valued = true;
                field.distinct = true;
            }
            _ => {}
        }

        // Renamed nested ids follow the convention too.
        let nested_id = self.naming.format_id(&field.id);
        field.id = self.naming.merge(parent_id, &nested_id);
        field.path = format!("{}.{}", attribute.name, field.path);
        field
    }
}

fn narrow(outer: Option<OperatorSet>, inner: Option<OperatorSet>) -> Option<OperatorSet> {
    match (outer, inner) {
        (Some(a), Some(b)) => Some(a.intersection(b)),
        (a, b) => a.or(b),
    }
}
