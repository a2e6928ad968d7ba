//! Request validation against a catalogue.

use crate::error::InvalidRequest;
use crate::field::{Catalogue, SearchField};
use crate::op::CapabilityTable;
use crate::request::{Filter, SearchRequest};

/// Checks a request before anything is coerced or planned.
#[derive(Debug, Clone, Copy)]
pub struct RequestValidator<'a> {
    max_page_size: u32,
    capabilities: &'a CapabilityTable,
}

impl<'a> RequestValidator<'a> {
    pub fn new(max_page_size: u32, capabilities: &'a CapabilityTable) -> Self {
        RequestValidator {
            max_page_size,
            capabilities,
        }
    }

    /// Validates pagination, every filter, and every sort.
    ///
    /// Stops at the first problem found, checking pagination first, then
    /// filters and sorts in request order.
    pub fn validate(
        &self,
        request: &SearchRequest,
        catalogue: &Catalogue,
    ) -> Result<(), InvalidRequest> {
        if request.page < 1 {
            return Err(InvalidRequest::PageOutOfRange { page: request.page });
        }
        if request.page_size < 1 {
            return Err(InvalidRequest::EmptyPage);
        }
        if request.page_size > self.max_page_size {
            return Err(InvalidRequest::PageSizeExceeded {
                requested: request.page_size,
                max: self.max_page_size,
            });
        }

        for filter in &request.filters {
            let field = lookup(catalogue, &filter.field)?;
            self.check_filter(field, filter)?;
        }

        for sort in &request.sorts {
            let field = lookup(catalogue, &sort.field)?;
            if !field.sortable() {
                return Err(InvalidRequest::SortOnCollection {
                    field: sort.field.clone(),
                });
            }
        }

        Ok(())
    }

    fn check_filter(&self, field: &SearchField, filter: &Filter) -> Result<(), InvalidRequest> {
        let allowed = self
            .capabilities
            .allowed(field.field_type.kind(), field.allowed_operators);
        if !allowed.contains(filter.operator) {
            return Err(InvalidRequest::OperatorNotAllowed {
                field: filter.field.clone(),
                operator: filter.operator,
                allowed,
            });
        }
        if filter.operator.requires_value() && filter.values.is_empty() {
            return Err(InvalidRequest::MissingValue {
                field: filter.field.clone(),
                operator: filter.operator,
            });
        }
        Ok(())
    }
}

fn lookup<'c>(catalogue: &'c Catalogue, id: &str) -> Result<&'c SearchField, InvalidRequest> {
    catalogue
        .get(id)
        .ok_or_else(|| InvalidRequest::UnknownField {
            field: id.to_string(),
            known: catalogue.ids().map(str::to_string).collect(),
        })
}
