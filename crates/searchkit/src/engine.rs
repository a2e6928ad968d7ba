//! The search engine facade.

use std::sync::Arc;

use tracing::debug;

use crate::coerce::CoercionRegistry;
use crate::config::EngineConfig;
use crate::discover::FieldDiscoverer;
use crate::error::{Result, SearchError};
use crate::executor::QueryExecutor;
use crate::field::{Catalogue, SearchField};
use crate::naming::NamingConvention;
use crate::op::CapabilityTable;
use crate::plan::{PlanBuilder, QueryPlan};
use crate::request::{SearchRequest, SearchResponse};
use crate::schema::{RecordType, Searchable};
use crate::validate::RequestValidator;

/// Discovers catalogues, validates requests, builds plans, and assembles
/// responses.
///
/// One engine is meant to live for the whole process and be shared; its
/// catalogue cache is never invalidated.
///
/// Every search validates the request and coerces every filter value for
/// both the page plan and the count plan before the executor is called.
///
/// ```
/// use searchkit::{
///     Attribute, FieldType, MemoryExecutor, Record, SearchEngine, SearchRequest,
///     Searchable, Slot, Value,
/// };
///
/// struct Item { price: i64 }
///
/// impl Searchable for Item {
///     fn search_attributes() -> Vec<Attribute> {
///         vec![Attribute::scalar("price", FieldType::I64)]
///     }
/// }
///
/// impl Record for Item {
///     fn slot(&self, attribute: &str) -> Slot<'_> {
///         match attribute {
///             "price" => Slot::Value(Some(Value::I64(self.price))),
///             _ => Slot::Missing,
///         }
///     }
/// }
///
/// let engine = SearchEngine::new();
/// let items = [Item { price: 5 }, Item { price: 50 }, Item { price: 500 }];
/// let request = SearchRequest::new(1, 2).sort_desc("price");
///
/// let page = engine.search(&request, &MemoryExecutor::new(&items)).unwrap();
/// assert_eq!(page.returned_count, 2);
/// assert_eq!(page.total_count, Some(3));
/// assert_eq!(page.data[0].price, 500);
/// ```
#[derive(Debug)]
pub struct SearchEngine {
    config: EngineConfig,
    capabilities: CapabilityTable,
    coercion: CoercionRegistry,
    discoverer: FieldDiscoverer,
}

impl SearchEngine {
    /// An engine with the default configuration.
    pub fn new() -> Self {
        SearchEngine::from_parts(
            EngineConfig::default(),
            CapabilityTable::standard(),
            CoercionRegistry::standard(),
        )
    }

    pub fn builder() -> SearchEngineBuilder {
        SearchEngineBuilder::default()
    }

    fn from_parts(
        config: EngineConfig,
        capabilities: CapabilityTable,
        coercion: CoercionRegistry,
    ) -> Self {
        SearchEngine {
            discoverer: FieldDiscoverer::new(config.naming_convention),
            config,
            capabilities,
            coercion,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn coercion(&self) -> &CoercionRegistry {
        &self.coercion
    }

    /// The catalogue of `T`, discovered on first use and memoized.
    pub fn discover_fields<T: Searchable>(&self) -> Result<Arc<Catalogue>> {
        self.discoverer
            .discover(RecordType::of::<T>(), &self.capabilities)
    }

    /// Every catalogue discovered so far, in record name order.
    pub fn cached_catalogues(&self) -> Vec<Arc<Catalogue>> {
        self.discoverer.cached_catalogues()
    }

    /// Builds a catalogue from explicit fields instead of discovering one.
    ///
    /// The result is not cached.
    pub fn catalogue(
        &self,
        record: impl Into<String>,
        fields: impl IntoIterator<Item = SearchField>,
    ) -> Result<Catalogue> {
        Catalogue::new(record, fields.into_iter().collect(), &self.capabilities)
    }

    /// Validates `request` and builds its page plan.
    pub fn plan(&self, request: &SearchRequest, catalogue: &Catalogue) -> Result<QueryPlan> {
        self.validate(request, catalogue)?;
        self.builder_for(catalogue).page_plan(request)
    }

    /// Validates `request` and builds its count plan.
    pub fn count_plan(&self, request: &SearchRequest, catalogue: &Catalogue) -> Result<QueryPlan> {
        self.validate(request, catalogue)?;
        self.builder_for(catalogue).count_plan(request)
    }

    /// Runs a page search over the executor's root record, with totals.
    pub fn search<E>(&self, request: &SearchRequest, executor: &E) -> Result<SearchResponse<E::Row>>
    where
        E: QueryExecutor,
        E::Root: Searchable,
    {
        let catalogue = self.discover_fields::<E::Root>()?;
        self.search_with_catalogue(request, &catalogue, executor)
    }

    /// Runs a page search against an explicit catalogue, with totals.
    pub fn search_with_catalogue<E>(
        &self,
        request: &SearchRequest,
        catalogue: &Catalogue,
        executor: &E,
    ) -> Result<SearchResponse<E::Row>>
    where
        E: QueryExecutor,
    {
        self.validate(request, catalogue)?;
        let builder = self.builder_for(catalogue);
        let page_plan = builder.page_plan(request)?;
        let count_plan = builder.count_plan(request)?;

        let rows = executor.fetch(&page_plan).map_err(SearchError::executor)?;
        let total = executor.count(&count_plan).map_err(SearchError::executor)?;

        debug!(
            record = catalogue.record(),
            page = request.page,
            returned = rows.len(),
            total,
            "search completed"
        );
        Ok(SearchResponse::new(request, rows, Some(total)))
    }

    /// Runs a page search with totals and transforms every row.
    pub fn search_map<E, M, F>(
        &self,
        request: &SearchRequest,
        executor: &E,
        mapper: F,
    ) -> Result<SearchResponse<M>>
    where
        E: QueryExecutor,
        E::Root: Searchable,
        F: FnMut(E::Row) -> M,
    {
        Ok(self.search(request, executor)?.map(mapper))
    }

    /// Runs a page search without executing the count plan; the response has
    /// no `total_count`.
    pub fn search_without_totals<E>(
        &self,
        request: &SearchRequest,
        executor: &E,
    ) -> Result<SearchResponse<E::Row>>
    where
        E: QueryExecutor,
        E::Root: Searchable,
    {
        let rows = self.fetch(request, executor)?;
        Ok(SearchResponse::new(request, rows, None))
    }

    /// Fetches one page of rows without assembling a response.
    pub fn fetch<E>(&self, request: &SearchRequest, executor: &E) -> Result<Vec<E::Row>>
    where
        E: QueryExecutor,
        E::Root: Searchable,
    {
        let catalogue = self.discover_fields::<E::Root>()?;
        let plan = self.plan(request, &catalogue)?;
        executor.fetch(&plan).map_err(SearchError::executor)
    }

    /// Counts every row matching the request's filters.
    pub fn count<E>(&self, request: &SearchRequest, executor: &E) -> Result<u64>
    where
        E: QueryExecutor,
        E::Root: Searchable,
    {
        let catalogue = self.discover_fields::<E::Root>()?;
        let plan = self.count_plan(request, &catalogue)?;
        executor.count(&plan).map_err(SearchError::executor)
    }

    fn validate(&self, request: &SearchRequest, catalogue: &Catalogue) -> Result<()> {
        RequestValidator::new(self.config.max_page_size, &self.capabilities)
            .validate(request, catalogue)?;
        Ok(())
    }

    fn builder_for<'a>(&'a self, catalogue: &'a Catalogue) -> PlanBuilder<'a> {
        PlanBuilder::new(catalogue, &self.coercion)
    }
}

impl Default for SearchEngine {
    fn default() -> Self {
        SearchEngine::new()
    }
}

/// Builder for [`SearchEngine`].
#[derive(Debug, Clone, Default)]
pub struct SearchEngineBuilder {
    config: EngineConfig,
    capabilities: Option<CapabilityTable>,
    coercion: Option<CoercionRegistry>,
}

impl SearchEngineBuilder {
    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_page_size(mut self, max_page_size: u32) -> Self {
        self.config.max_page_size = max_page_size;
        self
    }

    pub fn naming_convention(mut self, naming_convention: NamingConvention) -> Self {
        self.config.naming_convention = naming_convention;
        self
    }

    pub fn capabilities(mut self, capabilities: CapabilityTable) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    pub fn coercion(mut self, coercion: CoercionRegistry) -> Self {
        self.coercion = Some(coercion);
        self
    }

    /// Validates the configuration and builds the engine.
    pub fn build(self) -> Result<SearchEngine> {
        self.config.validate()?;
        Ok(SearchEngine::from_parts(
            self.config,
            self.capabilities.unwrap_or_default(),
            self.coercion.unwrap_or_default(),
        ))
    }
}
