//! The seam between the engine and a storage backend.

use crate::plan::QueryPlan;

/// Runs query plans against a backend.
///
/// The engine never touches storage itself: it builds a page plan and a
/// count plan, then asks the executor to run them. Connections, transactions,
/// cancellation, and timeouts all belong to the implementation.
pub trait QueryExecutor {
    /// The root record type the executor queries.
    type Root: 'static;

    /// What one fetched row is returned as.
    type Row;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the rows selected by `plan`, in order, honoring `skip`/`take`.
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Self::Row>, Self::Error>;

    /// Returns the number of root records matching `plan`'s conditions,
    /// counting each record once when `plan.distinct` is set.
    fn count(&self, plan: &QueryPlan) -> Result<u64, Self::Error>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    type Root = E::Root;
    type Row = E::Row;
    type Error = E::Error;

    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<Self::Row>, Self::Error> {
        (**self).fetch(plan)
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, Self::Error> {
        (**self).count(plan)
    }
}
