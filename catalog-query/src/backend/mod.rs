//! Storage backend boundary.
//!
//! A backend executes a [`QueryPlan`] and returns raw [`CatalogRow`]s.
//! Connection handling, transactions and retries are the backend's own
//! business; the engine never retries a failed call.

mod memory;

pub use memory::MemoryCatalog;

use crate::plan::QueryPlan;
use crate::record::CatalogRow;

/// Error type for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Catalog source could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Catalog source is malformed
    #[error("Parse error: {0}")]
    Parse(String),
    /// A clause could not be evaluated
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    /// Backend-specific execution failure
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl From<csv::Error> for BackendError {
    fn from(err: csv::Error) -> Self {
        BackendError::Parse(err.to_string())
    }
}

/// Something that can run catalog query plans.
pub trait CatalogBackend {
    /// Run the plan's pre-filter and return matching rows in backend order.
    ///
    /// The exact cone check is not the backend's job; rows inside the
    /// bounding box but outside the cone may be returned.
    fn execute(&self, plan: &QueryPlan) -> Result<Vec<CatalogRow>, BackendError>;

    /// Distinct target names in the catalog.
    fn distinct_targets(&self) -> Result<Vec<String>, BackendError>;

    /// Distinct telescope / project names in the catalog.
    fn distinct_telescopes(&self) -> Result<Vec<String>, BackendError>;

    /// Distinct file type names in the catalog.
    fn distinct_file_types(&self) -> Result<Vec<String>, BackendError>;
}
