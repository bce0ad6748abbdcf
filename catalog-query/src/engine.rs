//! Query pipeline: validation → planning → backend → exact cone filter.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{error, info};

use crate::backend::{BackendError, CatalogBackend};
use crate::config::DEFAULT_TABLE;
use crate::filter::{FilterSpec, QueryParams, ValidationError};
use crate::plan::plan;
use crate::record::{filter_rows, CatalogRecord};
use crate::sql::{render, RenderedQuery, SqlDialect};
use crate::synonyms::{NameResolver, SnapshotError, SnapshotStore, SynonymCache, WarmReport};

/// Message returned to callers when the backend fails.
const QUERY_FAILED: &str = "Query failed";

/// Error type for query execution.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Request rejected before reaching the backend
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Backend call failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Error type for engine operations that touch the alias cache.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),
}

/// Status field of the public response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Public response envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub result: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<CatalogRecord>>,
}

impl QueryResponse {
    pub fn success(data: Vec<CatalogRecord>) -> Self {
        Self {
            result: ResponseStatus::Success,
            message: None,
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            result: ResponseStatus::Error,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Runs catalog queries against a backend.
pub struct QueryEngine<B> {
    backend: B,
    table: String,
}

impl<B: CatalogBackend> QueryEngine<B> {
    pub fn new(backend: B) -> Self {
        Self::with_table(backend, DEFAULT_TABLE)
    }

    pub fn with_table(backend: B, table: impl Into<String>) -> Self {
        Self {
            backend,
            table: table.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Run a validated query and return the matching records in backend order.
    pub fn query(&self, spec: &FilterSpec) -> Result<Vec<CatalogRecord>, QueryError> {
        let plan = plan(spec);
        let rows = self.backend.execute(&plan)?;
        let fetched = rows.len();
        let records = filter_rows(rows, plan.cone.as_ref());
        if plan.requires_post_filter() {
            info!("Cone filter kept {} of {} rows", records.len(), fetched);
        }
        Ok(records)
    }

    /// Validate raw parameters, run the query and wrap the outcome.
    ///
    /// Validation messages are passed through; backend failures are logged
    /// and reported as an opaque failure.
    pub fn respond(&self, params: &QueryParams) -> QueryResponse {
        let spec = match FilterSpec::from_params(params) {
            Ok(spec) => spec,
            Err(e) => return QueryResponse::error(e.to_string()),
        };
        match self.query(&spec) {
            Ok(records) => QueryResponse::success(records),
            Err(QueryError::Validation(e)) => QueryResponse::error(e.to_string()),
            Err(QueryError::Backend(e)) => {
                error!("Catalog query failed: {}", e);
                QueryResponse::error(QUERY_FAILED)
            }
        }
    }

    /// SQL a relational backend would receive for this filter.
    pub fn render_sql<D: SqlDialect + ?Sized>(&self, spec: &FilterSpec, dialect: &D) -> RenderedQuery {
        render(&plan(spec), &self.table, dialect)
    }

    pub fn list_targets(&self) -> Result<Vec<String>, BackendError> {
        self.backend.distinct_targets()
    }

    pub fn list_telescopes(&self) -> Result<Vec<String>, BackendError> {
        self.backend.distinct_telescopes()
    }

    pub fn list_file_types(&self) -> Result<Vec<String>, BackendError> {
        self.backend.distinct_file_types()
    }

    /// Every distinct target mapped to its alias list.
    pub fn target_aliases<R, S>(
        &self,
        cache: &SynonymCache<R, S>,
    ) -> Result<BTreeMap<String, Vec<String>>, BackendError>
    where
        R: NameResolver,
        S: SnapshotStore,
    {
        Ok(self
            .list_targets()?
            .into_iter()
            .map(|target| {
                let aliases = cache.lookup(&target);
                (target, aliases)
            })
            .collect())
    }

    /// Resolve aliases for every distinct target and persist the cache.
    pub fn warm_synonyms<R, S>(&self, cache: &SynonymCache<R, S>) -> Result<WarmReport, EngineError>
    where
        R: NameResolver,
        S: SnapshotStore,
    {
        let targets = self.list_targets()?;
        info!("Warming alias cache for {} targets", targets.len());
        Ok(cache.warm(&targets)?)
    }
}
