//! External name resolution.
//!
//! [`SimbadResolver`] asks the SIMBAD TAP service for every identifier that
//! shares an object with the queried name.

use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::config::SimbadConfig;

/// Error type for resolver calls.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Request failed or timed out
    #[error("HTTP error: {0}")]
    Http(String),
    /// Response could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Source of alternative identifiers for a target name.
pub trait NameResolver: Send + Sync {
    /// Identifiers known for `target`.
    ///
    /// `Ok(None)` means the service has no record of the name.
    fn resolve(&self, target: &str) -> Result<Option<Vec<String>>, ResolverError>;
}

impl<R: NameResolver + ?Sized> NameResolver for Arc<R> {
    fn resolve(&self, target: &str) -> Result<Option<Vec<String>>, ResolverError> {
        (**self).resolve(target)
    }
}

/// Resolver backed by the SIMBAD TAP `sync` endpoint.
#[derive(Debug, Clone)]
pub struct SimbadResolver {
    agent: ureq::Agent,
    endpoint: String,
}

impl SimbadResolver {
    pub fn new(config: &SimbadConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();
        Self {
            agent,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Default for SimbadResolver {
    fn default() -> Self {
        Self::new(&SimbadConfig::default())
    }
}

impl NameResolver for SimbadResolver {
    fn resolve(&self, target: &str) -> Result<Option<Vec<String>>, ResolverError> {
        let query = identifiers_query(target);
        debug!("Querying SIMBAD for identifiers of {:?}", target);

        let mut response = self
            .agent
            .get(&self.endpoint)
            .query("REQUEST", "doQuery")
            .query("LANG", "ADQL")
            .query("FORMAT", "json")
            .query("QUERY", &query)
            .call()
            .map_err(|e| ResolverError::Http(e.to_string()))?;

        let body: TapResponse = response
            .body_mut()
            .read_json()
            .map_err(|e| ResolverError::Parse(e.to_string()))?;

        Ok(identifiers_from_tap(body))
    }
}

/// ADQL selecting all identifiers of the object known as `target`.
fn identifiers_query(target: &str) -> String {
    format!(
        "SELECT id2.id FROM ident AS id1 JOIN ident AS id2 USING(oidref) WHERE id1.id = '{}'",
        target.replace('\'', "''")
    )
}

/// TAP JSON output: one array per row, columns in `SELECT` order.
#[derive(Debug, Deserialize)]
struct TapResponse {
    data: Vec<Vec<serde_json::Value>>,
}

fn identifiers_from_tap(response: TapResponse) -> Option<Vec<String>> {
    let ids: Vec<String> = response
        .data
        .into_iter()
        .filter_map(|row| match row.into_iter().next() {
            Some(serde_json::Value::String(id)) => Some(id),
            _ => None,
        })
        .collect();

    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}
