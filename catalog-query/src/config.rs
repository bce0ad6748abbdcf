//! Engine configuration stored as JSON.
//!
//! Every field has a default, so a partial file (or none at all) is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default location of the alias cache snapshot.
pub const DEFAULT_SYNONYM_CACHE_PATH: &str = "data/simbad-ids.json";

/// Default catalog table name.
pub const DEFAULT_TABLE: &str = "files";

/// Default SIMBAD TAP synchronous query endpoint.
pub const DEFAULT_SIMBAD_ENDPOINT: &str = "https://simbad.cds.unistra.fr/simbad/sim-tap/sync";

/// Error type for configuration files.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// File contents are not a valid configuration
    #[error("Invalid configuration: {0}")]
    Format(#[from] serde_json::Error),
}

/// SIMBAD resolver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimbadConfig {
    /// TAP `sync` endpoint URL
    pub endpoint: String,
    /// Whole-request timeout in seconds
    pub timeout_secs: u64,
}

impl SimbadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SimbadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SIMBAD_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CSV dump of the catalog table
    pub catalog_path: Option<PathBuf>,
    /// JSON snapshot of the alias cache
    pub synonym_cache_path: PathBuf,
    /// Catalog table name used when rendering SQL
    pub table: String,
    pub simbad: SimbadConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            synonym_cache_path: PathBuf::from(DEFAULT_SYNONYM_CACHE_PATH),
            table: DEFAULT_TABLE.to_string(),
            simbad: SimbadConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}
