//! Observation catalog query engine
//!
//! This crate turns named request parameters (target, telescopes, file
//! types, sky position, time and frequency windows) into a validated
//! [`FilterSpec`], plans it as a backend-independent [`QueryPlan`], runs the
//! plan against a [`CatalogBackend`] and applies the exact cone check to the
//! rows that come back. Target aliases are resolved through SIMBAD and kept
//! in a persistent [`SynonymCache`].
//!
//! | Module       | Role                                                 |
//! |--------------|------------------------------------------------------|
//! | [`angular`]  | Great-circle separation and cone bounding boxes      |
//! | [`filter`]   | Request parameters and validation                    |
//! | [`plan`]     | Portable query plans                                 |
//! | [`sql`]      | Parameterized SQL for MySQL and PostgreSQL           |
//! | [`backend`]  | Storage boundary and the in-memory CSV catalog       |
//! | [`record`]   | Row types and the exact radius post-filter           |
//! | [`synonyms`] | Alias cache, SIMBAD resolver and snapshots           |
//! | [`engine`]   | End-to-end query pipeline and response envelope      |
//! | [`config`]   | JSON configuration                                   |
//! | [`time`]     | MJD and civil-time conversions                       |

pub mod angular;
pub mod backend;
pub mod config;
pub mod engine;
pub mod filter;
pub mod plan;
pub mod record;
pub mod sql;
pub mod synonyms;
pub mod time;

pub use angular::{bounding_box, separation_deg, RaConstraint, SkyBox};
pub use backend::{BackendError, CatalogBackend, MemoryCatalog};
pub use config::{ConfigError, EngineConfig, SimbadConfig};
pub use engine::{EngineError, QueryEngine, QueryError, QueryResponse, ResponseStatus};
pub use filter::{ConeConstraint, FilterSpec, QueryParams, TargetPattern, ValidationError};
pub use plan::{plan, Clause, Column, QueryPlan, Value};
pub use record::{filter_rows, CatalogRecord, CatalogRow};
pub use sql::{render, MySql, Postgres, RenderedQuery, SqlDialect};
pub use synonyms::{
    JsonSnapshotFile, MemorySnapshot, NameResolver, SimbadResolver, SnapshotStore, SynonymCache,
    WarmReport,
};
