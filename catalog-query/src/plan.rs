//! Query planning: [`FilterSpec`] → portable [`QueryPlan`].
//!
//! The plan is a conjunction of typed clauses over the catalog columns.
//! It carries no backend syntax; [`crate::sql`] renders it for a concrete
//! SQL dialect and [`crate::backend::MemoryCatalog`] evaluates it directly.

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::angular::{bounding_box, SkyBox};
use crate::filter::{ConeConstraint, FilterSpec, TargetPattern};
use crate::time::format_civil;

/// Catalog columns the planner can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    TargetName,
    Project,
    UtcObserved,
    Ra,
    Decl,
    CenterFreq,
    FileType,
}

impl Column {
    /// Column name in the `files` table.
    pub fn name(&self) -> &'static str {
        match self {
            Column::TargetName => "target_name",
            Column::Project => "project",
            Column::UtcObserved => "utc_observed",
            Column::Ra => "ra",
            Column::Decl => "decl",
            Column::CenterFreq => "center_freq",
            Column::FileType => "file_type",
        }
    }
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Float(f64),
    Int(u64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{text:?}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Int(n) => write!(f, "{n}"),
        }
    }
}

/// One conjunct of a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Clause {
    /// `column = value`
    Equals { column: Column, value: String },
    /// Regular-expression search.
    Matches { column: Column, pattern: String },
    /// SQL `LIKE` pattern (`%` and `_` wildcards).
    Like { column: Column, pattern: String },
    /// Membership in a non-empty set.
    In { column: Column, values: Vec<String> },
    /// `column >= value`
    AtLeast { column: Column, value: Value },
    /// `column <= value`
    AtMost { column: Column, value: Value },
    /// Bounding-box pre-filter on `decl` and `ra`.
    Cone { sky_box: SkyBox },
}

/// Backend-independent query plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Conjuncts in emission order.
    pub clauses: Vec<Clause>,
    pub limit: Option<u64>,
    /// Cone to re-check exactly once rows come back.
    #[serde(skip)]
    pub cone: Option<ConeConstraint>,
}

impl QueryPlan {
    /// Whether rows must go through the exact radius check.
    pub fn requires_post_filter(&self) -> bool {
        self.cone.is_some()
    }
}

/// Build the plan for a validated spec.
///
/// Clauses appear in a fixed order: target, telescopes, file types,
/// position, time bounds, frequency bounds. Absent axes emit nothing.
pub fn plan(spec: &FilterSpec) -> QueryPlan {
    let mut clauses = vec![target_clause(&spec.target)];

    if !spec.telescopes.is_empty() {
        clauses.push(Clause::In {
            column: Column::Project,
            values: spec.telescopes.clone(),
        });
    }

    if !spec.file_types.is_empty() {
        clauses.push(Clause::In {
            column: Column::FileType,
            values: spec.file_types.clone(),
        });
    }

    if let Some(cone) = &spec.position {
        clauses.push(Clause::Cone {
            sky_box: bounding_box(cone.ra_deg, cone.dec_deg, cone.radius_deg),
        });
    }

    if let Some(start) = &spec.time_start {
        clauses.push(Clause::AtLeast {
            column: Column::UtcObserved,
            value: Value::Text(format_civil(start)),
        });
    }
    if let Some(end) = &spec.time_end {
        clauses.push(Clause::AtMost {
            column: Column::UtcObserved,
            value: Value::Text(format_civil(end)),
        });
    }

    if let Some(start) = spec.freq_start {
        clauses.push(Clause::AtLeast {
            column: Column::CenterFreq,
            value: Value::Float(start),
        });
    }
    if let Some(end) = spec.freq_end {
        clauses.push(Clause::AtMost {
            column: Column::CenterFreq,
            value: Value::Float(end),
        });
    }

    let plan = QueryPlan {
        clauses,
        limit: spec.limit,
        cone: spec.position,
    };
    debug!(
        "Planned query with {} clauses (limit: {:?}, post-filter: {})",
        plan.clauses.len(),
        plan.limit,
        plan.requires_post_filter()
    );
    plan
}

fn target_clause(target: &TargetPattern) -> Clause {
    let column = Column::TargetName;
    match target {
        TargetPattern::Exact(name) => Clause::Equals {
            column,
            value: name.clone(),
        },
        TargetPattern::Regex(pattern) => Clause::Matches {
            column,
            pattern: pattern.clone(),
        },
        TargetPattern::Substring(text) if text.is_empty() => Clause::Like {
            column,
            pattern: "%".to_string(),
        },
        TargetPattern::Substring(text) => Clause::Like {
            column,
            pattern: format!("%{text}%"),
        },
    }
}
