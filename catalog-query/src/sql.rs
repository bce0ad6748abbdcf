//! Rendering of portable plans into parameterized SQL.
//!
//! Values never enter the template text: every value becomes a positional
//! placeholder with a matching entry in [`RenderedQuery::params`].

use serde::Serialize;

use crate::angular::RaConstraint;
use crate::plan::{Clause, Column, QueryPlan, Value};

/// Backend-specific SQL syntax.
pub trait SqlDialect {
    /// Placeholder for the parameter at `index` (zero-based).
    fn placeholder(&self, index: usize) -> String;

    /// Operator for an unanchored regular-expression search.
    fn regex_operator(&self) -> &'static str;
}

/// MySQL / MariaDB (`%s` placeholders as used by Python-style drivers).
#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

impl SqlDialect for MySql {
    fn placeholder(&self, _index: usize) -> String {
        "%s".to_string()
    }

    fn regex_operator(&self) -> &'static str {
        "REGEXP"
    }
}

/// PostgreSQL (`$1`, `$2`, … placeholders).
#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn placeholder(&self, index: usize) -> String {
        format!("${}", index + 1)
    }

    fn regex_operator(&self) -> &'static str {
        "~"
    }
}

/// SQL template plus its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

struct Renderer<'a, D: SqlDialect + ?Sized> {
    dialect: &'a D,
    params: Vec<Value>,
}

impl<D: SqlDialect + ?Sized> Renderer<'_, D> {
    fn bind(&mut self, value: Value) -> String {
        let placeholder = self.dialect.placeholder(self.params.len());
        self.params.push(value);
        placeholder
    }

    fn between(&mut self, column: Column, negated: bool, min: f64, max: f64) -> String {
        let low = self.bind(Value::Float(min));
        let high = self.bind(Value::Float(max));
        let not = if negated { "NOT " } else { "" };
        format!("{} {not}BETWEEN {low} AND {high}", column.name())
    }

    fn clause(&mut self, clause: &Clause) -> String {
        match clause {
            Clause::Equals { column, value } => {
                format!("{} = {}", column.name(), self.bind(Value::Text(value.clone())))
            }
            Clause::Matches { column, pattern } => {
                let op = self.dialect.regex_operator();
                format!("{} {op} {}", column.name(), self.bind(Value::Text(pattern.clone())))
            }
            Clause::Like { column, pattern } => {
                format!("{} LIKE {}", column.name(), self.bind(Value::Text(pattern.clone())))
            }
            Clause::In { column, values } => {
                let placeholders: Vec<String> = values
                    .iter()
                    .map(|v| self.bind(Value::Text(v.clone())))
                    .collect();
                format!("{} IN ({})", column.name(), placeholders.join(","))
            }
            Clause::AtLeast { column, value } => {
                format!("{} >= {}", column.name(), self.bind(value.clone()))
            }
            Clause::AtMost { column, value } => {
                format!("{} <= {}", column.name(), self.bind(value.clone()))
            }
            Clause::Cone { sky_box } => {
                let decl = self.between(Column::Decl, false, sky_box.dec_min, sky_box.dec_max);
                match sky_box.ra {
                    RaConstraint::Unbounded => decl,
                    RaConstraint::Within { min, max } => {
                        format!("{decl} AND {}", self.between(Column::Ra, false, min, max))
                    }
                    RaConstraint::Outside { min, max } => {
                        format!("{decl} AND {}", self.between(Column::Ra, true, min, max))
                    }
                }
            }
        }
    }
}

/// Render `plan` as a `SELECT * FROM table WHERE …` statement.
///
/// `table` is trusted configuration, not user input.
pub fn render<D: SqlDialect + ?Sized>(plan: &QueryPlan, table: &str, dialect: &D) -> RenderedQuery {
    let mut renderer = Renderer {
        dialect,
        params: Vec::new(),
    };

    let conditions: Vec<String> = plan.clauses.iter().map(|c| renderer.clause(c)).collect();
    let mut sql = format!("SELECT * FROM {table}");
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    if let Some(limit) = plan.limit {
        let placeholder = renderer.bind(Value::Int(limit));
        sql.push_str(&format!(" LIMIT {placeholder}"));
    }

    RenderedQuery {
        sql,
        params: renderer.params,
    }
}

/// Render with a dialect chosen by name (`mysql` or `postgres`).
pub fn render_named(plan: &QueryPlan, table: &str, dialect: &str) -> Option<RenderedQuery> {
    match dialect.to_ascii_lowercase().as_str() {
        "mysql" | "mariadb" => Some(render(plan, table, &MySql)),
        "postgres" | "postgresql" => Some(render(plan, table, &Postgres)),
        _ => None,
    }
}
