//! In-memory catalog backed by a CSV dump of the `files` table.
//!
//! Evaluates portable plans directly instead of going through SQL. Matching
//! follows MySQL defaults where they differ from plain string comparison:
//! `LIKE` is case-insensitive, `REGEXP` is an unanchored search, and time
//! bounds compare civil-time strings.

use std::borrow::Cow;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use regex::{Regex, RegexBuilder};
use tracing::info;

use super::{BackendError, CatalogBackend};
use crate::angular::SkyBox;
use crate::plan::{Clause, Column, QueryPlan, Value};
use crate::record::CatalogRow;
use crate::time::format_civil;

/// Catalog held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    rows: Vec<CatalogRow>,
}

impl MemoryCatalog {
    pub fn from_rows(rows: Vec<CatalogRow>) -> Self {
        Self { rows }
    }

    /// Load a CSV file whose header names the `files` table columns.
    pub fn load_csv(path: impl AsRef<Path>) -> Result<Self, BackendError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let catalog = Self::from_csv_reader(file)?;
        info!("Loaded {} catalog rows from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, BackendError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows = csv_reader
            .deserialize::<CatalogRow>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn distinct<F>(&self, field: F) -> Vec<String>
    where
        F: Fn(&CatalogRow) -> &str,
    {
        let mut seen: Vec<String> = Vec::new();
        for row in &self.rows {
            let value = field(row);
            if !seen.iter().any(|s| s == value) {
                seen.push(value.to_string());
            }
        }
        seen
    }
}

impl CatalogBackend for MemoryCatalog {
    fn execute(&self, plan: &QueryPlan) -> Result<Vec<CatalogRow>, BackendError> {
        let predicates = plan
            .clauses
            .iter()
            .map(Predicate::compile)
            .collect::<Result<Vec<_>, _>>()?;

        let matching = self
            .rows
            .iter()
            .filter(|row| predicates.iter().all(|p| p.matches(row)))
            .cloned();

        Ok(match plan.limit {
            Some(limit) => matching.take(usize::try_from(limit).unwrap_or(usize::MAX)).collect(),
            None => matching.collect(),
        })
    }

    fn distinct_targets(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.distinct(|row| row.target_name.as_str()))
    }

    fn distinct_telescopes(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.distinct(|row| row.project.as_str()))
    }

    fn distinct_file_types(&self) -> Result<Vec<String>, BackendError> {
        Ok(self.distinct(|row| row.file_type.as_str()))
    }
}

/// A clause compiled for row-by-row evaluation.
enum Predicate {
    Equals(Column, String),
    Regex(Column, Regex),
    In(Column, Vec<String>),
    TextBound { column: Column, bound: String, lower: bool },
    NumberBound { column: Column, bound: f64, lower: bool },
    Cone(SkyBox),
}

impl Predicate {
    fn compile(clause: &Clause) -> Result<Self, BackendError> {
        Ok(match clause {
            Clause::Equals { column, value } => {
                Predicate::Equals(text_column(*column)?, value.clone())
            }
            Clause::Matches { column, pattern } => {
                Predicate::Regex(text_column(*column)?, build_regex(pattern, pattern, false)?)
            }
            Clause::Like { column, pattern } => {
                let translated = like_to_regex(pattern);
                Predicate::Regex(text_column(*column)?, build_regex(pattern, &translated, true)?)
            }
            Clause::In { column, values } => Predicate::In(text_column(*column)?, values.clone()),
            Clause::AtLeast { column, value } => bound(*column, value, true)?,
            Clause::AtMost { column, value } => bound(*column, value, false)?,
            Clause::Cone { sky_box } => Predicate::Cone(*sky_box),
        })
    }

    fn matches(&self, row: &CatalogRow) -> bool {
        match self {
            Predicate::Equals(column, value) => text_value(row, *column) == value.as_str(),
            Predicate::Regex(column, regex) => regex.is_match(&text_value(row, *column)),
            Predicate::In(column, values) => {
                let text = text_value(row, *column);
                values.iter().any(|v| v.as_str() == text)
            }
            Predicate::TextBound {
                column,
                bound,
                lower,
            } => {
                let text = text_value(row, *column);
                if *lower {
                    text.as_ref() >= bound.as_str()
                } else {
                    text.as_ref() <= bound.as_str()
                }
            }
            Predicate::NumberBound {
                column,
                bound,
                lower,
            } => {
                let value = number_value(row, *column);
                if *lower {
                    value >= *bound
                } else {
                    value <= *bound
                }
            }
            Predicate::Cone(sky_box) => sky_box.contains(row.ra, row.decl),
        }
    }
}

fn is_numeric(column: Column) -> bool {
    matches!(column, Column::Ra | Column::Decl | Column::CenterFreq)
}

fn text_column(column: Column) -> Result<Column, BackendError> {
    if is_numeric(column) {
        Err(BackendError::Execution(format!(
            "column {} does not hold text",
            column.name()
        )))
    } else {
        Ok(column)
    }
}

fn bound(column: Column, value: &Value, lower: bool) -> Result<Predicate, BackendError> {
    let number = match value {
        Value::Text(text) => {
            return Ok(Predicate::TextBound {
                column: text_column(column)?,
                bound: text.clone(),
                lower,
            })
        }
        Value::Float(x) => *x,
        Value::Int(n) => *n as f64,
    };
    if !is_numeric(column) {
        return Err(BackendError::Execution(format!(
            "column {} cannot be compared with {value}",
            column.name()
        )));
    }
    Ok(Predicate::NumberBound {
        column,
        bound: number,
        lower,
    })
}

fn text_value(row: &CatalogRow, column: Column) -> Cow<'_, str> {
    match column {
        Column::TargetName => Cow::Borrowed(&row.target_name),
        Column::Project => Cow::Borrowed(&row.project),
        Column::FileType => Cow::Borrowed(&row.file_type),
        Column::UtcObserved => Cow::Owned(format_civil(&row.utc_observed)),
        Column::Ra | Column::Decl | Column::CenterFreq => {
            Cow::Owned(number_value(row, column).to_string())
        }
    }
}

fn number_value(row: &CatalogRow, column: Column) -> f64 {
    match column {
        Column::Ra => row.ra,
        Column::Decl => row.decl,
        Column::CenterFreq => row.center_freq,
        _ => f64::NAN,
    }
}

fn build_regex(original: &str, pattern: &str, case_insensitive: bool) -> Result<Regex, BackendError> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| BackendError::InvalidPattern {
            pattern: original.to_string(),
            reason: e.to_string(),
        })
}

/// Translate a SQL `LIKE` pattern into an anchored regex.
///
/// `%` matches any run of characters, `_` exactly one, and a backslash
/// escapes the next character.
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push_str("(?s)^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterSpec, QueryParams};
    use crate::plan::plan;

    const CSV: &str = "\
id,project,utc_observed,target_name,ra,decl,center_freq,file_type,size,md5sum,url
1,GBT,2019-06-01 10:00:00,M31,10.68,41.27,1420.0,fits,100,aaa,http://x/1
2,Parkes,2019-07-01 10:00:00,M31_OFF,10.9,41.5,1400.0,data,200,bbb,http://x/2
3,GBT,2020-01-01 00:00:00,HIP 1234,355.0,-5.0,8000.0,h5,300,ccc,http://x/3
4,GBT,2020-06-01 00:00:00,m33,23.46,30.66,1500.0,fil,400,ddd,http://x/4
";

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::from_csv_reader(CSV.as_bytes()).unwrap()
    }

    fn ids(query: &str) -> Vec<u64> {
        let spec = FilterSpec::from_params(&QueryParams::from_query_string(query)).unwrap();
        catalog()
            .execute(&plan(&spec))
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect()
    }

    #[test]
    fn test_loads_csv() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);
        assert_eq!(
            catalog.distinct_telescopes().unwrap(),
            vec!["GBT".to_string(), "Parkes".to_string()]
        );
        assert_eq!(catalog.distinct_targets().unwrap().len(), 4);
    }

    #[test]
    fn test_target_modes() {
        assert_eq!(ids("target="), vec![1, 2, 3, 4]);
        assert_eq!(ids("target=M3"), vec![1, 2, 4]);
        assert_eq!(ids("target=!M31"), vec![1]);
        assert_eq!(ids("target=/_OFF$"), vec![2]);
        assert_eq!(ids("target=/^HIP"), vec![3]);
    }

    #[test]
    fn test_in_and_fits_synonym() {
        assert_eq!(ids("target=&file-types=fits"), vec![1, 2]);
        assert_eq!(ids("target=&telescopes=Parkes"), vec![2]);
    }

    #[test]
    fn test_time_and_frequency_bounds() {
        assert_eq!(ids("target=&time-start=58849"), vec![3, 4]);
        assert_eq!(ids("target=&time-end=58849"), vec![1, 2, 3]);
        assert_eq!(ids("target=&freq-start=1410&freq-end=2000"), vec![1, 4]);
    }

    #[test]
    fn test_cone_box_across_ra_zero() {
        assert_eq!(ids("target=&pos-ra=5&pos-dec=0&pos-rad=20"), vec![3]);
    }

    #[test]
    fn test_limit() {
        assert_eq!(ids("target=&limit=2"), vec![1, 2]);
    }

    #[test]
    fn test_like_translation() {
        assert_eq!(like_to_regex("%M_1%"), "(?s)^.*M.1.*$");
        assert_eq!(like_to_regex(r"50\%"), "(?s)^50%$");
        assert_eq!(like_to_regex("a.b"), r"(?s)^a\.b$");
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let plan = QueryPlan {
            clauses: vec![Clause::AtLeast {
                column: Column::TargetName,
                value: Value::Float(1.0),
            }],
            limit: None,
            cone: None,
        };
        assert!(matches!(
            catalog().execute(&plan),
            Err(BackendError::Execution(_))
        ));
    }

    #[test]
    fn test_malformed_csv() {
        let err = MemoryCatalog::from_csv_reader("id,project\nnot-a-number,GBT\n".as_bytes())
            .unwrap_err();
        assert!(matches!(err, BackendError::Parse(_)));
    }
}
