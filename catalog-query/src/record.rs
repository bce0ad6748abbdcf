//! Catalog rows and the public result shape.
//!
//! Backends hand back [`CatalogRow`]s; [`filter_rows`] applies the exact
//! cone check the bounding box could only approximate and projects the
//! survivors into [`CatalogRecord`]s.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::angular::separation_deg;
use crate::filter::ConeConstraint;
use crate::time::{datetime_to_mjd, deserialize_civil, format_civil};

/// One row of the `files` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRow {
    pub id: u64,
    /// Telescope / project name.
    pub project: String,
    #[serde(deserialize_with = "deserialize_civil")]
    pub utc_observed: NaiveDateTime,
    pub target_name: String,
    pub ra: f64,
    pub decl: f64,
    pub center_freq: f64,
    pub file_type: String,
    pub size: u64,
    pub md5sum: String,
    pub url: String,
}

/// Public representation of an observation file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogRecord {
    pub target: String,
    pub telescope: String,
    pub utc: String,
    pub mjd: f64,
    pub ra: f64,
    pub decl: f64,
    pub center_freq: f64,
    pub file_type: String,
    pub size: u64,
    pub md5sum: String,
    pub url: String,
}

impl From<CatalogRow> for CatalogRecord {
    fn from(row: CatalogRow) -> Self {
        Self {
            target: row.target_name,
            telescope: row.project,
            utc: format_civil(&row.utc_observed),
            mjd: datetime_to_mjd(&row.utc_observed),
            ra: row.ra,
            decl: row.decl,
            center_freq: row.center_freq,
            file_type: row.file_type,
            size: row.size,
            md5sum: row.md5sum,
            url: row.url,
        }
    }
}

impl ConeConstraint {
    /// Whether a position lies inside the cone (rim included).
    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        separation_deg(self.ra_deg, self.dec_deg, ra_deg, dec_deg) <= self.radius_deg
    }
}

/// Apply the exact cone check (if any) and project rows, keeping backend order.
pub fn filter_rows(rows: Vec<CatalogRow>, cone: Option<&ConeConstraint>) -> Vec<CatalogRecord> {
    rows.into_iter()
        .filter(|row| cone.is_none_or(|c| c.contains(row.ra, row.decl)))
        .map(CatalogRecord::from)
        .collect()
}
