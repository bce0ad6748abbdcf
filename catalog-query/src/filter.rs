//! Validated representation of a catalog query request.
//!
//! Requests arrive as named string parameters ([`QueryParams`]) and are
//! turned into a typed [`FilterSpec`] exactly once. Everything downstream
//! works with the typed form.

use chrono::NaiveDateTime;
use serde::Deserialize;

use crate::time::mjd_to_datetime;

/// File type that the catalog also stores under the legacy name `data`.
const FITS_FILE_TYPE: &str = "fits";
const LEGACY_FITS_FILE_TYPE: &str = "data";

/// Error type for rejected requests.
///
/// Never fatal: the message is handed back to the caller as-is.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Target is required")]
    MissingTarget,
    #[error("Invalid value for {field}: {value:?} is not a number")]
    NotANumber { field: &'static str, value: String },
    #[error("Invalid value for {field}: {value} is not finite")]
    NotFinite { field: &'static str, value: f64 },
    #[error("Invalid value for limit: {0:?} must be a positive integer")]
    InvalidLimit(String),
    #[error("Invalid value for pos-rad: {0} must not be negative")]
    NegativeRadius(f64),
    #[error("Invalid value for pos-dec: {0} is outside [-90, 90]")]
    DeclinationOutOfRange(f64),
    #[error("pos-ra, pos-dec and pos-rad must be given together")]
    IncompletePosition,
    #[error("Invalid value for {field}: MJD {mjd} is outside the supported date range")]
    TimeOutOfRange { field: &'static str, mjd: f64 },
    #[error("Invalid target pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Raw request parameters, named as in the public query contract.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct QueryParams {
    pub target: Option<String>,
    pub telescopes: Option<String>,
    pub file_types: Option<String>,
    pub pos_ra: Option<String>,
    pub pos_dec: Option<String>,
    pub pos_rad: Option<String>,
    pub time_start: Option<String>,
    pub time_end: Option<String>,
    pub freq_start: Option<String>,
    pub freq_end: Option<String>,
    pub limit: Option<String>,
}

impl QueryParams {
    /// Build parameters from `(name, value)` pairs.
    ///
    /// The first occurrence of a name wins; unknown names are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            let slot = match name.as_ref() {
                "target" => &mut params.target,
                "telescopes" => &mut params.telescopes,
                "file-types" => &mut params.file_types,
                "pos-ra" => &mut params.pos_ra,
                "pos-dec" => &mut params.pos_dec,
                "pos-rad" => &mut params.pos_rad,
                "time-start" => &mut params.time_start,
                "time-end" => &mut params.time_end,
                "freq-start" => &mut params.freq_start,
                "freq-end" => &mut params.freq_end,
                "limit" => &mut params.limit,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        params
    }

    /// Parse a URL query string such as `target=M31&pos-rad=0.5`.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }
}

/// How the target name is matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetPattern {
    /// `!name`: exact match.
    Exact(String),
    /// `/pattern`: regular-expression search.
    Regex(String),
    /// Anything else: substring match; empty matches every target.
    Substring(String),
}

impl TargetPattern {
    /// Decide the match mode from the leading sigil.
    ///
    /// A lone `!` or `/` carries no pattern and is searched for literally.
    pub fn parse(raw: &str) -> Self {
        let mut chars = raw.chars();
        match (chars.next(), chars.as_str()) {
            (Some('!'), rest) if !rest.is_empty() => TargetPattern::Exact(rest.to_string()),
            (Some('/'), rest) if !rest.is_empty() => TargetPattern::Regex(rest.to_string()),
            _ => TargetPattern::Substring(raw.to_string()),
        }
    }
}

/// Cone-search constraint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeConstraint {
    /// Right ascension of the centre, normalized into `[0, 360)`.
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub radius_deg: f64,
}

/// Typed, validated query request.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub target: TargetPattern,
    pub telescopes: Vec<String>,
    pub file_types: Vec<String>,
    pub time_start: Option<NaiveDateTime>,
    pub time_end: Option<NaiveDateTime>,
    pub freq_start: Option<f64>,
    pub freq_end: Option<f64>,
    pub position: Option<ConeConstraint>,
    pub limit: Option<u64>,
}

impl FilterSpec {
    /// A filter with only a target constraint.
    pub fn for_target(raw_target: &str) -> Self {
        Self {
            target: TargetPattern::parse(raw_target),
            telescopes: Vec::new(),
            file_types: Vec::new(),
            time_start: None,
            time_end: None,
            freq_start: None,
            freq_end: None,
            position: None,
            limit: None,
        }
    }

    /// Validate raw request parameters.
    pub fn from_params(params: &QueryParams) -> Result<Self, ValidationError> {
        let raw_target = params
            .target
            .as_deref()
            .ok_or(ValidationError::MissingTarget)?;

        let target = TargetPattern::parse(raw_target);
        if let TargetPattern::Regex(pattern) = &target {
            regex::Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
        }

        let mut file_types = params.file_types.as_deref().map(split_list).unwrap_or_default();
        if file_types.iter().any(|t| t == FITS_FILE_TYPE)
            && !file_types.iter().any(|t| t == LEGACY_FITS_FILE_TYPE)
        {
            file_types.push(LEGACY_FITS_FILE_TYPE.to_string());
        }

        Ok(Self {
            target,
            telescopes: params.telescopes.as_deref().map(split_list).unwrap_or_default(),
            file_types,
            time_start: parse_mjd("time-start", params.time_start.as_deref())?,
            time_end: parse_mjd("time-end", params.time_end.as_deref())?,
            freq_start: parse_float("freq-start", params.freq_start.as_deref())?,
            freq_end: parse_float("freq-end", params.freq_end.as_deref())?,
            position: parse_position(params)?,
            limit: parse_limit(params.limit.as_deref())?,
        })
    }

    /// Number of constraints this filter places on the catalog.
    ///
    /// The target always counts; each time and frequency bound counts on
    /// its own.
    pub fn constraint_count(&self) -> usize {
        1 + usize::from(!self.telescopes.is_empty())
            + usize::from(!self.file_types.is_empty())
            + usize::from(self.position.is_some())
            + usize::from(self.time_start.is_some())
            + usize::from(self.time_end.is_some())
            + usize::from(self.freq_start.is_some())
            + usize::from(self.freq_end.is_some())
    }
}

/// Comma-separated list, trimmed, without empty or repeated entries.
fn split_list(raw: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

fn parse_float(field: &'static str, raw: Option<&str>) -> Result<Option<f64>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        })?;
    if !value.is_finite() {
        return Err(ValidationError::NotFinite { field, value });
    }
    Ok(Some(value))
}

fn parse_mjd(
    field: &'static str,
    raw: Option<&str>,
) -> Result<Option<NaiveDateTime>, ValidationError> {
    match parse_float(field, raw)? {
        Some(mjd) => mjd_to_datetime(mjd)
            .map(Some)
            .ok_or(ValidationError::TimeOutOfRange { field, mjd }),
        None => Ok(None),
    }
}

fn parse_position(params: &QueryParams) -> Result<Option<ConeConstraint>, ValidationError> {
    let ra = parse_float("pos-ra", params.pos_ra.as_deref())?;
    let dec = parse_float("pos-dec", params.pos_dec.as_deref())?;
    let radius = parse_float("pos-rad", params.pos_rad.as_deref())?;

    match (ra, dec, radius) {
        (None, None, None) => Ok(None),
        (Some(ra), Some(dec), Some(radius)) => {
            if !(-90.0..=90.0).contains(&dec) {
                return Err(ValidationError::DeclinationOutOfRange(dec));
            }
            if radius < 0.0 {
                return Err(ValidationError::NegativeRadius(radius));
            }
            Ok(Some(ConeConstraint {
                ra_deg: ra.rem_euclid(360.0),
                dec_deg: dec,
                radius_deg: radius,
            }))
        }
        _ => Err(ValidationError::IncompletePosition),
    }
}

fn parse_limit(raw: Option<&str>) -> Result<Option<u64>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<i64>() {
        Ok(limit) if limit > 0 => Ok(Some(limit as u64)),
        _ => Err(ValidationError::InvalidLimit(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn params(query: &str) -> QueryParams {
        QueryParams::from_query_string(query)
    }

    #[rstest]
    #[case("!M31", TargetPattern::Exact("M31".into()))]
    #[case("/^M3[0-9]$", TargetPattern::Regex("^M3[0-9]$".into()))]
    #[case("M31", TargetPattern::Substring("M31".into()))]
    #[case("", TargetPattern::Substring("".into()))]
    #[case("!", TargetPattern::Substring("!".into()))]
    #[case("/", TargetPattern::Substring("/".into()))]
    fn test_target_sigils(#[case] raw: &str, #[case] expected: TargetPattern) {
        assert_eq!(TargetPattern::parse(raw), expected);
    }

    #[test]
    fn test_missing_target() {
        let err = FilterSpec::from_params(&params("limit=5")).unwrap_err();
        assert_eq!(err, ValidationError::MissingTarget);
        assert_eq!(err.to_string(), "Target is required");
    }

    #[test]
    fn test_empty_target_is_accepted() {
        let spec = FilterSpec::from_params(&params("target=")).unwrap();
        assert_eq!(spec.target, TargetPattern::Substring(String::new()));
        assert_eq!(spec.constraint_count(), 1);
    }

    #[test]
    fn test_fits_implies_data() {
        let spec = FilterSpec::from_params(&params("target=&file-types=fits,h5")).unwrap();
        assert_eq!(spec.file_types, vec!["fits", "h5", "data"]);

        let spec = FilterSpec::from_params(&params("target=&file-types=data,fits")).unwrap();
        assert_eq!(spec.file_types, vec!["data", "fits"]);
    }

    #[test]
    fn test_lists_are_trimmed_and_deduplicated() {
        let spec =
            FilterSpec::from_params(&params("target=&telescopes=GBT, Parkes,,GBT")).unwrap();
        assert_eq!(spec.telescopes, vec!["GBT", "Parkes"]);

        let spec = FilterSpec::from_params(&params("target=&telescopes=,")).unwrap();
        assert!(spec.telescopes.is_empty());
    }

    #[test]
    fn test_position_parsing() {
        let spec =
            FilterSpec::from_params(&params("target=&pos-ra=-10&pos-dec=41.2&pos-rad=0.5")).unwrap();
        let cone = spec.position.unwrap();
        assert_eq!(cone.ra_deg, 350.0);
        assert_eq!(cone.dec_deg, 41.2);
        assert_eq!(cone.radius_deg, 0.5);
    }

    #[rstest]
    #[case("target=&pos-ra=1&pos-dec=2", ValidationError::IncompletePosition)]
    #[case("target=&pos-ra=1&pos-dec=2&pos-rad=-1", ValidationError::NegativeRadius(-1.0))]
    #[case(
        "target=&pos-ra=1&pos-dec=91&pos-rad=1",
        ValidationError::DeclinationOutOfRange(91.0)
    )]
    #[case("target=&limit=0", ValidationError::InvalidLimit("0".into()))]
    #[case("target=&limit=-3", ValidationError::InvalidLimit("-3".into()))]
    #[case("target=&limit=2.5", ValidationError::InvalidLimit("2.5".into()))]
    #[case(
        "target=&freq-start=abc",
        ValidationError::NotANumber { field: "freq-start", value: "abc".into() }
    )]
    #[case(
        "target=&freq-end=inf",
        ValidationError::NotFinite { field: "freq-end", value: f64::INFINITY }
    )]
    #[case(
        "target=&time-start=1e300",
        ValidationError::TimeOutOfRange { field: "time-start", mjd: 1e300 }
    )]
    fn test_rejections(#[case] query: &str, #[case] expected: ValidationError) {
        assert_eq!(FilterSpec::from_params(&params(query)).unwrap_err(), expected);
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = FilterSpec::from_params(&params("target=/M3(1")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { .. }));
    }

    #[test]
    fn test_constraint_count() {
        let spec = FilterSpec::from_params(&params(
            "target=M31&telescopes=GBT&file-types=fits&pos-ra=10&pos-dec=41&pos-rad=1\
             &time-start=58000&time-end=59000&freq-start=1000&freq-end=2000&limit=10",
        ))
        .unwrap();
        assert_eq!(spec.constraint_count(), 8);
        assert_eq!(spec.limit, Some(10));
    }

    #[test]
    fn test_query_string_first_value_wins() {
        let p = params("?target=M31&target=M33&bogus=1&pos-rad=0.25");
        assert_eq!(p.target.as_deref(), Some("M31"));
        assert_eq!(p.pos_rad.as_deref(), Some("0.25"));
    }

    #[test]
    fn test_query_string_decoding() {
        let p = params("target=%21HIP%2099&telescopes=GBT+Parkes");
        assert_eq!(p.target.as_deref(), Some("!HIP 99"));
        assert_eq!(p.telescopes.as_deref(), Some("GBT Parkes"));
    }

    #[test]
    fn test_params_deserialize_kebab_case() {
        let p: QueryParams =
            serde_json::from_str(r#"{"target": "M31", "file-types": "fits", "pos-ra": "1"}"#)
                .unwrap();
        assert_eq!(p.file_types.as_deref(), Some("fits"));
        assert_eq!(p.pos_ra.as_deref(), Some("1"));
    }
}
