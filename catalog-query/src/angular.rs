//! Spherical geometry for cone searches.
//!
//! Two pieces: the great-circle separation used for the exact radius check,
//! and the RA/Dec bounding box that a storage backend can evaluate cheaply
//! before that check runs.
//!
//! All angles are in degrees. Right ascension lives in `[0, 360)` and
//! declination in `[-90, 90]`.

use serde::Serialize;

/// Angular separation between two sky positions, in degrees.
///
/// Uses the Vincenty formulation (`atan2` of the chord components), which
/// stays well conditioned for coincident and antipodal points where the
/// plain law of cosines loses precision.
pub fn separation_deg(ra1_deg: f64, dec1_deg: f64, ra2_deg: f64, dec2_deg: f64) -> f64 {
    let (sin_dec1, cos_dec1) = dec1_deg.to_radians().sin_cos();
    let (sin_dec2, cos_dec2) = dec2_deg.to_radians().sin_cos();
    let (sin_dra, cos_dra) = (ra2_deg - ra1_deg).to_radians().sin_cos();

    let num = ((cos_dec2 * sin_dra).powi(2)
        + (cos_dec1 * sin_dec2 - sin_dec1 * cos_dec2 * cos_dra).powi(2))
    .sqrt();
    let den = sin_dec1 * sin_dec2 + cos_dec1 * cos_dec2 * cos_dra;

    num.atan2(den).to_degrees()
}

/// Right-ascension part of a cone bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RaConstraint {
    /// Every right ascension is possible; no RA clause is emitted.
    Unbounded,
    /// `min <= ra <= max`, with `0 <= min < max < 360`.
    Within { min: f64, max: f64 },
    /// The box crosses RA 0°: `ra < min || ra > max`, i.e. everything
    /// outside the closed arc `[min, max]`.
    Outside { min: f64, max: f64 },
}

impl RaConstraint {
    /// Whether a right ascension (already in `[0, 360)`) satisfies the constraint.
    pub fn contains(&self, ra_deg: f64) -> bool {
        match *self {
            RaConstraint::Unbounded => true,
            RaConstraint::Within { min, max } => ra_deg >= min && ra_deg <= max,
            RaConstraint::Outside { min, max } => ra_deg < min || ra_deg > max,
        }
    }
}

/// Rectangular RA/Dec region that contains a cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SkyBox {
    pub dec_min: f64,
    pub dec_max: f64,
    pub ra: RaConstraint,
}

impl SkyBox {
    pub fn contains(&self, ra_deg: f64, dec_deg: f64) -> bool {
        dec_deg >= self.dec_min && dec_deg <= self.dec_max && self.ra.contains(ra_deg)
    }
}

/// Bounding box of the cone of `radius_deg` around (`ra_deg`, `dec_deg`).
///
/// The declination band is clipped to the poles. The RA half-width grows as
/// `asin(sin r / cos dec)` toward the poles; once the cone reaches a pole
/// every RA is possible and the RA constraint is dropped. A box crossing
/// RA 0° is expressed as the exclusion of its complementary arc.
///
/// The box is a necessary condition only: it may include points outside the
/// cone, never the reverse.
pub fn bounding_box(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> SkyBox {
    let dec_min = (dec_deg - radius_deg).max(-90.0);
    let dec_max = (dec_deg + radius_deg).min(90.0);

    SkyBox {
        dec_min,
        dec_max,
        ra: ra_constraint(ra_deg, dec_deg, radius_deg),
    }
}

fn ra_constraint(ra_deg: f64, dec_deg: f64, radius_deg: f64) -> RaConstraint {
    if dec_deg.abs() + radius_deg >= 90.0 {
        return RaConstraint::Unbounded;
    }

    let half_width = ra_half_width(dec_deg, radius_deg);
    ra_interval(ra_deg - half_width, ra_deg + half_width)
}

/// RA constraint for the closed interval `[ra_min, ra_max]` before wrapping.
///
/// Stored right ascensions live in `[0, 360)`, so an interval reaching 360
/// also has to admit RA 0 and is treated as wrapped. The excluded arc is
/// open: its bounds are pulled in by one ulp so that `NOT BETWEEN` keeps the
/// box edges.
fn ra_interval(ra_min: f64, ra_max: f64) -> RaConstraint {
    if ra_max - ra_min >= 360.0 {
        RaConstraint::Unbounded
    } else if ra_min < 0.0 || ra_max >= 360.0 {
        // Wrapped bounds: the box is [low, 360) ∪ [0, high].
        let low = ra_min.rem_euclid(360.0);
        let high = ra_max.rem_euclid(360.0);
        RaConstraint::Outside {
            min: next_up(high),
            max: next_down(low),
        }
    } else {
        RaConstraint::Within {
            min: ra_min,
            max: ra_max,
        }
    }
}

/// Smallest float above a non-negative `x`.
fn next_up(x: f64) -> f64 {
    if x == 0.0 {
        f64::from_bits(1)
    } else {
        f64::from_bits(x.to_bits() + 1)
    }
}

/// Largest float below a positive `x`.
fn next_down(x: f64) -> f64 {
    if x > 0.0 {
        f64::from_bits(x.to_bits() - 1)
    } else {
        x
    }
}

/// Largest RA offset of any point of the cone, for a cone that does not
/// contain a pole (`|dec| + r < 90`).
fn ra_half_width(dec_deg: f64, radius_deg: f64) -> f64 {
    let ratio = radius_deg.to_radians().sin() / dec_deg.to_radians().cos();
    ratio.clamp(-1.0, 1.0).asin().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_separation_same_point() {
        assert_relative_eq!(separation_deg(123.4, -45.6, 123.4, -45.6), 0.0, epsilon = 1e-12);
        assert_relative_eq!(separation_deg(0.0, 90.0, 180.0, 90.0), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_separation_quarter_circle() {
        assert_relative_eq!(separation_deg(0.0, 0.0, 90.0, 0.0), 90.0, epsilon = 1e-10);
        assert_relative_eq!(separation_deg(0.0, 90.0, 0.0, 0.0), 90.0, epsilon = 1e-10);
    }

    #[test]
    fn test_separation_antipodes() {
        assert_relative_eq!(separation_deg(0.0, 0.0, 180.0, 0.0), 180.0, epsilon = 1e-10);
        assert_relative_eq!(separation_deg(10.0, 30.0, 190.0, -30.0), 180.0, epsilon = 1e-10);
    }

    #[test]
    fn test_separation_across_ra_zero() {
        assert_relative_eq!(separation_deg(359.0, 0.0, 1.0, 0.0), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_separation_tiny_angle() {
        // One arcsecond along the equator
        let arcsec = 1.0 / 3600.0;
        assert_relative_eq!(separation_deg(10.0, 0.0, 10.0 + arcsec, 0.0), arcsec, epsilon = 1e-12);
    }

    #[rstest]
    #[case(10.0, 20.0, 200.0, -10.0)]
    #[case(359.5, 89.0, 0.5, 88.0)]
    #[case(45.0, -60.0, 300.0, 15.0)]
    fn test_separation_symmetric(
        #[case] ra1: f64,
        #[case] dec1: f64,
        #[case] ra2: f64,
        #[case] dec2: f64,
    ) {
        assert_relative_eq!(
            separation_deg(ra1, dec1, ra2, dec2),
            separation_deg(ra2, dec2, ra1, dec1),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_box_wraps_above_360() {
        let bbox = bounding_box(350.0, 0.0, 20.0);
        assert_relative_eq!(bbox.dec_min, -20.0);
        assert_relative_eq!(bbox.dec_max, 20.0);
        match bbox.ra {
            RaConstraint::Outside { min, max } => {
                assert_relative_eq!(min, 10.0, epsilon = 1e-9);
                assert_relative_eq!(max, 330.0, epsilon = 1e-9);
            }
            other => panic!("expected wrapped RA constraint, got {other:?}"),
        }
        assert!(bbox.ra.contains(340.0));
        assert!(bbox.ra.contains(5.0));
        assert!(!bbox.ra.contains(180.0));
    }

    #[test]
    fn test_box_wraps_below_zero() {
        let bbox = bounding_box(5.0, 0.0, 20.0);
        match bbox.ra {
            RaConstraint::Outside { min, max } => {
                assert_relative_eq!(min, 25.0, epsilon = 1e-9);
                assert_relative_eq!(max, 345.0, epsilon = 1e-9);
            }
            other => panic!("expected wrapped RA constraint, got {other:?}"),
        }
    }

    #[rstest]
    #[case(30.0, 20.0, 10.0, 50.0)]
    #[case(15.0, 10.0, 5.0, 25.0)]
    #[case(180.0, 1.0, 179.0, 181.0)]
    fn test_box_without_wrap(
        #[case] ra: f64,
        #[case] radius: f64,
        #[case] expected_min: f64,
        #[case] expected_max: f64,
    ) {
        match bounding_box(ra, 0.0, radius).ra {
            RaConstraint::Within { min, max } => {
                assert_relative_eq!(min, expected_min, epsilon = 1e-9);
                assert_relative_eq!(max, expected_max, epsilon = 1e-9);
            }
            other => panic!("expected inclusive RA constraint, got {other:?}"),
        }
    }

    #[test]
    fn test_interval_ending_at_360_admits_ra_zero() {
        let ra = ra_interval(340.0, 360.0);
        assert!(matches!(ra, RaConstraint::Outside { .. }));
        assert!(ra.contains(0.0));
        assert!(ra.contains(340.0));
        assert!(ra.contains(359.9));
        assert!(!ra.contains(339.9));
        assert!(!ra.contains(1e-6));
        assert!(!ra.contains(180.0));
    }

    #[test]
    fn test_wrapped_interval_keeps_its_edges() {
        let ra = ra_interval(330.0, 370.0);
        assert!(ra.contains(330.0));
        assert!(ra.contains(10.0));
        assert!(!ra.contains(10.000_001));
        assert!(!ra.contains(329.999_999));

        let ra = ra_interval(-25.0, 35.0);
        assert!(ra.contains(335.0));
        assert!(ra.contains(35.0));
        assert!(ra.contains(0.0));
    }

    #[test]
    fn test_interval_starting_at_zero_stays_inclusive() {
        assert_eq!(
            ra_interval(0.0, 20.0),
            RaConstraint::Within { min: 0.0, max: 20.0 }
        );
    }

    #[test]
    fn test_box_full_sky() {
        let bbox = bounding_box(123.0, 10.0, 180.0);
        assert_eq!(bbox.ra, RaConstraint::Unbounded);
        assert_relative_eq!(bbox.dec_min, -90.0);
        assert_relative_eq!(bbox.dec_max, 90.0);
    }

    #[test]
    fn test_box_touching_pole_drops_ra() {
        let bbox = bounding_box(200.0, 80.0, 15.0);
        assert_eq!(bbox.ra, RaConstraint::Unbounded);
        assert_relative_eq!(bbox.dec_min, 65.0);
        assert_relative_eq!(bbox.dec_max, 90.0);
    }

    #[test]
    fn test_box_widens_toward_pole() {
        let equator = bounding_box(100.0, 0.0, 5.0);
        let high = bounding_box(100.0, 60.0, 5.0);
        let width = |c: RaConstraint| match c {
            RaConstraint::Within { min, max } => max - min,
            other => panic!("unexpected {other:?}"),
        };
        assert!(width(high.ra) > 1.9 * width(equator.ra));
    }

    #[test]
    fn test_box_contains_cone_samples() {
        // Points on the rim of the cone must all lie inside the box.
        let (ra0, dec0, radius) = (2.0, 55.0, 12.0);
        let bbox = bounding_box(ra0, dec0, radius);

        for step in 0..360 {
            let bearing = (step as f64).to_radians();
            let (sin_d, cos_d) = dec0.to_radians().sin_cos();
            let (sin_r, cos_r) = (radius * 0.999_999).to_radians().sin_cos();
            let dec = (sin_d * cos_r + cos_d * sin_r * bearing.cos()).asin();
            let dra = (bearing.sin() * sin_r * cos_d).atan2(cos_r - sin_d * dec.sin());
            let ra = (ra0 + dra.to_degrees()).rem_euclid(360.0);
            assert!(
                bbox.contains(ra, dec.to_degrees()),
                "rim point ({ra}, {}) escaped {bbox:?}",
                dec.to_degrees()
            );
        }
    }
}
