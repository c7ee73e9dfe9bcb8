//! Rise, transit and set times of a sky position.

use serde::{Deserialize, Serialize};

use crate::models::{ModifiedJulianDate, Observer};

use super::coords::hour_angle_rad;

/// Rotation of the sky in radians per mean solar day, matching the GMST
/// polynomial in [`super::coords::gmst_rad`].
const SIDEREAL_RATE_RAD_PER_DAY: f64 = 360.985_647_366_29 * std::f64::consts::PI / 180.0;

/// Horizon crossing behaviour of a position at a given site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    RisesAndSets,
    /// Always above the horizon.
    Circumpolar,
    NeverRises,
}

/// Horizon crossings around the meridian transit nearest to a reference time.
///
/// `rise` and `set` are `None` unless `visibility` is
/// [`Visibility::RisesAndSets`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiseTransitSet {
    pub rise: Option<ModifiedJulianDate>,
    pub transit: ModifiedJulianDate,
    pub set: Option<ModifiedJulianDate>,
    pub visibility: Visibility,
}

/// Computes horizon crossings for `(ra, dec)` at `horizon` altitude.
///
/// The transit is the upper culmination nearest to `reference`; rise and set
/// bracket that transit.
pub fn rise_transit_set(
    ra: qtty::Degrees,
    dec: qtty::Degrees,
    observer: &Observer,
    reference: ModifiedJulianDate,
    horizon: qtty::Degrees,
) -> RiseTransitSet {
    let ha = hour_angle_rad(ra, reference, observer);
    let transit = reference.add_days(-ha / SIDEREAL_RATE_RAD_PER_DAY);

    let phi = observer.latitude.value().to_radians();
    let delta = dec.value().to_radians();
    let h0 = horizon.value().to_radians();
    let denominator = phi.cos() * delta.cos();

    let cos_h0 = if denominator.abs() < 1e-12 {
        // At a pole (or for a polar target) altitude never changes.
        let altitude = (phi.sin() * delta.sin()).asin();
        if altitude >= h0 {
            -2.0
        } else {
            2.0
        }
    } else {
        (h0.sin() - phi.sin() * delta.sin()) / denominator
    };

    if cos_h0 > 1.0 {
        return RiseTransitSet {
            rise: None,
            transit,
            set: None,
            visibility: Visibility::NeverRises,
        };
    }
    if cos_h0 < -1.0 {
        return RiseTransitSet {
            rise: None,
            transit,
            set: None,
            visibility: Visibility::Circumpolar,
        };
    }

    let half_arc_days = cos_h0.acos() / SIDEREAL_RATE_RAD_PER_DAY;
    RiseTransitSet {
        rise: Some(transit.add_days(-half_arc_days)),
        transit,
        set: Some(transit.add_days(half_arc_days)),
        visibility: Visibility::RisesAndSets,
    }
}
