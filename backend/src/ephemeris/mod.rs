//! Ephemeris provider: apparent position and magnitude of a target at a time.
//!
//! Fixed catalog objects return their stored values. Asteroids are propagated
//! from their osculating elements on every call, so the scan loops go through
//! [`CachedEphemeris`], which memoizes per `(target, instant)`.

mod cache;

pub use cache::CachedEphemeris;

use serde::{Deserialize, Serialize};

use crate::astro::kepler::{self, PropagationError};
use crate::models::{AsteroidRecord, CelestialTarget, ModifiedJulianDate};

/// Apparent place of a target at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ephemeris {
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    /// `None` when the catalog has no usable magnitude.
    pub magnitude: Option<f64>,
}

/// Source of target positions and magnitudes.
///
/// `None` means the ephemeris is missing for that instant; scoring treats the
/// target as absent rather than failing.
pub trait EphemerisProvider {
    fn ephemeris_at(&self, target: &CelestialTarget, t: ModifiedJulianDate) -> Option<Ephemeris>;

    /// `(ra, dec)` in degrees.
    fn sky_coords_at(
        &self,
        target: &CelestialTarget,
        t: ModifiedJulianDate,
    ) -> Option<(qtty::Degrees, qtty::Degrees)> {
        self.ephemeris_at(target, t).map(|e| (e.ra, e.dec))
    }

    fn magnitude_at(&self, target: &CelestialTarget, t: ModifiedJulianDate) -> Option<f64> {
        self.ephemeris_at(target, t).and_then(|e| e.magnitude)
    }
}

/// Uncached provider. Pure function of its inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectEphemeris;

impl DirectEphemeris {
    /// Propagates an asteroid and reports why it failed, for callers that
    /// need to drop the target for the rest of a run.
    pub fn asteroid_ephemeris(
        record: &AsteroidRecord,
        t: ModifiedJulianDate,
    ) -> Result<Ephemeris, PropagationError> {
        let state = kepler::propagate(&record.elements, t)?;
        let magnitude = record.abs_mag.filter(|h| h.is_finite()).map(|h| {
            kepler::hg_magnitude(
                h,
                record.slope_parameter(),
                state.heliocentric_distance,
                state.geocentric_distance,
                state.phase_angle,
            )
        });
        Ok(Ephemeris {
            ra: state.ra,
            dec: state.dec,
            magnitude,
        })
    }
}

impl EphemerisProvider for DirectEphemeris {
    fn ephemeris_at(&self, target: &CelestialTarget, t: ModifiedJulianDate) -> Option<Ephemeris> {
        match target {
            CelestialTarget::Asteroid(record) => match Self::asteroid_ephemeris(record, t) {
                Ok(ephemeris) => Some(ephemeris),
                Err(e) => {
                    log::debug!("No ephemeris for {} at {}: {}", record.identifier, t, e);
                    None
                }
            },
            fixed => {
                let (ra, dec) = fixed.fixed_position()?;
                if !ra.value().is_finite() || !dec.value().is_finite() {
                    return None;
                }
                Some(Ephemeris {
                    ra,
                    dec,
                    magnitude: fixed.fixed_magnitude(),
                })
            }
        }
    }
}
