//! Difficulty model.
//!
//! Every function returns a non-negative factor; 0 means "cannot be observed".

use crate::models::{CeuParameters, ModifiedJulianDate};

/// Magnitudes brighter than `limit - STELLAR_RAMP_SPAN` follow the linear ramp.
pub const STELLAR_RAMP_SPAN: f64 = 6.0;
/// Flat difficulty for point sources comfortably within reach.
pub const STELLAR_FLAT_DIFFICULTY: f64 = 3.0;

/// Relative detection difficulty of diffuse versus point sources.
pub const EXTENDED_OBJECT_FACTOR: f64 = 1.5;
/// Width of the magnitude window in which extended sources score.
pub const DSO_MAGNITUDE_WINDOW: f64 = 15.0;
pub const DSO_MAX_DIFFICULTY: f64 = 5.0;

/// Default altitude below which targets are treated as unobservable.
pub const DEFAULT_MIN_ALTITUDE_DEG: f64 = 20.0;
/// Default CEU the uncertainty factor is tuned around (arcsec).
pub const DEFAULT_TARGET_CEU_ARCSEC: f64 = 5.0;
/// CEU assumed for asteroids without uncertainty bookkeeping (arcsec).
pub const DEFAULT_MISSING_CEU_ARCSEC: f64 = 500.0;

/// Point-source difficulty for a magnitude against a limiting magnitude.
///
/// # Arguments
/// * `mag` - Apparent magnitude of the target
/// * `limiting_mag` - Faintest magnitude the observer can detect
///
/// # Returns
/// * `0.0` when the target is fainter than the limit
/// * `mag / (limiting_mag - 6)`, floored at 0, when brighter than `limiting_mag - 6`
/// * `3.0` otherwise
pub fn limiting_stellar_magnitude_difficulty(mag: f64, limiting_mag: f64) -> f64 {
    if !mag.is_finite() || !limiting_mag.is_finite() || mag > limiting_mag {
        return 0.0;
    }

    let ramp_threshold = limiting_mag - STELLAR_RAMP_SPAN;
    if mag < ramp_threshold {
        if ramp_threshold > 0.0 {
            (mag / ramp_threshold).max(0.0)
        } else {
            0.0
        }
    } else {
        STELLAR_FLAT_DIFFICULTY
    }
}

/// Extended-source difficulty.
///
/// The limiting magnitude is tightened by [`EXTENDED_OBJECT_FACTOR`] (in flux),
/// then difficulty ramps linearly from 0 at `effective - 15` to 5 at the
/// effective limit. Outside that window the object does not score.
pub fn limiting_dso_magnitude_difficulty(mag: f64, limiting_mag: f64) -> f64 {
    if !mag.is_finite() || !limiting_mag.is_finite() {
        return 0.0;
    }

    let effective = limiting_mag - 2.5 * EXTENDED_OBJECT_FACTOR.log10();
    let floor = effective - DSO_MAGNITUDE_WINDOW;
    if mag > effective || mag < floor {
        return 0.0;
    }
    (DSO_MAX_DIFFICULTY * (mag - floor) / DSO_MAGNITUDE_WINDOW).clamp(0.0, DSO_MAX_DIFFICULTY)
}

/// Zenith (airmass proxy) difficulty: `sin²(alt)`, or 0 below `min_altitude`.
pub fn zenith_difficulty(altitude: qtty::Degrees, min_altitude: qtty::Degrees) -> f64 {
    let alt = altitude.value();
    if !alt.is_finite() || alt < min_altitude.value() {
        return 0.0;
    }
    let s = alt.to_radians().sin();
    s * s
}

/// Current ephemeris uncertainty at `t`, linearly extrapolated and floored at 0.
///
/// Any missing field yields `missing_default`.
pub fn ceu_at(
    ceu: &CeuParameters,
    t: ModifiedJulianDate,
    missing_default: qtty::Arcseconds,
) -> qtty::Arcseconds {
    match (ceu.ceu, ceu.rate, ceu.date) {
        (Some(value), Some(rate), Some(date)) => {
            let extrapolated = value.value() + rate * t.days_since(date).value();
            // f64::max drops NaN, so the result is never negative nor NaN.
            qtty::Arcseconds::new(extrapolated.max(0.0))
        }
        _ => missing_default,
    }
}

/// Uncertainty factor in `[0, 1]`, peaking when `ceu == target`.
///
/// With `x = ceu / target`: `√x` below the target, `1 / (1 + ln x)²` above.
pub fn ceu_difficulty(ceu: qtty::Arcseconds, target: qtty::Arcseconds) -> f64 {
    let target = target.value();
    if !target.is_finite() || target <= 0.0 {
        return 0.0;
    }
    let x = ceu.value() / target;
    if !x.is_finite() || x <= 0.0 {
        return 0.0;
    }
    if x <= 1.0 {
        x.sqrt()
    } else {
        let d = 1.0 + x.ln();
        1.0 / (d * d)
    }
}
