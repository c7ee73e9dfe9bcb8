//! Two-body propagation of minor-planet orbital elements.
//!
//! Elements are osculating, J2000 ecliptic, heliocentric. Earth is placed with
//! the low-precision solar coordinates of the Astronomical Almanac, which is
//! consistent with the accuracy of unperturbed Keplerian motion.

use std::f64::consts::{PI, TAU};

use crate::models::{ModifiedJulianDate, OrbitalElements};

use super::coords::J2000_JD;

/// Gaussian gravitational constant (rad/day for a = 1 AU).
pub const GAUSSIAN_GRAVITATIONAL_CONSTANT: f64 = 0.017_202_098_95;

/// Mean obliquity of the ecliptic at J2000.
pub const J2000_OBLIQUITY_DEG: f64 = 23.439_281;

const MAX_KEPLER_ITERATIONS: usize = 50;
const KEPLER_TOLERANCE: f64 = 1e-12;

/// Why an orbit could not be propagated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PropagationError {
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),

    #[error("Orbit is not bound (e = {eccentricity}, a = {semi_major_axis})")]
    Unbound {
        eccentricity: f64,
        semi_major_axis: f64,
    },

    #[error(
        "Kepler's equation did not converge after {iterations} iterations \
         (M = {mean_anomaly}, e = {eccentricity})"
    )]
    NoConvergence {
        iterations: usize,
        mean_anomaly: f64,
        eccentricity: f64,
    },
}

/// Apparent geocentric state of a propagated body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsteroidState {
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    /// Sun-body distance (AU).
    pub heliocentric_distance: f64,
    /// Earth-body distance (AU).
    pub geocentric_distance: f64,
    /// Sun-body-Earth angle.
    pub phase_angle: qtty::Degrees,
}

/// Solves `E - e sin E = M` by Newton iteration. `mean_anomaly` in radians.
pub fn solve_kepler(mean_anomaly: f64, eccentricity: f64) -> Result<f64, PropagationError> {
    let m = mean_anomaly.rem_euclid(TAU);
    let mut ea = if eccentricity < 0.8 { m } else { PI };

    for _ in 0..MAX_KEPLER_ITERATIONS {
        let delta = (ea - eccentricity * ea.sin() - m) / (1.0 - eccentricity * ea.cos());
        ea -= delta;
        if !ea.is_finite() {
            break;
        }
        if delta.abs() < KEPLER_TOLERANCE {
            return Ok(ea);
        }
    }

    Err(PropagationError::NoConvergence {
        iterations: MAX_KEPLER_ITERATIONS,
        mean_anomaly: m,
        eccentricity,
    })
}

/// Heliocentric ecliptic J2000 position (AU) of the body at `t`.
pub fn heliocentric_position(
    elements: &OrbitalElements,
    t: ModifiedJulianDate,
) -> Result<[f64; 3], PropagationError> {
    if !elements.is_bound() {
        if elements.eccentricity.is_finite() && elements.semi_major_axis.is_finite() {
            return Err(PropagationError::Unbound {
                eccentricity: elements.eccentricity,
                semi_major_axis: elements.semi_major_axis,
            });
        }
        return Err(PropagationError::InvalidElements(
            "non-finite element".to_string(),
        ));
    }
    if !t.value().is_finite() {
        return Err(PropagationError::InvalidElements(
            "non-finite epoch of evaluation".to_string(),
        ));
    }

    let a = elements.semi_major_axis;
    let e = elements.eccentricity;
    let mean_motion = GAUSSIAN_GRAVITATIONAL_CONSTANT / a.powf(1.5);
    let dt = t.days_since(elements.epoch).value();
    let m = elements.mean_anomaly.value().to_radians() + mean_motion * dt;
    let ea = solve_kepler(m, e)?;

    let x_orb = a * (ea.cos() - e);
    let y_orb = a * (1.0 - e * e).sqrt() * ea.sin();

    let (sin_w, cos_w) = elements.arg_perihelion.value().to_radians().sin_cos();
    let (sin_om, cos_om) = elements.lon_ascending_node.value().to_radians().sin_cos();
    let (sin_i, cos_i) = elements.inclination.value().to_radians().sin_cos();

    let x = (cos_om * cos_w - sin_om * sin_w * cos_i) * x_orb
        + (-cos_om * sin_w - sin_om * cos_w * cos_i) * y_orb;
    let y = (sin_om * cos_w + cos_om * sin_w * cos_i) * x_orb
        + (-sin_om * sin_w + cos_om * cos_w * cos_i) * y_orb;
    let z = (sin_w * sin_i) * x_orb + (cos_w * sin_i) * y_orb;

    Ok([x, y, z])
}

/// Geocentric ecliptic position of the Sun (AU) at `t`.
pub fn sun_geocentric_position(t: ModifiedJulianDate) -> [f64; 3] {
    let n = t.julian_date() - J2000_JD;
    let mean_longitude = (280.460 + 0.985_647_4 * n).to_radians();
    let g = (357.528 + 0.985_600_3 * n).to_radians();
    let lambda = mean_longitude
        + (1.915f64.to_radians()) * g.sin()
        + (0.020f64.to_radians()) * (2.0 * g).sin();
    let r = 1.000_14 - 0.016_71 * g.cos() - 0.000_14 * (2.0 * g).cos();
    [r * lambda.cos(), r * lambda.sin(), 0.0]
}

/// Rotates an ecliptic J2000 vector into the equatorial frame and returns
/// `(ra, dec)`.
pub fn ecliptic_to_equatorial(v: [f64; 3]) -> (qtty::Degrees, qtty::Degrees) {
    let (sin_eps, cos_eps) = J2000_OBLIQUITY_DEG.to_radians().sin_cos();
    let x = v[0];
    let y = v[1] * cos_eps - v[2] * sin_eps;
    let z = v[1] * sin_eps + v[2] * cos_eps;
    let r = (x * x + y * y + z * z).sqrt();
    let ra = y.atan2(x).rem_euclid(TAU);
    let dec = if r > 0.0 { (z / r).clamp(-1.0, 1.0).asin() } else { 0.0 };
    (
        qtty::Degrees::new(ra.to_degrees()),
        qtty::Degrees::new(dec.to_degrees()),
    )
}

/// Propagates `elements` to `t` and returns the geocentric apparent state.
pub fn propagate(
    elements: &OrbitalElements,
    t: ModifiedJulianDate,
) -> Result<AsteroidState, PropagationError> {
    let helio = heliocentric_position(elements, t)?;
    let sun = sun_geocentric_position(t);
    let geo = [helio[0] + sun[0], helio[1] + sun[1], helio[2] + sun[2]];

    let r = norm(helio);
    let delta = norm(geo);
    if r <= 0.0 || delta <= 0.0 {
        return Err(PropagationError::InvalidElements(
            "body coincides with the Sun or the Earth".to_string(),
        ));
    }

    // Angle at the body between the directions to the Sun and to the Earth.
    let cos_phase = (helio[0] * geo[0] + helio[1] * geo[1] + helio[2] * geo[2]) / (r * delta);
    let phase = cos_phase.clamp(-1.0, 1.0).acos();

    let (ra, dec) = ecliptic_to_equatorial(geo);
    Ok(AsteroidState {
        ra,
        dec,
        heliocentric_distance: r,
        geocentric_distance: delta,
        phase_angle: qtty::Degrees::new(phase.to_degrees()),
    })
}

/// IAU H-G apparent magnitude.
pub fn hg_magnitude(
    absolute_magnitude: f64,
    slope: f64,
    heliocentric_distance: f64,
    geocentric_distance: f64,
    phase_angle: qtty::Degrees,
) -> f64 {
    let half_tan = (phase_angle.value().to_radians() / 2.0).tan().abs();
    let phi1 = (-3.33 * half_tan.powf(0.63)).exp();
    let phi2 = (-1.87 * half_tan.powf(1.22)).exp();
    let phase_term = ((1.0 - slope) * phi1 + slope * phi2).max(f64::MIN_POSITIVE);
    absolute_magnitude + 5.0 * (heliocentric_distance * geocentric_distance).log10()
        - 2.5 * phase_term.log10()
}

fn norm(v: [f64; 3]) -> f64 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}
