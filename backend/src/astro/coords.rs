//! Sidereal time and equatorial to horizontal conversions.
//!
//! Low-precision formulas (IAU 1982 GMST polynomial, no refraction, no
//! nutation). They are accurate to a fraction of a degree, which is far below
//! the resolution the scoring model cares about.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use crate::models::{ModifiedJulianDate, Observer};

/// Julian Date of the J2000.0 epoch.
pub const J2000_JD: f64 = 2_451_545.0;

/// Apparent position in the observer's horizontal frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HorizontalPosition {
    pub altitude: qtty::Degrees,
    /// Azimuth measured from north through east.
    pub azimuth: qtty::Degrees,
}

/// Greenwich mean sidereal time in radians, `[0, 2π)`.
pub fn gmst_rad(t: ModifiedJulianDate) -> f64 {
    let d = t.julian_date() - J2000_JD;
    let centuries = d / 36525.0;
    let degrees = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * centuries * centuries
        - centuries * centuries * centuries / 38_710_000.0;
    degrees.to_radians().rem_euclid(TAU)
}

/// Local sidereal time in radians, `[0, 2π)`.
pub fn local_sidereal_time_rad(t: ModifiedJulianDate, longitude_east: qtty::Degrees) -> f64 {
    (gmst_rad(t) + longitude_east.value().to_radians()).rem_euclid(TAU)
}

/// Local sidereal time expressed as an angle in degrees.
pub fn local_sidereal_time(t: ModifiedJulianDate, longitude_east: qtty::Degrees) -> qtty::Degrees {
    qtty::Degrees::new(local_sidereal_time_rad(t, longitude_east).to_degrees())
}

/// Local hour angle of `ra` in radians, wrapped to `(-π, π]`.
pub fn hour_angle_rad(ra: qtty::Degrees, t: ModifiedJulianDate, observer: &Observer) -> f64 {
    let ha = (local_sidereal_time_rad(t, observer.longitude) - ra.value().to_radians())
        .rem_euclid(TAU);
    if ha > std::f64::consts::PI {
        ha - TAU
    } else {
        ha
    }
}

/// Altitude and azimuth of an equatorial position.
pub fn horizontal_position(
    ra: qtty::Degrees,
    dec: qtty::Degrees,
    t: ModifiedJulianDate,
    observer: &Observer,
) -> HorizontalPosition {
    let ha = hour_angle_rad(ra, t, observer);
    let dec = dec.value().to_radians();
    let lat = observer.latitude.value().to_radians();

    let sin_alt = (dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos()).clamp(-1.0, 1.0);
    let alt = sin_alt.asin();

    let y = -ha.sin() * dec.cos();
    let x = dec.sin() * lat.cos() - dec.cos() * lat.sin() * ha.cos();
    let az = y.atan2(x).rem_euclid(TAU);

    HorizontalPosition {
        altitude: qtty::Degrees::new(alt.to_degrees()),
        azimuth: qtty::Degrees::new(az.to_degrees()),
    }
}

/// Altitude only; the hot path of the zenith difficulty.
pub fn altitude(
    ra: qtty::Degrees,
    dec: qtty::Degrees,
    t: ModifiedJulianDate,
    observer: &Observer,
) -> qtty::Degrees {
    let ha = hour_angle_rad(ra, t, observer);
    let dec = dec.value().to_radians();
    let lat = observer.latitude.value().to_radians();
    let sin_alt = (dec.sin() * lat.sin() + dec.cos() * lat.cos() * ha.cos()).clamp(-1.0, 1.0);
    qtty::Degrees::new(sin_alt.asin().to_degrees())
}

/// Equatorial coordinates of the observer's zenith at `t`.
pub fn zenith(t: ModifiedJulianDate, observer: &Observer) -> (qtty::Degrees, qtty::Degrees) {
    (local_sidereal_time(t, observer.longitude), observer.latitude)
}

/// Great-circle separation between two equatorial positions.
pub fn angular_separation(
    ra1: qtty::Degrees,
    dec1: qtty::Degrees,
    ra2: qtty::Degrees,
    dec2: qtty::Degrees,
) -> qtty::Degrees {
    let (ra1, dec1) = (ra1.value().to_radians(), dec1.value().to_radians());
    let (ra2, dec2) = (ra2.value().to_radians(), dec2.value().to_radians());

    // Haversine form stays accurate for small separations.
    let sin_ddec = ((dec2 - dec1) / 2.0).sin();
    let sin_dra = ((ra2 - ra1) / 2.0).sin();
    let h = sin_ddec * sin_ddec + dec1.cos() * dec2.cos() * sin_dra * sin_dra;
    qtty::Degrees::new((2.0 * h.sqrt().clamp(0.0, 1.0).asin()).to_degrees())
}
