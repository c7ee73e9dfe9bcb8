//! Orbital and transit parameter sets attached to mobile or periodic targets.

use serde::{Deserialize, Serialize};

use super::time::ModifiedJulianDate;

/// Osculating Keplerian elements referred to the J2000 ecliptic.
///
/// Angles are stored in degrees, the semi-major axis in astronomical units,
/// mirroring the astorb.dat column layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    /// Epoch of osculation.
    pub epoch: ModifiedJulianDate,
    /// Mean anomaly at epoch (degrees).
    pub mean_anomaly: qtty::Degrees,
    /// Argument of perihelion (degrees).
    pub arg_perihelion: qtty::Degrees,
    /// Longitude of the ascending node (degrees).
    pub lon_ascending_node: qtty::Degrees,
    /// Inclination to the ecliptic (degrees).
    pub inclination: qtty::Degrees,
    pub eccentricity: f64,
    /// Semi-major axis (AU).
    pub semi_major_axis: f64,
}

impl OrbitalElements {
    /// True when every element is finite and describes a bound ellipse.
    pub fn is_bound(&self) -> bool {
        let finite = [
            self.epoch.value(),
            self.mean_anomaly.value(),
            self.arg_perihelion.value(),
            self.lon_ascending_node.value(),
            self.inclination.value(),
            self.eccentricity,
            self.semi_major_axis,
        ]
        .iter()
        .all(|v| v.is_finite());

        finite
            && (0.0..1.0).contains(&self.eccentricity)
            && self.semi_major_axis > 0.0
    }
}

/// Current ephemeris uncertainty (CEU) bookkeeping from astorb.
///
/// Every field is optional because freshly discovered objects often ship
/// without a measured uncertainty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CeuParameters {
    /// CEU at `date` (arcsec).
    pub ceu: Option<qtty::Arcseconds>,
    /// Rate of change of the CEU (arcsec/day).
    pub rate: Option<f64>,
    /// Date the CEU was evaluated.
    pub date: Option<ModifiedJulianDate>,
}

/// Transit ephemeris of an exoplanet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitElements {
    /// Mid-transit time of a reference transit.
    pub epoch: Option<ModifiedJulianDate>,
    /// Orbital period (days).
    pub period: Option<qtty::Days>,
    /// First to fourth contact duration (days).
    pub duration: Option<qtty::Days>,
}

impl TransitElements {
    /// Returns `(epoch, period, duration)` when the transit cycle is fully
    /// specified with a positive period.
    pub fn complete(&self) -> Option<(ModifiedJulianDate, f64, f64)> {
        let epoch = self.epoch?;
        let period = self.period?.value();
        let duration = self.duration?.value();
        if period > 0.0 && period.is_finite() && duration.is_finite() && duration >= 0.0 {
            Some((epoch, period, duration))
        } else {
            None
        }
    }

    /// Mid-transit time of the transit nearest to `t`.
    pub fn nearest_transit(&self, t: ModifiedJulianDate) -> Option<ModifiedJulianDate> {
        let (epoch, period, _) = self.complete()?;
        let periods = t.days_since(epoch).value() / period;
        Some(epoch.add_days(periods.round() * period))
    }

    /// Mid-transit time of the first transit at or after `t`.
    pub fn next_transit(&self, t: ModifiedJulianDate) -> Option<ModifiedJulianDate> {
        let (epoch, period, _) = self.complete()?;
        let periods = t.days_since(epoch).value() / period;
        Some(epoch.add_days(periods.ceil() * period))
    }

    /// Mid-transit time of the last transit at or before `t`.
    pub fn previous_transit(&self, t: ModifiedJulianDate) -> Option<ModifiedJulianDate> {
        let (epoch, period, _) = self.complete()?;
        let periods = t.days_since(epoch).value() / period;
        Some(epoch.add_days(periods.floor() * period))
    }
}
