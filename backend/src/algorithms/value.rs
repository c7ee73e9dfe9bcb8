//! Value model: how scientifically useful an observation of a target is at a
//! given instant, independent of how hard it is to get.

use crate::models::{
    AsteroidRecord, CelestialTarget, ExtendedSourceRecord, ModifiedJulianDate, TransitElements,
    VariableStarRecord,
};

use super::tables::ScoringTables;

pub const FIXED_STAR_VALUE: f64 = 1.0;
pub const VARIABLE_STAR_BASE_VALUE: f64 = 2.0;
/// Amplitude (mag) above which a variable star earns no extra value.
pub const VARIABLE_STAR_AMPLITUDE_CAP: f64 = 4.0;
/// Semi-major axis (arcsec) times axis ratio that maps to value 1.
pub const EXTENDED_SOURCE_SIZE_SCALE: f64 = 30.0;
pub const EXTENDED_SOURCE_MIN_VALUE: f64 = 0.1;
pub const EXTENDED_SOURCE_MAX_VALUE: f64 = 10.0;
pub const USER_DETECTION_UNMATCHED_VALUE: f64 = 2.0;
pub const USER_DETECTION_MATCHED_VALUE: f64 = 0.5;
pub const ASTEROID_BASE_VALUE: f64 = 4.0;

pub const EXOPLANET_IN_TRANSIT_VALUE: f64 = 5.0;
pub const EXOPLANET_CONTACT_VALUE: f64 = 10.0;
pub const EXOPLANET_BASELINE_VALUE: f64 = 3.0;
pub const EXOPLANET_OUT_OF_WINDOW_VALUE: f64 = 2.5;
/// Half-width of the ingress/egress window around each contact (days).
pub const EXOPLANET_CONTACT_WINDOW_DAYS: f64 = 0.5 / 24.0;

/// Per-category value functions over a shared set of lookup tables.
#[derive(Debug, Clone, Copy)]
pub struct ValueModel<'a> {
    tables: &'a ScoringTables,
}

impl<'a> ValueModel<'a> {
    pub fn new(tables: &'a ScoringTables) -> Self {
        Self { tables }
    }

    /// `valueAt(target, t)`; always finite and `>= 0`.
    pub fn value_at(&self, target: &CelestialTarget, t: ModifiedJulianDate) -> f64 {
        let value = match target {
            CelestialTarget::FixedStar(_) => FIXED_STAR_VALUE,
            CelestialTarget::VariableStar(record) => variable_star_value(record),
            CelestialTarget::ExtendedSource(record) => extended_source_value(record),
            CelestialTarget::MessierObject(record) => {
                self.tables.messier_types.lookup(&record.object_type).value
            }
            CelestialTarget::Asteroid(record) => self.asteroid_value(record),
            CelestialTarget::Exoplanet(record) => exoplanet_transit_value(&record.transit, t),
            CelestialTarget::UserDetection(record) => {
                if record.catalog_match {
                    USER_DETECTION_MATCHED_VALUE
                } else {
                    USER_DETECTION_UNMATCHED_VALUE
                }
            }
        };
        if value.is_finite() {
            value.max(0.0)
        } else {
            0.0
        }
    }

    /// Base value scaled by the orbit, critical-list and astrometry factors.
    pub fn asteroid_value(&self, record: &AsteroidRecord) -> f64 {
        let multiplier = self.tables.orbit_codes.factor(record.orbit_code)
            * self.tables.critical_codes.factor(record.critical_code)
            * self.tables.astrometry_codes.factor(record.astrometry_needed_code);
        ASTEROID_BASE_VALUE * multiplier / self.tables.asteroid_divisor
    }
}

fn variable_star_value(record: &VariableStarRecord) -> f64 {
    let amplitude = record
        .amplitude()
        .filter(|a| a.is_finite())
        .unwrap_or(0.0)
        .min(VARIABLE_STAR_AMPLITUDE_CAP);
    VARIABLE_STAR_BASE_VALUE * (1.0 + amplitude / VARIABLE_STAR_AMPLITUDE_CAP)
}

fn extended_source_value(record: &ExtendedSourceRecord) -> f64 {
    match (record.semi_major, record.axis_ratio) {
        (Some(semi_major), Some(ratio)) if semi_major.value().is_finite() && ratio.is_finite() => {
            (semi_major.value() * ratio / EXTENDED_SOURCE_SIZE_SCALE)
                .clamp(EXTENDED_SOURCE_MIN_VALUE, EXTENDED_SOURCE_MAX_VALUE)
        }
        _ => EXTENDED_SOURCE_MIN_VALUE,
    }
}

/// Transit-phase value of an exoplanet.
///
/// Tiers, by distance from the nearest transit centre:
/// * inside the transit: 5, or 10 within half an hour of ingress or egress
/// * outside, within half an hour of a contact: 3
/// * anywhere else: 2.5
///
/// Incomplete transit data falls back to the flat baseline 3.
pub fn exoplanet_transit_value(transit: &TransitElements, t: ModifiedJulianDate) -> f64 {
    let Some((epoch, period, duration)) = transit.complete() else {
        return EXOPLANET_BASELINE_VALUE;
    };

    let periods = t.days_since(epoch).value() / period;
    let offset = (periods - periods.round()).abs() * period;
    let half_duration = duration / 2.0;

    if offset <= half_duration {
        if half_duration - offset <= EXOPLANET_CONTACT_WINDOW_DAYS {
            EXOPLANET_CONTACT_VALUE
        } else {
            EXOPLANET_IN_TRANSIT_VALUE
        }
    } else if offset - half_duration <= EXOPLANET_CONTACT_WINDOW_DAYS {
        EXOPLANET_BASELINE_VALUE
    } else {
        EXOPLANET_OUT_OF_WINDOW_VALUE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessierRecord, TargetId, UserDetectionRecord};

    fn transit() -> TransitElements {
        TransitElements {
            epoch: Some(ModifiedJulianDate::new(59000.0)),
            period: Some(qtty::Days::new(3.5)),
            duration: Some(qtty::Days::new(0.1)),
        }
    }

    #[test]
    fn test_exoplanet_value_at_transit_centre_is_top_tier() {
        let value = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(59000.0));
        assert!(value == 5.0 || value == 10.0);
        let later = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(59000.0 + 7.0));
        assert!(later == 5.0 || later == 10.0);
    }

    #[test]
    fn test_exoplanet_value_half_period_is_baseline_or_less() {
        let value = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(59001.75));
        assert!(value <= 3.0);
        assert_eq!(value, EXOPLANET_OUT_OF_WINDOW_VALUE);
    }

    #[test]
    fn test_exoplanet_contact_windows() {
        // Egress contact at +0.05 d.
        let near_egress = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(59000.04));
        assert_eq!(near_egress, EXOPLANET_CONTACT_VALUE);
        let just_after = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(59000.06));
        assert_eq!(just_after, EXOPLANET_BASELINE_VALUE);
        let before_ingress = exoplanet_transit_value(&transit(), ModifiedJulianDate::new(58999.93));
        assert_eq!(before_ingress, EXOPLANET_BASELINE_VALUE);
    }

    #[test]
    fn test_exoplanet_incomplete_data_is_baseline() {
        let mut elements = transit();
        elements.epoch = None;
        assert_eq!(
            exoplanet_transit_value(&elements, ModifiedJulianDate::new(59000.0)),
            EXOPLANET_BASELINE_VALUE
        );
        let mut elements = transit();
        elements.period = Some(qtty::Days::new(-1.0));
        assert_eq!(
            exoplanet_transit_value(&elements, ModifiedJulianDate::new(59000.0)),
            EXOPLANET_BASELINE_VALUE
        );
    }

    #[test]
    fn test_category_values() {
        let model = ValueModel::new(ScoringTables::standard());
        let t = ModifiedJulianDate::new(59000.0);

        let m57 = CelestialTarget::MessierObject(MessierRecord {
            identifier: TargetId::new("M 57"),
            object_type: "PN".to_string(),
            ra: qtty::Degrees::new(283.4),
            dec: qtty::Degrees::new(33.03),
            mag_v: Some(8.8),
        });
        assert_eq!(model.value_at(&m57, t), 3.5);

        let detection = |catalog_match| {
            CelestialTarget::UserDetection(UserDetectionRecord {
                identifier: TargetId::new("det-1"),
                ra: qtty::Degrees::new(1.0),
                dec: qtty::Degrees::new(2.0),
                magnitude: Some(14.0),
                image_id: 3,
                catalog_match,
            })
        };
        assert_eq!(model.value_at(&detection(false), t), 2.0);
        assert_eq!(model.value_at(&detection(true), t), 0.5);
    }

    #[test]
    fn test_extended_source_value_clamps() {
        let mut record = ExtendedSourceRecord {
            identifier: TargetId::new("2MASX J00424433+4116074"),
            ra: qtty::Degrees::new(10.68),
            dec: qtty::Degrees::new(41.27),
            k_mag: Some(0.8),
            semi_major: Some(qtty::Arcseconds::new(60.0)),
            axis_ratio: Some(0.5),
            position_angle: None,
        };
        assert!((extended_source_value(&record) - 1.0).abs() < 1e-12);
        record.semi_major = Some(qtty::Arcseconds::new(10_000.0));
        assert_eq!(extended_source_value(&record), EXTENDED_SOURCE_MAX_VALUE);
        record.axis_ratio = None;
        assert_eq!(extended_source_value(&record), EXTENDED_SOURCE_MIN_VALUE);
    }

    #[test]
    fn test_variable_star_amplitude_bonus_is_capped() {
        let mut record = VariableStarRecord {
            identifier: TargetId::new("Mira"),
            ra: qtty::Degrees::new(34.84),
            dec: qtty::Degrees::new(-2.98),
            variable_type: "M".to_string(),
            mag_max: Some(2.0),
            mag_min: Some(10.1),
            period: None,
        };
        assert_eq!(variable_star_value(&record), 4.0);
        record.mag_min = Some(3.0);
        assert!((variable_star_value(&record) - 2.5).abs() < 1e-12);
        record.mag_min = None;
        assert_eq!(variable_star_value(&record), 2.0);
    }
}
