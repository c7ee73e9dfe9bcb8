//! Catalog target records and the polymorphic [`CelestialTarget`].
//!
//! Each catalog keeps its own record shape, close to the columns the
//! portal imports from the upstream catalogs (UCAC4, GCVS, 2MASS XSC,
//! Messier, astorb, exoplanets.org). Scoring code never matches on the
//! record shapes directly; it goes through [`crate::algorithms::Scorable`]
//! and [`crate::ephemeris::EphemerisProvider`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::elements::{CeuParameters, OrbitalElements, TransitElements};

/// Default IAU H-G slope parameter for asteroids without a measured one.
pub const DEFAULT_SLOPE_PARAMETER: f64 = 0.15;

/// Catalog-unique target identifier (e.g. `"M 13"`, `"(1) Ceres"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

impl TargetId {
    pub fn new(value: impl Into<String>) -> Self {
        TargetId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Category tag shared by every target of the same catalog.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    Star,
    VariableStar,
    ExtendedSource,
    Messier,
    Asteroid,
    Exoplanet,
    UserDetection,
}

impl TargetCategory {
    /// Every category, in the order plans list them.
    pub const ALL: [TargetCategory; 7] = [
        TargetCategory::Star,
        TargetCategory::VariableStar,
        TargetCategory::ExtendedSource,
        TargetCategory::Messier,
        TargetCategory::Asteroid,
        TargetCategory::Exoplanet,
        TargetCategory::UserDetection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TargetCategory::Star => "star",
            TargetCategory::VariableStar => "variable_star",
            TargetCategory::ExtendedSource => "extended_source",
            TargetCategory::Messier => "messier",
            TargetCategory::Asteroid => "asteroid",
            TargetCategory::Exoplanet => "exoplanet",
            TargetCategory::UserDetection => "user_detection",
        }
    }
}

impl fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "star" | "ucac4" => Ok(Self::Star),
            "variable_star" | "variable" | "gcvs" => Ok(Self::VariableStar),
            "extended_source" | "2mass_xsc" | "galaxy" => Ok(Self::ExtendedSource),
            "messier" => Ok(Self::Messier),
            "asteroid" | "astorb" => Ok(Self::Asteroid),
            "exoplanet" => Ok(Self::Exoplanet),
            "user_detection" | "detection" => Ok(Self::UserDetection),
            _ => Err(format!("Unknown target category: {}", s)),
        }
    }
}

/// UCAC4 point source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StarRecord {
    pub identifier: TargetId,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub mag_fit: Option<f64>,
    /// Proper motion in RA·cos(dec) (mas/yr).
    #[serde(default)]
    pub pm_ra: Option<f64>,
    /// Proper motion in Dec (mas/yr).
    #[serde(default)]
    pub pm_dec: Option<f64>,
}

/// GCVS variable star.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableStarRecord {
    pub identifier: TargetId,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub variable_type: String,
    /// Magnitude at maximum brightness.
    pub mag_max: Option<f64>,
    /// Magnitude at minimum brightness.
    pub mag_min: Option<f64>,
    #[serde(default)]
    pub period: Option<qtty::Days>,
}

impl VariableStarRecord {
    /// Peak-to-peak amplitude in magnitudes, when both extremes are known.
    pub fn amplitude(&self) -> Option<f64> {
        match (self.mag_max, self.mag_min) {
            (Some(max), Some(min)) => Some((min - max).abs()),
            _ => None,
        }
    }
}

/// 2MASS extended source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedSourceRecord {
    pub identifier: TargetId,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    /// Isophotal K magnitude.
    pub k_mag: Option<f64>,
    /// Isophotal K semi-major axis (arcsec).
    pub semi_major: Option<qtty::Arcseconds>,
    /// Minor/major axis ratio.
    pub axis_ratio: Option<f64>,
    #[serde(default)]
    pub position_angle: Option<qtty::Degrees>,
}

/// Messier catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessierRecord {
    pub identifier: TargetId,
    /// SIMBAD object type code (`GlC`, `OpC`, `G`, `PN`, ...).
    pub object_type: String,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub mag_v: Option<f64>,
}

/// astorb.dat asteroid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidRecord {
    pub identifier: TargetId,
    pub number: Option<u32>,
    pub name: String,
    /// Absolute magnitude H.
    pub abs_mag: Option<f64>,
    /// Slope parameter G.
    #[serde(default)]
    pub slope: Option<f64>,
    pub orbit_code: Option<i32>,
    pub critical_code: Option<i32>,
    pub astrometry_needed_code: Option<i32>,
    pub elements: OrbitalElements,
    #[serde(default)]
    pub ceu: CeuParameters,
}

impl AsteroidRecord {
    pub fn slope_parameter(&self) -> f64 {
        self.slope.unwrap_or(DEFAULT_SLOPE_PARAMETER)
    }
}

/// exoplanets.org planet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExoplanetRecord {
    pub identifier: TargetId,
    pub star_identifier: String,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    /// Host star V magnitude.
    pub mag_v: Option<f64>,
    #[serde(default)]
    pub transit: TransitElements,
    #[serde(default)]
    pub transit_depth: Option<f64>,
}

/// Source detected on a user-uploaded, plate-solved image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetectionRecord {
    pub identifier: TargetId,
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    pub magnitude: Option<f64>,
    pub image_id: i64,
    /// Whether the detection was cross-matched to a catalog object.
    #[serde(default)]
    pub catalog_match: bool,
}

/// Any target the planner can score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CelestialTarget {
    FixedStar(StarRecord),
    VariableStar(VariableStarRecord),
    ExtendedSource(ExtendedSourceRecord),
    MessierObject(MessierRecord),
    Asteroid(AsteroidRecord),
    Exoplanet(ExoplanetRecord),
    UserDetection(UserDetectionRecord),
}

impl CelestialTarget {
    pub fn id(&self) -> &TargetId {
        match self {
            CelestialTarget::FixedStar(r) => &r.identifier,
            CelestialTarget::VariableStar(r) => &r.identifier,
            CelestialTarget::ExtendedSource(r) => &r.identifier,
            CelestialTarget::MessierObject(r) => &r.identifier,
            CelestialTarget::Asteroid(r) => &r.identifier,
            CelestialTarget::Exoplanet(r) => &r.identifier,
            CelestialTarget::UserDetection(r) => &r.identifier,
        }
    }

    pub fn category(&self) -> TargetCategory {
        match self {
            CelestialTarget::FixedStar(_) => TargetCategory::Star,
            CelestialTarget::VariableStar(_) => TargetCategory::VariableStar,
            CelestialTarget::ExtendedSource(_) => TargetCategory::ExtendedSource,
            CelestialTarget::MessierObject(_) => TargetCategory::Messier,
            CelestialTarget::Asteroid(_) => TargetCategory::Asteroid,
            CelestialTarget::Exoplanet(_) => TargetCategory::Exoplanet,
            CelestialTarget::UserDetection(_) => TargetCategory::UserDetection,
        }
    }

    /// Catalog position for targets that do not move, `None` for asteroids.
    pub fn fixed_position(&self) -> Option<(qtty::Degrees, qtty::Degrees)> {
        match self {
            CelestialTarget::FixedStar(r) => Some((r.ra, r.dec)),
            CelestialTarget::VariableStar(r) => Some((r.ra, r.dec)),
            CelestialTarget::ExtendedSource(r) => Some((r.ra, r.dec)),
            CelestialTarget::MessierObject(r) => Some((r.ra, r.dec)),
            CelestialTarget::Exoplanet(r) => Some((r.ra, r.dec)),
            CelestialTarget::UserDetection(r) => Some((r.ra, r.dec)),
            CelestialTarget::Asteroid(_) => None,
        }
    }

    /// Catalog magnitude for targets that do not move, `None` for asteroids
    /// and for records without a measured magnitude.
    pub fn fixed_magnitude(&self) -> Option<f64> {
        match self {
            CelestialTarget::FixedStar(r) => r.mag_fit,
            CelestialTarget::VariableStar(r) => r.mag_max,
            CelestialTarget::ExtendedSource(r) => r.k_mag,
            CelestialTarget::MessierObject(r) => r.mag_v,
            CelestialTarget::Exoplanet(r) => r.mag_v,
            CelestialTarget::UserDetection(r) => r.magnitude,
            CelestialTarget::Asteroid(_) => None,
        }
        .filter(|m| m.is_finite())
    }

    pub fn is_mobile(&self) -> bool {
        matches!(self, CelestialTarget::Asteroid(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip_through_str() {
        for category in TargetCategory::ALL {
            assert_eq!(category.as_str().parse::<TargetCategory>().unwrap(), category);
        }
        assert!("comet".parse::<TargetCategory>().is_err());
    }

    #[test]
    fn test_target_json_is_tagged() {
        let target = CelestialTarget::MessierObject(MessierRecord {
            identifier: TargetId::new("M 13"),
            object_type: "GlC".to_string(),
            ra: qtty::Degrees::new(250.42),
            dec: qtty::Degrees::new(36.46),
            mag_v: Some(5.8),
        });
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["kind"], "messier_object");
        assert_eq!(json["identifier"], "M 13");

        let back: CelestialTarget = serde_json::from_value(json).unwrap();
        assert_eq!(back.category(), TargetCategory::Messier);
        assert_eq!(back.fixed_magnitude(), Some(5.8));
    }

    #[test]
    fn test_variable_star_amplitude() {
        let record = VariableStarRecord {
            identifier: TargetId::new("R Leo"),
            ra: qtty::Degrees::new(146.89),
            dec: qtty::Degrees::new(11.43),
            variable_type: "M".to_string(),
            mag_max: Some(4.4),
            mag_min: Some(11.3),
            period: Some(qtty::Days::new(309.95)),
        };
        assert!((record.amplitude().unwrap() - 6.9).abs() < 1e-9);
    }
}
