//! Observer location and user context.

use serde::{Deserialize, Serialize};

/// Limiting magnitude assumed for anonymous users.
pub const ANONYMOUS_LIMITING_MAGNITUDE: f64 = 16.0;

/// Geodetic site the alt/az frame is computed from.
///
/// The evaluation instant is passed alongside the observer rather than stored
/// in it, so one observer serves a whole peak scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observer {
    /// Geodetic latitude (degrees, north positive).
    pub latitude: qtty::Degrees,
    /// Geodetic longitude (degrees, east positive).
    pub longitude: qtty::Degrees,
    /// Elevation above sea level.
    pub elevation: qtty::Meters,
}

impl Observer {
    /// Validated constructor.
    pub fn new(latitude: f64, longitude: f64, elevation_m: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("Latitude must be within [-90, 90], got {}", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!(
                "Longitude must be within [-180, 180], got {}",
                longitude
            ));
        }
        if !elevation_m.is_finite() {
            return Err(format!("Elevation must be finite, got {}", elevation_m));
        }
        Ok(Self {
            latitude: qtty::Degrees::new(latitude),
            longitude: qtty::Degrees::new(longitude),
            elevation: qtty::Meters::new(elevation_m),
        })
    }
}

/// Who is asking for the plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserContext {
    /// Authenticated user id, `None` for anonymous requests.
    pub user_id: Option<i64>,
    /// Personal limiting magnitude from the profile or the request.
    pub limiting_magnitude: Option<f64>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: i64, limiting_magnitude: Option<f64>) -> Self {
        Self {
            user_id: Some(user_id),
            limiting_magnitude,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// Magnitude fed to the difficulty model.
    ///
    /// Authenticated users use their own value when one is set; everyone else
    /// falls back to `anonymous_default`.
    pub fn effective_limiting_magnitude(&self, anonymous_default: f64) -> f64 {
        match (self.user_id, self.limiting_magnitude) {
            (Some(_), Some(mag)) if mag.is_finite() => mag,
            _ => anonymous_default,
        }
    }
}
