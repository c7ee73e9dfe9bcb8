//! Request resolution: observer location, time window and limits.
//!
//! Runs before any scoring. Out-of-range input is rejected here; missing
//! input is filled from the user profile, the caller's IP location or the
//! planner configuration.

use std::net::Ipv4Addr;

use chrono::Utc;

use crate::api::{GeographicLocation, LocationSource, PlanRequest};
use crate::config::{PlannerConfig, HARD_MAX_CATEGORY_LIMIT, HARD_MAX_RADIUS_DEG};
use crate::db::{FullRepository, GeoIpRepository, ProfileRepository, UserProfile};
use crate::error::{PlanError, PlanResult};
use crate::models::{ModifiedJulianDate, Observer, TargetCategory, TargetId, UserContext};

/// A request with every default applied and every bound checked.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub location: GeographicLocation,
    pub user: UserContext,
    pub limiting_magnitude: f64,
    pub window_start: ModifiedJulianDate,
    pub window_end: ModifiedJulianDate,
    pub min_spacing: qtty::Days,
    pub max_spacing: qtty::Days,
    pub minimum_score: f64,
    pub categories: Vec<TargetCategory>,
    pub category_limit: usize,
    pub radius: qtty::Degrees,
    pub max_entries: usize,
    pub find_peaks: bool,
    pub include_other_targets: bool,
    pub source_targets: Vec<TargetId>,
}

impl ResolvedRequest {
    pub fn observer(&self) -> Observer {
        self.location.observer
    }

    /// Whether the catalog selector runs at all.
    pub fn searches_catalogs(&self) -> bool {
        self.include_other_targets || self.source_targets.is_empty()
    }
}

/// Validate `request` and fill in its defaults.
pub async fn resolve_request(
    request: &PlanRequest,
    config: &PlannerConfig,
    repo: &dyn FullRepository,
) -> PlanResult<ResolvedRequest> {
    // Cheap checks first so malformed requests never reach a collaborator.
    validate_explicit_fields(request)?;

    let profile = match request.user_id {
        Some(user_id) => repo
            .get_profile(user_id)
            .await
            .map_err(|e| e.with_operation("resolve_request"))?,
        None => None,
    };
    let user = match request.user_id {
        Some(user_id) => UserContext::authenticated(
            user_id,
            profile.as_ref().and_then(|p| p.limiting_magnitude),
        ),
        None => UserContext::anonymous(),
    };
    let limiting_magnitude = request
        .limiting_magnitude
        .unwrap_or_else(|| {
            user.effective_limiting_magnitude(config.scoring.anonymous_limiting_magnitude)
        });

    let location = resolve_location(request, profile.as_ref(), repo).await?;

    let window_start =
        ModifiedJulianDate::from_datetime(request.start_time.unwrap_or_else(Utc::now));
    let window_end = match request.end_time {
        Some(end) => ModifiedJulianDate::from_datetime(end),
        None => window_start.add_days(config.limits.default_window_hours / 24.0),
    };
    if window_end.value() < window_start.value() {
        return Err(PlanError::invalid(
            "end_time",
            "must not be earlier than start_time",
        ));
    }
    let window_hours = window_end.days_since(window_start).value() * 24.0;
    if window_hours > config.limits.max_window_hours {
        return Err(PlanError::invalid(
            "end_time",
            format!(
                "window of {:.1} h exceeds the {} h limit",
                window_hours, config.limits.max_window_hours
            ),
        ));
    }

    let min_spacing_minutes = request
        .min_spacing_minutes
        .unwrap_or(config.exposure.default_min_spacing_minutes);
    let max_spacing_minutes = request.max_spacing_minutes.unwrap_or_else(|| {
        config
            .exposure
            .default_max_spacing_minutes
            .max(min_spacing_minutes)
    });
    if max_spacing_minutes < min_spacing_minutes {
        return Err(PlanError::invalid(
            "max_spacing_minutes",
            format!(
                "must be at least min_spacing_minutes ({})",
                min_spacing_minutes
            ),
        ));
    }

    let category_limit = request
        .category_limit
        .unwrap_or(config.limits.default_category_limit)
        .min(config.limits.max_category_limit)
        .min(HARD_MAX_CATEGORY_LIMIT);
    let max_entries = request
        .max_entries
        .unwrap_or(config.limits.default_plan_limit)
        .min(config.limits.max_plan_limit);
    let radius = request
        .search_radius_deg
        .unwrap_or(config.limits.default_radius_deg)
        .min(config.limits.max_radius_deg)
        .min(HARD_MAX_RADIUS_DEG);

    let categories = match &request.categories {
        Some(selected) => TargetCategory::ALL
            .into_iter()
            .filter(|c| selected.contains(c))
            .collect(),
        None => TargetCategory::ALL.to_vec(),
    };

    Ok(ResolvedRequest {
        location,
        user,
        limiting_magnitude,
        window_start,
        window_end,
        min_spacing: qtty::Days::new(min_spacing_minutes / 1440.0),
        max_spacing: qtty::Days::new(max_spacing_minutes / 1440.0),
        minimum_score: request.minimum_score,
        categories,
        category_limit,
        radius: qtty::Degrees::new(radius),
        max_entries,
        find_peaks: request.find_peaks,
        include_other_targets: request.include_other_targets,
        source_targets: request.source_target_ids(),
    })
}

fn validate_explicit_fields(request: &PlanRequest) -> PlanResult<()> {
    match (request.observer_lat, request.observer_lon) {
        (Some(lat), Some(lon)) => {
            if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
                return Err(PlanError::invalid(
                    "observer_lat",
                    format!("must be within [-90, 90], got {}", lat),
                ));
            }
            if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
                return Err(PlanError::invalid(
                    "observer_lon",
                    format!("must be within [-180, 180], got {}", lon),
                ));
            }
        }
        (Some(_), None) => {
            return Err(PlanError::invalid(
                "observer_lon",
                "must be given together with observer_lat",
            ))
        }
        (None, Some(_)) => {
            return Err(PlanError::invalid(
                "observer_lat",
                "must be given together with observer_lon",
            ))
        }
        (None, None) => {}
    }

    if let Some(elevation) = request.elevation {
        if !elevation.is_finite() {
            return Err(PlanError::invalid("elevation", "must be finite"));
        }
    }
    if let Some(mag) = request.limiting_magnitude {
        if !mag.is_finite() {
            return Err(PlanError::invalid("limiting_magnitude", "must be finite"));
        }
    }
    if !request.minimum_score.is_finite() || request.minimum_score < 0.0 {
        return Err(PlanError::invalid(
            "minimum_score",
            "must be a non-negative number",
        ));
    }
    for (field, value) in [
        ("min_spacing_minutes", request.min_spacing_minutes),
        ("max_spacing_minutes", request.max_spacing_minutes),
        ("search_radius_deg", request.search_radius_deg),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 {
                return Err(PlanError::invalid(field, "must be a positive number"));
            }
        }
    }
    if request.category_limit == Some(0) {
        return Err(PlanError::invalid("category_limit", "must be at least 1"));
    }
    if request.max_entries == Some(0) {
        return Err(PlanError::invalid("max_entries", "must be at least 1"));
    }
    if matches!(&request.categories, Some(c) if c.is_empty()) {
        return Err(PlanError::invalid("categories", "must not be empty"));
    }
    Ok(())
}

/// Explicit coordinates, then the profile home, then GeoIP, then (0, 0).
async fn resolve_location(
    request: &PlanRequest,
    profile: Option<&UserProfile>,
    repo: &dyn FullRepository,
) -> PlanResult<GeographicLocation> {
    let elevation = request.elevation.unwrap_or(0.0);

    if let (Some(lat), Some(lon)) = (request.observer_lat, request.observer_lon) {
        let observer = Observer::new(lat, lon, elevation)
            .map_err(|e| PlanError::invalid("observer_lat", e))?;
        return Ok(GeographicLocation {
            observer,
            source: LocationSource::Request,
        });
    }

    if let Some(home) = profile.and_then(|p| p.home_location) {
        let observer = match request.elevation {
            Some(e) => Observer {
                elevation: qtty::Meters::new(e),
                ..home
            },
            None => home,
        };
        return Ok(GeographicLocation {
            observer,
            source: LocationSource::Profile,
        });
    }

    if let Some(ip) = request.client_ip.as_deref() {
        match geoip_location(ip, repo).await {
            Some((lat, lon)) => match Observer::new(lat, lon, elevation) {
                Ok(observer) => {
                    return Ok(GeographicLocation {
                        observer,
                        source: LocationSource::GeoIp,
                    })
                }
                Err(e) => log::warn!("Ignoring GeoIP location for {}: {}", ip, e),
            },
            None => log::debug!("No GeoIP location for {}", ip),
        }
    }

    log::warn!("No observer location available; planning for latitude 0, longitude 0");
    let observer =
        Observer::new(0.0, 0.0, elevation).map_err(|e| PlanError::invalid("elevation", e))?;
    Ok(GeographicLocation {
        observer,
        source: LocationSource::Fallback,
    })
}

async fn geoip_location(ip: &str, repo: &dyn FullRepository) -> Option<(f64, f64)> {
    let addr: Ipv4Addr = match ip.trim().parse() {
        Ok(addr) => addr,
        Err(e) => {
            log::warn!("Ignoring malformed client address '{}': {}", ip, e);
            return None;
        }
    };
    match repo.location_for_ip(addr).await {
        Ok(location) => location,
        Err(e) => {
            log::warn!("GeoIP lookup failed for {}: {}", ip, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::GeoIpBlock;
    use crate::db::LocalRepository;
    use chrono::TimeZone;

    fn repo() -> LocalRepository {
        let repo = LocalRepository::new();
        repo.insert_profile(UserProfile {
            user_id: 7,
            limiting_magnitude: Some(13.5),
            home_location: Some(Observer::new(51.5, -0.1, 20.0).unwrap()),
        });
        repo.insert_profile(UserProfile {
            user_id: 8,
            limiting_magnitude: None,
            home_location: None,
        });
        repo.insert_geoip_block(GeoIpBlock {
            start_ip: u32::from(Ipv4Addr::new(10, 0, 0, 0)),
            end_ip: u32::from(Ipv4Addr::new(10, 0, 0, 255)),
            latitude: 35.0,
            longitude: 139.0,
        });
        repo
    }

    fn start() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 6, 1, 4, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_explicit_request_wins() {
        let request = PlanRequest {
            user_id: Some(7),
            ..PlanRequest::at(40.0, -105.0, 1600.0, start())
        };
        let resolved = resolve_request(&request, &PlannerConfig::default(), &repo())
            .await
            .unwrap();
        assert_eq!(resolved.location.source, LocationSource::Request);
        assert_eq!(resolved.observer().latitude.value(), 40.0);
        assert_eq!(resolved.limiting_magnitude, 13.5);
        let window = resolved.window_end.days_since(resolved.window_start).value();
        assert!((window - 8.0 / 24.0).abs() < 1e-9);
        assert_eq!(resolved.categories.len(), TargetCategory::ALL.len());
        assert_eq!(resolved.category_limit, 25);
        assert_eq!(resolved.radius.value(), 30.0);
    }

    #[tokio::test]
    async fn test_location_fallback_chain() {
        let config = PlannerConfig::default();
        let repo = repo();

        let profile = PlanRequest {
            user_id: Some(7),
            ..PlanRequest::default()
        };
        let resolved = resolve_request(&profile, &config, &repo).await.unwrap();
        assert_eq!(resolved.location.source, LocationSource::Profile);
        assert_eq!(resolved.observer().latitude.value(), 51.5);

        let geoip = PlanRequest {
            user_id: Some(8),
            client_ip: Some("10.0.0.17".to_string()),
            ..PlanRequest::default()
        };
        let resolved = resolve_request(&geoip, &config, &repo).await.unwrap();
        assert_eq!(resolved.location.source, LocationSource::GeoIp);
        assert_eq!(resolved.observer().longitude.value(), 139.0);
        assert_eq!(resolved.limiting_magnitude, 16.0);

        let unknown = PlanRequest {
            client_ip: Some("192.168.1.1".to_string()),
            ..PlanRequest::default()
        };
        let resolved = resolve_request(&unknown, &config, &repo).await.unwrap();
        assert_eq!(resolved.location.source, LocationSource::Fallback);
        assert_eq!(resolved.observer().latitude.value(), 0.0);
    }

    #[tokio::test]
    async fn test_out_of_range_input_rejected() {
        let config = PlannerConfig::default();
        let repo = repo();

        let bad_lat = PlanRequest::at(91.0, 0.0, 0.0, start());
        let err = resolve_request(&bad_lat, &config, &repo).await.unwrap_err();
        assert!(
            matches!(err, PlanError::InvalidRequest { ref field, .. } if field == "observer_lat")
        );

        let lone_lat = PlanRequest {
            observer_lat: Some(10.0),
            ..PlanRequest::default()
        };
        assert!(resolve_request(&lone_lat, &config, &repo).await.is_err());

        let reversed = PlanRequest {
            end_time: Some(start() - chrono::Duration::hours(1)),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        let err = resolve_request(&reversed, &config, &repo).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidRequest { ref field, .. } if field == "end_time"));

        let spacing = PlanRequest {
            min_spacing_minutes: Some(20.0),
            max_spacing_minutes: Some(10.0),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        assert!(resolve_request(&spacing, &config, &repo).await.is_err());

        let too_long = PlanRequest {
            end_time: Some(start() + chrono::Duration::days(400)),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        let err = resolve_request(&too_long, &config, &repo).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidRequest { ref field, .. } if field == "end_time"));

        let under_cap = PlanRequest {
            end_time: Some(start() + chrono::Duration::hours(47)),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        assert!(resolve_request(&under_cap, &config, &repo).await.is_ok());
    }

    #[tokio::test]
    async fn test_hard_caps_hold_for_unvalidated_config() {
        let mut config = PlannerConfig::default();
        config.limits.max_category_limit = 100_000;
        config.limits.max_radius_deg = 180.0;
        let request = PlanRequest {
            category_limit: Some(100_000),
            search_radius_deg: Some(180.0),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        let resolved = resolve_request(&request, &config, &repo()).await.unwrap();
        assert_eq!(resolved.category_limit, HARD_MAX_CATEGORY_LIMIT);
        assert_eq!(resolved.radius.value(), HARD_MAX_RADIUS_DEG);
    }

    #[tokio::test]
    async fn test_limits_clamped_to_caps() {
        let request = PlanRequest {
            category_limit: Some(10_000),
            search_radius_deg: Some(180.0),
            max_entries: Some(9_999),
            min_spacing_minutes: Some(45.0),
            categories: Some(vec![TargetCategory::Exoplanet, TargetCategory::Star]),
            ..PlanRequest::at(40.0, -105.0, 0.0, start())
        };
        let resolved = resolve_request(&request, &PlannerConfig::default(), &repo())
            .await
            .unwrap();
        assert_eq!(resolved.category_limit, 500);
        assert_eq!(resolved.radius.value(), 90.0);
        assert_eq!(resolved.max_entries, 500);
        assert!((resolved.max_spacing.value() * 1440.0 - 45.0).abs() < 1e-9);
        assert_eq!(
            resolved.categories,
            vec![TargetCategory::Star, TargetCategory::Exoplanet]
        );
    }
}
