//! Public API surface of the planner.
//!
//! Request and result types exchanged with the web layer. All types derive
//! Serialize/Deserialize for JSON.

pub use crate::astro::{RiseTransitSet, Visibility};
pub use crate::models::{ModifiedJulianDate, Observer, TargetCategory, TargetId};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Named list of targets the caller wants scored, e.g. a bookmark folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateSourceSet {
    #[serde(default)]
    pub name: String,
    pub target_ids: Vec<TargetId>,
}

/// Everything a caller can ask of the plan assembler.
///
/// Every field is optional; unset values fall back to the user profile, the
/// caller's IP location or the planner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub observer_lat: Option<f64>,
    #[serde(default)]
    pub observer_lon: Option<f64>,
    /// Meters above sea level.
    #[serde(default)]
    pub elevation: Option<f64>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// Minimum gap between consecutive plan entries.
    #[serde(default)]
    pub min_spacing_minutes: Option<f64>,
    /// Longest slot a single entry may occupy.
    #[serde(default)]
    pub max_spacing_minutes: Option<f64>,
    #[serde(default)]
    pub limiting_magnitude: Option<f64>,
    #[serde(default)]
    pub minimum_score: f64,
    /// When false and source sets are given, only those targets are planned.
    #[serde(default = "default_true")]
    pub include_other_targets: bool,
    #[serde(default)]
    pub candidate_source_sets: Vec<CandidateSourceSet>,
    #[serde(default)]
    pub user_id: Option<i64>,
    /// Dotted-quad client address used to locate anonymous callers.
    #[serde(default)]
    pub client_ip: Option<String>,
    /// Restrict the catalog search; `None` searches every category.
    #[serde(default)]
    pub categories: Option<Vec<TargetCategory>>,
    #[serde(default)]
    pub category_limit: Option<usize>,
    #[serde(default)]
    pub search_radius_deg: Option<f64>,
    #[serde(default)]
    pub max_entries: Option<usize>,
    /// Scan the window for each target's best instant.
    #[serde(default = "default_true")]
    pub find_peaks: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PlanRequest {
    fn default() -> Self {
        Self {
            observer_lat: None,
            observer_lon: None,
            elevation: None,
            start_time: None,
            end_time: None,
            min_spacing_minutes: None,
            max_spacing_minutes: None,
            limiting_magnitude: None,
            minimum_score: 0.0,
            include_other_targets: true,
            candidate_source_sets: Vec::new(),
            user_id: None,
            client_ip: None,
            categories: None,
            category_limit: None,
            search_radius_deg: None,
            max_entries: None,
            find_peaks: true,
        }
    }
}

impl PlanRequest {
    /// Request for an explicit site and start time.
    pub fn at(latitude: f64, longitude: f64, elevation: f64, start: DateTime<Utc>) -> Self {
        Self {
            observer_lat: Some(latitude),
            observer_lon: Some(longitude),
            elevation: Some(elevation),
            start_time: Some(start),
            ..Self::default()
        }
    }

    /// Deduplicated target ids across all source sets, in first-seen order.
    pub fn source_target_ids(&self) -> Vec<TargetId> {
        let mut seen = std::collections::HashSet::new();
        self.candidate_source_sets
            .iter()
            .flat_map(|set| set.target_ids.iter())
            .filter(|id| seen.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

/// How the observer location was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Request,
    Profile,
    GeoIp,
    /// Nothing else was available; the location is (0, 0).
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicLocation {
    pub observer: Observer,
    pub source: LocationSource,
}

/// One ranked, time-boxed line of an observing plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservingPlanEntry {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub identifier: TargetId,
    pub category: TargetCategory,
    /// Position at `start_time`.
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
    #[serde(default)]
    pub magnitude: Option<f64>,
    /// Ranking score: the peak score when peaks were searched.
    pub score: f64,
    /// Score at the beginning of the window, if it could be evaluated.
    #[serde(default)]
    pub score_at_window_start: Option<f64>,
    #[serde(default)]
    pub peak_time: Option<ModifiedJulianDate>,
    /// Scheduled observation start after time boxing.
    pub start_time: ModifiedJulianDate,
    #[serde(flatten)]
    pub rise_transit_set: RiseTransitSet,
    pub exposure_count: u32,
    pub exposure_duration: qtty::Seconds,
}

/// Output of one plan assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservingPlan {
    pub location: GeographicLocation,
    pub window_start: ModifiedJulianDate,
    pub window_end: ModifiedJulianDate,
    pub limiting_magnitude: f64,
    pub entries: Vec<ObservingPlanEntry>,
    /// Categories whose candidate query failed and were left out.
    #[serde(default)]
    pub dropped_categories: Vec<TargetCategory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_from_empty_json() {
        let request: PlanRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, PlanRequest::default());
        assert!(request.include_other_targets);
        assert!(request.find_peaks);
    }

    #[test]
    fn test_request_parses_rfc3339_times() {
        let json = r#"{
            "observer_lat": 40.0,
            "observer_lon": -105.0,
            "elevation": 1600.0,
            "start_time": "2020-06-01T04:00:00Z",
            "limiting_magnitude": 12.0,
            "categories": ["star", "asteroid"]
        }"#;
        let request: PlanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.observer_lat, Some(40.0));
        assert_eq!(
            request.start_time.unwrap().to_rfc3339(),
            "2020-06-01T04:00:00+00:00"
        );
        assert_eq!(
            request.categories,
            Some(vec![TargetCategory::Star, TargetCategory::Asteroid])
        );
    }

    #[test]
    fn test_source_target_ids_deduplicated() {
        let request = PlanRequest {
            candidate_source_sets: vec![
                CandidateSourceSet {
                    name: "favourites".into(),
                    target_ids: vec![TargetId::new("M13"), TargetId::new("M57")],
                },
                CandidateSourceSet {
                    name: "tonight".into(),
                    target_ids: vec![TargetId::new("M57"), TargetId::new("(433) Eros")],
                },
            ],
            ..PlanRequest::default()
        };
        let ids: Vec<String> = request
            .source_target_ids()
            .into_iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(ids, vec!["M13", "M57", "(433) Eros"]);
    }
}
