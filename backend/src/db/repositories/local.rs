//! In-memory catalog store.
//!
//! Backs the CLI (loaded from a JSON snapshot) and the test-suite. Data lives
//! behind a `parking_lot::RwLock`; every query takes a read lock, copies what
//! it returns and releases the lock before yielding.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::astro::angular_separation;
use crate::db::repository::{
    CatalogRepository, ConeQuery, ErrorContext, GeoIpRepository, ProfileRepository,
    RepositoryError, RepositoryResult, UserProfile,
};
use crate::ephemeris::DirectEphemeris;
use crate::models::{
    AsteroidRecord, CelestialTarget, ModifiedJulianDate, TargetCategory, TargetId,
};

/// One sampled position along a precomputed asteroid track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub ra: qtty::Degrees,
    pub dec: qtty::Degrees,
}

/// Coarse sky path of an asteroid over `[start, end]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsteroidTrack {
    pub identifier: TargetId,
    pub start: ModifiedJulianDate,
    pub end: ModifiedJulianDate,
    pub path: Vec<TrackPoint>,
    /// Brightest magnitude reached along the segment.
    #[serde(default)]
    pub bright_mag: Option<f64>,
}

impl AsteroidTrack {
    fn covers(&self, t: ModifiedJulianDate) -> bool {
        self.start <= t && t <= self.end
    }

    fn passes_within(&self, ra: qtty::Degrees, dec: qtty::Degrees, radius: qtty::Degrees) -> bool {
        self.path
            .iter()
            .any(|p| angular_separation(p.ra, p.dec, ra, dec).value() <= radius.value())
    }
}

/// Inclusive range of IPv4 addresses mapped to a location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoIpBlock {
    pub start_ip: u32,
    pub end_ip: u32,
    pub latitude: f64,
    pub longitude: f64,
}

/// Serializable content of a [`LocalRepository`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub targets: Vec<CelestialTarget>,
    #[serde(default)]
    pub asteroid_tracks: Vec<AsteroidTrack>,
    #[serde(default)]
    pub profiles: Vec<UserProfile>,
    #[serde(default)]
    pub geoip_blocks: Vec<GeoIpBlock>,
}

#[derive(Debug, Default)]
struct LocalState {
    by_category: HashMap<TargetCategory, Vec<CelestialTarget>>,
    index: HashMap<TargetId, (TargetCategory, usize)>,
    tracks: HashMap<TargetId, Vec<AsteroidTrack>>,
    profiles: HashMap<i64, UserProfile>,
    /// Sorted by `start_ip`.
    geoip: Vec<GeoIpBlock>,
    unavailable: HashSet<TargetCategory>,
}

impl LocalState {
    fn insert_target(&mut self, target: CelestialTarget) {
        let category = target.category();
        let id = target.id().clone();
        if let Some(&(existing_category, position)) = self.index.get(&id) {
            if existing_category == category {
                if let Some(slot) = self
                    .by_category
                    .get_mut(&category)
                    .and_then(|v| v.get_mut(position))
                {
                    *slot = target;
                    return;
                }
            }
            // Same id under another category: drop the stale entry.
            if let Some(list) = self.by_category.get_mut(&existing_category) {
                list.remove(position);
                for (other, (cat, pos)) in self.index.iter_mut() {
                    if *cat == existing_category && *pos > position && *other != id {
                        *pos -= 1;
                    }
                }
            }
        }
        let list = self.by_category.entry(category).or_default();
        list.push(target);
        self.index.insert(id, (category, list.len() - 1));
    }

    fn ensure_available(&self, category: TargetCategory, operation: &str) -> RepositoryResult<()> {
        if self.unavailable.contains(&category) {
            return Err(RepositoryError::connection(format!("Catalog '{}' is unavailable", category))
                .with_context(ErrorContext::new(operation).with_category(category).retryable()));
        }
        Ok(())
    }
}

/// In-memory implementation of every repository trait.
#[derive(Clone, Default)]
pub struct LocalRepository {
    state: Arc<RwLock<LocalState>>,
}

impl LocalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let repo = Self::new();
        repo.insert_targets(snapshot.targets);
        for track in snapshot.asteroid_tracks {
            repo.insert_track(track);
        }
        for profile in snapshot.profiles {
            repo.insert_profile(profile);
        }
        for block in snapshot.geoip_blocks {
            repo.insert_geoip_block(block);
        }
        repo
    }

    /// Loads a JSON [`CatalogSnapshot`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> RepositoryResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RepositoryError::connection(format!("Failed to read catalog file: {}", e))
                .with_context(ErrorContext::new("from_json_file").with_subject(path.display()))
        })?;
        let snapshot: CatalogSnapshot = serde_json::from_str(&content)
            .map_err(|e| RepositoryError::from(e).with_operation("from_json_file"))?;
        log::info!(
            "Loaded {} targets, {} asteroid tracks from {}",
            snapshot.targets.len(),
            snapshot.asteroid_tracks.len(),
            path.display()
        );
        Ok(Self::from_snapshot(snapshot))
    }

    /// Inserts or replaces (by identifier) a target.
    pub fn insert_target(&self, target: CelestialTarget) {
        self.state.write().insert_target(target);
    }

    pub fn insert_targets(&self, targets: impl IntoIterator<Item = CelestialTarget>) {
        let mut state = self.state.write();
        for target in targets {
            state.insert_target(target);
        }
    }

    pub fn insert_track(&self, track: AsteroidTrack) {
        self.state
            .write()
            .tracks
            .entry(track.identifier.clone())
            .or_default()
            .push(track);
    }

    pub fn insert_profile(&self, profile: UserProfile) {
        self.state.write().profiles.insert(profile.user_id, profile);
    }

    pub fn insert_geoip_block(&self, block: GeoIpBlock) {
        let mut state = self.state.write();
        let position = state.geoip.partition_point(|b| b.start_ip <= block.start_ip);
        state.geoip.insert(position, block);
    }

    /// Simulates an outage of one catalog table.
    pub fn set_category_available(&self, category: TargetCategory, available: bool) {
        let mut state = self.state.write();
        if available {
            state.unavailable.remove(&category);
        } else {
            state.unavailable.insert(category);
        }
    }

    pub fn target_count(&self) -> usize {
        self.state.read().index.len()
    }

    pub fn track_count(&self) -> usize {
        self.state.read().tracks.values().map(Vec::len).sum()
    }

    /// Samples every asteroid over `[start, end]` in segments of
    /// `segment_days`, replacing existing tracks. Returns the number of
    /// segments stored. Asteroids that fail to propagate are skipped.
    pub fn precompute_asteroid_tracks(
        &self,
        start: ModifiedJulianDate,
        end: ModifiedJulianDate,
        segment_days: f64,
        samples_per_segment: usize,
    ) -> RepositoryResult<usize> {
        if !(segment_days.is_finite() && segment_days > 0.0) || end < start {
            return Err(RepositoryError::validation(
                "Track segments need a positive length and end >= start",
            )
            .with_context(
                ErrorContext::new("precompute_asteroid_tracks")
                    .with_details(format!("segment_days={}", segment_days)),
            ));
        }
        let samples = samples_per_segment.max(2);

        let asteroids: Vec<AsteroidRecord> = {
            let state = self.state.read();
            asteroid_records(&state).cloned().collect()
        };

        let mut tracks: HashMap<TargetId, Vec<AsteroidTrack>> = HashMap::new();
        'records: for record in &asteroids {
            let mut segment_start = start;
            while segment_start <= end {
                let segment_end = segment_start.add_days(segment_days);
                let mut path = Vec::with_capacity(samples);
                let mut bright_mag: Option<f64> = None;
                for i in 0..samples {
                    let t = segment_start.add_days(segment_days * i as f64 / (samples - 1) as f64);
                    match DirectEphemeris::asteroid_ephemeris(record, t) {
                        Ok(ephemeris) => {
                            path.push(TrackPoint {
                                ra: ephemeris.ra,
                                dec: ephemeris.dec,
                            });
                            if let Some(mag) = ephemeris.magnitude {
                                bright_mag = Some(bright_mag.map_or(mag, |b: f64| b.min(mag)));
                            }
                        }
                        Err(e) => {
                            log::warn!("Skipping track for {}: {}", record.identifier, e);
                            tracks.remove(&record.identifier);
                            continue 'records;
                        }
                    }
                }
                tracks
                    .entry(record.identifier.clone())
                    .or_default()
                    .push(AsteroidTrack {
                        identifier: record.identifier.clone(),
                        start: segment_start,
                        end: segment_end,
                        path,
                        bright_mag,
                    });
                segment_start = segment_end;
            }
        }

        let count = tracks.values().map(Vec::len).sum();
        self.state.write().tracks = tracks;
        Ok(count)
    }
}

fn asteroid_records(state: &LocalState) -> impl Iterator<Item = &AsteroidRecord> {
    state
        .by_category
        .get(&TargetCategory::Asteroid)
        .into_iter()
        .flatten()
        .filter_map(|target| match target {
            CelestialTarget::Asteroid(record) => Some(record),
            _ => None,
        })
}

#[async_trait]
impl CatalogRepository for LocalRepository {
    async fn cone_search(
        &self,
        category: TargetCategory,
        query: &ConeQuery,
    ) -> RepositoryResult<Vec<CelestialTarget>> {
        let state = self.state.read();
        state.ensure_available(category, "cone_search")?;
        if category == TargetCategory::Asteroid {
            return Err(RepositoryError::query(
                "Asteroid positions are time dependent; use asteroid_candidates",
            )
            .with_context(ErrorContext::new("cone_search").with_category(category)));
        }

        let mut hits: Vec<(f64, CelestialTarget)> = state
            .by_category
            .get(&category)
            .into_iter()
            .flatten()
            .filter_map(|target| {
                let (ra, dec) = target.fixed_position()?;
                let mag = target.fixed_magnitude()?;
                if mag >= query.max_magnitude {
                    return None;
                }
                let separation = angular_separation(ra, dec, query.center_ra, query.center_dec);
                (separation.value() <= query.radius.value()).then(|| (mag, target.clone()))
            })
            .collect();

        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.truncate(query.limit);
        Ok(hits.into_iter().map(|(_, target)| target).collect())
    }

    async fn asteroid_candidates(
        &self,
        query: &ConeQuery,
        t: ModifiedJulianDate,
    ) -> RepositoryResult<Vec<AsteroidRecord>> {
        let state = self.state.read();
        state.ensure_available(TargetCategory::Asteroid, "asteroid_candidates")?;

        let mut candidates: Vec<AsteroidRecord> = asteroid_records(&state)
            .filter(|record| {
                let covering = state
                    .tracks
                    .get(&record.identifier)
                    .and_then(|tracks| tracks.iter().find(|track| track.covers(t)));
                match covering {
                    Some(track) => {
                        track.bright_mag.map_or(true, |m| m < query.max_magnitude)
                            && track.passes_within(query.center_ra, query.center_dec, query.radius)
                    }
                    // No precomputed track: fall back to a direct position.
                    None => match DirectEphemeris::asteroid_ephemeris(record, t) {
                        Ok(ephemeris) => {
                            let separation = angular_separation(
                                ephemeris.ra,
                                ephemeris.dec,
                                query.center_ra,
                                query.center_dec,
                            );
                            separation.value() <= query.radius.value()
                        }
                        // Let the selector log and drop it.
                        Err(_) => true,
                    },
                }
            })
            .cloned()
            .collect();

        candidates.sort_by(|a, b| {
            a.abs_mag
                .unwrap_or(f64::INFINITY)
                .total_cmp(&b.abs_mag.unwrap_or(f64::INFINITY))
        });
        candidates.truncate(query.limit);
        Ok(candidates)
    }

    async fn get_targets(&self, ids: &[TargetId]) -> RepositoryResult<Vec<CelestialTarget>> {
        let state = self.state.read();
        Ok(ids
            .iter()
            .filter_map(|id| {
                let (category, position) = state.index.get(id)?;
                state.by_category.get(category)?.get(*position).cloned()
            })
            .collect())
    }
}

#[async_trait]
impl ProfileRepository for LocalRepository {
    async fn get_profile(&self, user_id: i64) -> RepositoryResult<Option<UserProfile>> {
        Ok(self.state.read().profiles.get(&user_id).cloned())
    }
}

#[async_trait]
impl GeoIpRepository for LocalRepository {
    async fn location_for_ip(&self, ip: Ipv4Addr) -> RepositoryResult<Option<(f64, f64)>> {
        let ip = u32::from(ip);
        let state = self.state.read();
        let position = state.geoip.partition_point(|b| b.start_ip <= ip);
        Ok(position
            .checked_sub(1)
            .and_then(|i| state.geoip.get(i))
            .filter(|block| block.end_ip >= ip)
            .map(|block| (block.latitude, block.longitude)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repository::ErrorKind;
    use crate::models::{CeuParameters, MessierRecord, OrbitalElements, StarRecord};

    fn star(id: &str, ra: f64, dec: f64, mag: f64) -> CelestialTarget {
        CelestialTarget::FixedStar(StarRecord {
            identifier: TargetId::new(id),
            ra: qtty::Degrees::new(ra),
            dec: qtty::Degrees::new(dec),
            mag_fit: Some(mag),
            pm_ra: None,
            pm_dec: None,
        })
    }

    fn query(ra: f64, dec: f64, radius: f64, max_mag: f64, limit: usize) -> ConeQuery {
        ConeQuery {
            center_ra: qtty::Degrees::new(ra),
            center_dec: qtty::Degrees::new(dec),
            radius: qtty::Degrees::new(radius),
            max_magnitude: max_mag,
            limit,
        }
    }

    fn asteroid(id: &str, abs_mag: f64, eccentricity: f64) -> CelestialTarget {
        CelestialTarget::Asteroid(asteroid_record(id, abs_mag, eccentricity))
    }

    fn asteroid_record(id: &str, abs_mag: f64, eccentricity: f64) -> AsteroidRecord {
        AsteroidRecord {
            identifier: TargetId::new(id),
            number: None,
            name: id.to_string(),
            abs_mag: Some(abs_mag),
            slope: None,
            orbit_code: None,
            critical_code: None,
            astrometry_needed_code: None,
            elements: OrbitalElements {
                epoch: ModifiedJulianDate::new(59000.0),
                mean_anomaly: qtty::Degrees::new(10.0),
                arg_perihelion: qtty::Degrees::new(20.0),
                lon_ascending_node: qtty::Degrees::new(30.0),
                inclination: qtty::Degrees::new(5.0),
                eccentricity,
                semi_major_axis: 2.5,
            },
            ceu: CeuParameters::default(),
        }
    }

    #[tokio::test]
    async fn test_cone_search_filters_sorts_and_truncates() {
        let repo = LocalRepository::new();
        repo.insert_targets(vec![
            star("a", 10.0, 10.0, 9.0),
            star("b", 11.0, 10.0, 7.0),
            star("c", 10.0, 11.0, 13.0),
            star("d", 60.0, 10.0, 5.0),
            star("e", 10.5, 10.5, 8.0),
        ]);

        let hits = repo
            .cone_search(TargetCategory::Star, &query(10.0, 10.0, 5.0, 12.0, 2))
            .await
            .unwrap();
        let ids: Vec<&str> = hits.iter().map(|t| t.id().as_str()).collect();
        assert_eq!(ids, vec!["b", "e"]);

        let none = repo
            .cone_search(TargetCategory::Messier, &query(10.0, 10.0, 5.0, 12.0, 10))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_insert_replaces_same_identifier() {
        let repo = LocalRepository::new();
        repo.insert_target(star("a", 10.0, 10.0, 9.0));
        repo.insert_target(star("a", 10.0, 10.0, 4.0));
        assert_eq!(repo.target_count(), 1);

        let found = repo.get_targets(&[TargetId::new("a"), TargetId::new("zzz")]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fixed_magnitude(), Some(4.0));

        repo.insert_target(CelestialTarget::MessierObject(MessierRecord {
            identifier: TargetId::new("a"),
            object_type: "G".to_string(),
            ra: qtty::Degrees::new(1.0),
            dec: qtty::Degrees::new(1.0),
            mag_v: Some(9.0),
        }));
        assert_eq!(repo.target_count(), 1);
        let found = repo.get_targets(&[TargetId::new("a")]).await.unwrap();
        assert_eq!(found[0].category(), TargetCategory::Messier);
    }

    #[tokio::test]
    async fn test_unavailable_category_fails() {
        let repo = LocalRepository::new();
        repo.insert_target(star("a", 10.0, 10.0, 9.0));
        repo.set_category_available(TargetCategory::Star, false);
        let err = repo
            .cone_search(TargetCategory::Star, &query(10.0, 10.0, 5.0, 12.0, 2))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(err.context().category, Some(TargetCategory::Star));

        repo.set_category_available(TargetCategory::Star, true);
        assert!(repo
            .cone_search(TargetCategory::Star, &query(10.0, 10.0, 5.0, 12.0, 2))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_asteroid_candidates_use_tracks() {
        let repo = LocalRepository::new();
        repo.insert_targets(vec![asteroid("bright", 8.0, 0.1), asteroid("broken", 9.0, 1.4)]);
        let t = ModifiedJulianDate::new(59010.0);

        let count = repo
            .precompute_asteroid_tracks(
                ModifiedJulianDate::new(59000.0),
                ModifiedJulianDate::new(59030.0),
                10.0,
                3,
            )
            .unwrap();
        assert_eq!(count, 4);
        assert_eq!(repo.track_count(), 4);

        let here =
            DirectEphemeris::asteroid_ephemeris(&asteroid_record("bright", 8.0, 0.1), t).unwrap();

        // The broken orbit has no track and cannot be propagated, so it is
        // passed through for the selector to drop.
        let found = repo
            .asteroid_candidates(&query(here.ra.value(), here.dec.value(), 10.0, 30.0, 10), t)
            .await
            .unwrap();
        let ids: Vec<&str> = found.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["bright", "broken"]);

        let far = repo
            .asteroid_candidates(
                &query((here.ra.value() + 180.0) % 360.0, -here.dec.value(), 10.0, 30.0, 10),
                t,
            )
            .await
            .unwrap();
        let ids: Vec<&str> = far.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["broken"]);

        let limited = repo
            .asteroid_candidates(&query(here.ra.value(), here.dec.value(), 10.0, 30.0, 1), t)
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_asteroid_candidates_without_tracks_keep_broken_orbits() {
        let repo = LocalRepository::new();
        repo.insert_targets(vec![asteroid("broken", 9.0, 1.4)]);
        let found = repo
            .asteroid_candidates(&query(0.0, 0.0, 10.0, 30.0, 10), ModifiedJulianDate::new(59000.0))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn test_geoip_lookup() {
        let repo = LocalRepository::new();
        repo.insert_geoip_block(GeoIpBlock {
            start_ip: 200,
            end_ip: 300,
            latitude: 40.0,
            longitude: -105.0,
        });
        repo.insert_geoip_block(GeoIpBlock {
            start_ip: 100,
            end_ip: 150,
            latitude: 10.0,
            longitude: 20.0,
        });
        let lookup = |n: u32| {
            let repo = repo.clone();
            async move { repo.location_for_ip(Ipv4Addr::from(n)).await.unwrap() }
        };
        assert_eq!(lookup(120).await, Some((10.0, 20.0)));
        assert_eq!(lookup(250).await, Some((40.0, -105.0)));
        assert_eq!(lookup(175).await, None);
        assert_eq!(lookup(50).await, None);
    }

    #[test]
    fn test_from_json_file() {
        let snapshot = CatalogSnapshot {
            targets: vec![star("a", 10.0, 10.0, 9.0)],
            profiles: vec![UserProfile {
                user_id: 1,
                limiting_magnitude: Some(13.0),
                home_location: None,
            }],
            ..Default::default()
        };
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), serde_json::to_string(&snapshot).unwrap()).unwrap();

        let repo = LocalRepository::from_json_file(file.path()).unwrap();
        assert_eq!(repo.target_count(), 1);

        fs::write(file.path(), "{ not json").unwrap();
        let err = LocalRepository::from_json_file(file.path()).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(LocalRepository::from_json_file("/nonexistent/catalog.json").is_err());
    }
}
