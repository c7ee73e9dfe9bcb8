//! Candidate selector: targets near a sky point and brighter than a limit.
//!
//! Fixed catalogs are answered by the repository's cone search. Asteroids go
//! through two stages: the repository returns a coarse superset, then every
//! record is propagated to the query time and filtered exactly.

use crate::astro::angular_separation;
use crate::db::{CatalogRepository, ConeQuery, RepositoryResult};
use crate::ephemeris::DirectEphemeris;
use crate::models::{CelestialTarget, ModifiedJulianDate, Observer, TargetCategory};

/// Radius of the coarse asteroid pass never drops below this.
pub const ASTEROID_MIN_COARSE_RADIUS_DEG: f64 = 10.0;
/// The coarse asteroid pass asks for this many times the final limit.
pub const ASTEROID_COARSE_LIMIT_FACTOR: usize = 10;

/// One selector call: where, how faint, how many, when.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateQuery {
    pub center_ra: qtty::Degrees,
    pub center_dec: qtty::Degrees,
    pub radius: qtty::Degrees,
    /// Exclusive: only targets strictly brighter are kept.
    pub limiting_magnitude: f64,
    pub limit: usize,
    /// Instant mobile targets are propagated to.
    pub time: ModifiedJulianDate,
}

impl CandidateQuery {
    /// Query centred on the observer's zenith at `t`.
    pub fn around_zenith(
        observer: &Observer,
        t: ModifiedJulianDate,
        radius: qtty::Degrees,
        limiting_magnitude: f64,
        limit: usize,
    ) -> Self {
        let (center_ra, center_dec) = crate::astro::zenith(t, observer);
        Self {
            center_ra,
            center_dec,
            radius,
            limiting_magnitude,
            limit,
            time: t,
        }
    }

    fn cone(&self) -> ConeQuery {
        ConeQuery {
            center_ra: self.center_ra,
            center_dec: self.center_dec,
            radius: self.radius,
            max_magnitude: self.limiting_magnitude,
            limit: self.limit,
        }
    }

    fn coarse_asteroid_cone(&self) -> ConeQuery {
        ConeQuery {
            radius: qtty::Degrees::new(self.radius.value().max(ASTEROID_MIN_COARSE_RADIUS_DEG)),
            limit: self.limit.saturating_mul(ASTEROID_COARSE_LIMIT_FACTOR),
            ..self.cone()
        }
    }
}

/// Candidates of one category, brightest first, at most `query.limit`.
pub async fn select_candidates<R: CatalogRepository + ?Sized>(
    repo: &R,
    category: TargetCategory,
    query: &CandidateQuery,
) -> RepositoryResult<Vec<CelestialTarget>> {
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut selected = match category {
        TargetCategory::Asteroid => select_asteroids(repo, query).await?,
        _ => repo
            .cone_search(category, &query.cone())
            .await
            .map_err(|e| e.with_operation("select_candidates"))?
            .into_iter()
            .filter_map(|target| {
                let magnitude = target.fixed_magnitude()?;
                (magnitude < query.limiting_magnitude).then_some((magnitude, target))
            })
            .collect(),
    };

    sort_brightest_first(&mut selected);
    selected.truncate(query.limit);
    log::debug!(
        "Selected {} {} candidates within {:.1} deg",
        selected.len(),
        category,
        query.radius.value()
    );
    Ok(selected.into_iter().map(|(_, target)| target).collect())
}

async fn select_asteroids<R: CatalogRepository + ?Sized>(
    repo: &R,
    query: &CandidateQuery,
) -> RepositoryResult<Vec<(f64, CelestialTarget)>> {
    let coarse = repo
        .asteroid_candidates(&query.coarse_asteroid_cone(), query.time)
        .await
        .map_err(|e| e.with_operation("select_asteroids"))?;

    let mut selected = Vec::new();
    for record in coarse {
        let ephemeris = match DirectEphemeris::asteroid_ephemeris(&record, query.time) {
            Ok(ephemeris) => ephemeris,
            Err(e) => {
                log::warn!("Skipping asteroid {}: {}", record.identifier, e);
                continue;
            }
        };
        let Some(magnitude) = ephemeris.magnitude else {
            log::debug!("Skipping asteroid {}: no magnitude", record.identifier);
            continue;
        };
        if magnitude >= query.limiting_magnitude {
            continue;
        }
        let separation =
            angular_separation(query.center_ra, query.center_dec, ephemeris.ra, ephemeris.dec);
        if separation.value() > query.radius.value() {
            continue;
        }
        selected.push((magnitude, CelestialTarget::Asteroid(record)));
    }
    Ok(selected)
}

/// Ascending magnitude; identifiers break ties so output is deterministic.
fn sort_brightest_first(items: &mut [(f64, CelestialTarget)]) {
    items.sort_by(|(ma, a), (mb, b)| ma.total_cmp(mb).then_with(|| a.id().cmp(b.id())));
}
