//! Plan assembler.
//!
//! 1. Resolve observer, window and limits ([`resolve_request`]).
//! 2. Fetch candidates for every category concurrently; a failing category
//!    is logged and dropped.
//! 3. Score every candidate on a pool of blocking workers, then join.
//! 4. Rank by descending score, filter, truncate.
//! 5. Time-box the survivors, attach rise/transit/set and exposures.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::algorithms::{peak_score, step_from_minutes, PeakScore, Scorable, ScoringContext};
use crate::algorithms::{ScoringParameters, ScoringTables};
use crate::api::{ObservingPlan, ObservingPlanEntry, PlanRequest};
use crate::astro::rise_transit_set;
use crate::config::PlannerConfig;
use crate::db::{CatalogRepository, FullRepository};
use crate::ephemeris::{CachedEphemeris, DirectEphemeris, EphemerisProvider};
use crate::error::{PlanError, PlanResult};
use crate::models::{CelestialTarget, ModifiedJulianDate, Observer, TargetCategory};

use super::candidates::{select_candidates, CandidateQuery};
use super::exposure::{time_box, ExposurePolicy};
use super::observer::{resolve_request, ResolvedRequest};

/// Geometric horizon used for reported rise and set times.
const RISE_SET_HORIZON_DEG: f64 = 0.0;
/// Work units handed out per scoring worker.
const CHUNKS_PER_WORKER: usize = 4;

/// Builds observing plans against a repository.
///
/// Cheap to clone; concurrent `assemble_plan` calls share nothing mutable.
#[derive(Clone)]
pub struct PlanAssembler {
    repository: Arc<dyn FullRepository>,
    config: Arc<PlannerConfig>,
    tables: &'static ScoringTables,
}

/// Inputs every scoring worker reads.
#[derive(Clone, Copy)]
struct ScoringJob {
    observer: Observer,
    limiting_magnitude: f64,
    params: ScoringParameters,
    tables: &'static ScoringTables,
    start: ModifiedJulianDate,
    end: ModifiedJulianDate,
    step: qtty::Days,
    find_peaks: bool,
}

struct ScoredCandidate {
    target: CelestialTarget,
    score_at_start: Option<f64>,
    peak: Option<PeakScore>,
}

struct RankedCandidate {
    scored: ScoredCandidate,
    score: f64,
    preferred_start: ModifiedJulianDate,
}

impl PlanAssembler {
    pub fn new(repository: Arc<dyn FullRepository>, config: PlannerConfig) -> Self {
        Self {
            repository,
            config: Arc::new(config),
            tables: ScoringTables::standard(),
        }
    }

    pub fn with_tables(mut self, tables: &'static ScoringTables) -> Self {
        self.tables = tables;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub async fn assemble_plan(&self, request: &PlanRequest) -> PlanResult<ObservingPlan> {
        self.assemble(request, Arc::new(AtomicBool::new(false)))
            .await
    }

    /// Like [`Self::assemble_plan`], abandoned as soon as `cancel` completes.
    /// Cancellation wins when both are ready.
    ///
    /// In-flight workers observe a shared stop flag and return early; nothing
    /// computed so far is returned.
    pub async fn assemble_plan_with_cancel<F>(
        &self,
        request: &PlanRequest,
        cancel: F,
    ) -> PlanResult<ObservingPlan>
    where
        F: Future<Output = ()>,
    {
        let stop = Arc::new(AtomicBool::new(false));
        tokio::select! {
            biased;
            _ = cancel => {
                stop.store(true, Ordering::Relaxed);
                log::info!("Plan computation cancelled by caller");
                Err(PlanError::Cancelled)
            }
            result = self.assemble(request, Arc::clone(&stop)) => result,
        }
    }

    async fn assemble(
        &self,
        request: &PlanRequest,
        stop: Arc<AtomicBool>,
    ) -> PlanResult<ObservingPlan> {
        let resolved = resolve_request(request, &self.config, self.repository.as_ref()).await?;
        log::info!(
            "Planning {} .. {} at lat {:.4} lon {:.4} (limit mag {:.2}, {:?} location)",
            resolved.window_start.to_rfc3339(),
            resolved.window_end.to_rfc3339(),
            resolved.observer().latitude.value(),
            resolved.observer().longitude.value(),
            resolved.limiting_magnitude,
            resolved.location.source,
        );

        let (candidates, dropped_categories) = self.gather_candidates(&resolved).await;
        if stop.load(Ordering::Relaxed) {
            return Err(PlanError::Cancelled);
        }

        let job = ScoringJob {
            observer: resolved.observer(),
            limiting_magnitude: resolved.limiting_magnitude,
            params: self.config.scoring_parameters(),
            tables: self.tables,
            start: resolved.window_start,
            end: resolved.window_end,
            step: step_from_minutes(self.config.scoring.step_minutes),
            find_peaks: resolved.find_peaks,
        };
        let candidate_count = candidates.len();
        let scored = self.score_candidates(candidates, job, &stop).await?;
        let entries = self.build_entries(scored, &resolved);

        log::info!(
            "Assembled plan with {} entries from {} candidates ({} categories dropped)",
            entries.len(),
            candidate_count,
            dropped_categories.len()
        );

        Ok(ObservingPlan {
            location: resolved.location,
            window_start: resolved.window_start,
            window_end: resolved.window_end,
            limiting_magnitude: resolved.limiting_magnitude,
            entries,
            dropped_categories,
        })
    }

    /// Source-set targets plus catalog candidates, without duplicates.
    async fn gather_candidates(
        &self,
        resolved: &ResolvedRequest,
    ) -> (Vec<CelestialTarget>, Vec<TargetCategory>) {
        let repo = self.repository.as_ref();
        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        let mut dropped = Vec::new();

        if !resolved.source_targets.is_empty() {
            match repo.get_targets(&resolved.source_targets).await {
                Ok(targets) => {
                    for target in targets {
                        if seen.insert(target.id().clone()) {
                            candidates.push(target);
                        }
                    }
                }
                Err(e) => log::warn!("Could not load candidate source sets: {}", e),
            }
        }

        if !resolved.searches_catalogs() {
            return (candidates, dropped);
        }

        let query = CandidateQuery::around_zenith(
            &resolved.observer(),
            resolved.window_start,
            resolved.radius,
            resolved.limiting_magnitude,
            resolved.category_limit,
        );
        let fetches = resolved.categories.iter().map(|&category| {
            let query = &query;
            async move { (category, select_candidates(repo, category, query).await) }
        });

        for (category, result) in join_all(fetches).await {
            match result {
                Ok(targets) => {
                    for target in targets {
                        if seen.insert(target.id().clone()) {
                            candidates.push(target);
                        }
                    }
                }
                Err(e) => {
                    log::warn!("Dropping category {} from the plan: {}", category, e);
                    dropped.push(category);
                }
            }
        }
        (candidates, dropped)
    }

    /// Fan-out over blocking workers; returns once every worker has finished.
    async fn score_candidates(
        &self,
        mut candidates: Vec<CelestialTarget>,
        job: ScoringJob,
        stop: &Arc<AtomicBool>,
    ) -> PlanResult<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.config.worker_threads().max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let chunk_size = candidates
            .len()
            .div_ceil(workers * CHUNKS_PER_WORKER)
            .max(1);

        let mut tasks = JoinSet::new();
        while !candidates.is_empty() {
            let rest = candidates.split_off(chunk_size.min(candidates.len()));
            let chunk = std::mem::replace(&mut candidates, rest);
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| PlanError::Internal(format!("Scoring pool closed: {}", e)))?;
            let stop = Arc::clone(stop);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                score_chunk(chunk, &job, &stop)
            });
        }

        let mut scored = Vec::new();
        while let Some(result) = tasks.join_next().await {
            scored.extend(result?);
        }
        if stop.load(Ordering::Relaxed) {
            return Err(PlanError::Cancelled);
        }
        Ok(scored)
    }

    fn build_entries(
        &self,
        scored: Vec<ScoredCandidate>,
        resolved: &ResolvedRequest,
    ) -> Vec<ObservingPlanEntry> {
        let total = scored.len();
        let mut ranked: Vec<RankedCandidate> = scored
            .into_iter()
            .filter_map(|candidate| {
                let (score, preferred_start) = match candidate.peak {
                    Some(peak) => (peak.score, peak.time),
                    None => (candidate.score_at_start?, resolved.window_start),
                };
                (score > 0.0 && score >= resolved.minimum_score).then_some(RankedCandidate {
                    scored: candidate,
                    score,
                    preferred_start,
                })
            })
            .collect();
        log::debug!(
            "{} of {} candidates passed the score threshold",
            ranked.len(),
            total
        );

        ranked.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.scored.target.id().cmp(b.scored.target.id()))
        });
        ranked.truncate(resolved.max_entries);

        let preferred: Vec<ModifiedJulianDate> =
            ranked.iter().map(|r| r.preferred_start).collect();
        let mut slots = time_box(
            &preferred,
            resolved.window_start,
            resolved.window_end,
            resolved.min_spacing,
            resolved.max_spacing,
        );
        slots.sort_by_key(|slot| slot.index);

        let observer = resolved.observer();
        let policy =
            ExposurePolicy::from_settings(&self.config.exposure, resolved.limiting_magnitude);
        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            let candidate = &ranked[slot.index];
            let target = &candidate.scored.target;
            let Some(ephemeris) = DirectEphemeris.ephemeris_at(target, slot.start) else {
                log::warn!("No ephemeris for {} at its scheduled start", target.id());
                continue;
            };
            let duration = policy.duration(ephemeris.magnitude);
            entries.push(ObservingPlanEntry {
                rank: entries.len() + 1,
                identifier: target.id().clone(),
                category: target.category(),
                ra: ephemeris.ra,
                dec: ephemeris.dec,
                magnitude: ephemeris.magnitude,
                score: candidate.score,
                score_at_window_start: candidate.scored.score_at_start,
                peak_time: candidate.scored.peak.map(|p| p.time),
                start_time: slot.start,
                rise_transit_set: rise_transit_set(
                    ephemeris.ra,
                    ephemeris.dec,
                    &observer,
                    slot.start,
                    qtty::Degrees::new(RISE_SET_HORIZON_DEG),
                ),
                exposure_count: policy.count(slot.slot, duration),
                exposure_duration: duration,
            });
        }
        entries
    }
}

/// Runs on a blocking worker with its own ephemeris memo.
fn score_chunk(
    chunk: Vec<CelestialTarget>,
    job: &ScoringJob,
    stop: &AtomicBool,
) -> Vec<ScoredCandidate> {
    let cache = CachedEphemeris::new();
    let ctx = ScoringContext::new(&cache, job.limiting_magnitude)
        .with_observer(Some(job.observer))
        .with_params(job.params)
        .with_tables(job.tables);

    let mut scored = Vec::with_capacity(chunk.len());
    for target in chunk {
        if stop.load(Ordering::Relaxed) {
            break;
        }
        // Source-set targets bypass the selector, so its magnitude cut is repeated here.
        if let Some(mag) = cache.magnitude_at(&target, job.start) {
            if mag >= job.limiting_magnitude {
                log::debug!(
                    "Skipping {}: magnitude {:.2} is not brighter than the limit {:.2}",
                    target.id(),
                    mag,
                    job.limiting_magnitude
                );
                continue;
            }
        }
        let score_at_start = target.score_at(job.start, &ctx);
        let peak = if job.find_peaks {
            peak_score(&target, job.start, job.end, job.step, &ctx)
        } else {
            None
        };
        if score_at_start.is_none() && peak.is_none() {
            log::debug!("No ephemeris for {} in the window; skipped", target.id());
        }
        scored.push(ScoredCandidate {
            target,
            score_at_start,
            peak,
        });
    }
    scored
}
