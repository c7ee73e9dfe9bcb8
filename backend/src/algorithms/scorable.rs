//! Score composition.
//!
//! `score = value × difficulty × user_difficulty × observatory_correction`,
//! evaluated for one target at one instant. The observatory correction only
//! applies when the context carries an [`Observer`].

use crate::ephemeris::EphemerisProvider;
use crate::models::{CelestialTarget, ModifiedJulianDate, Observer};

use super::difficulty::{
    ceu_at, ceu_difficulty, limiting_dso_magnitude_difficulty,
    limiting_stellar_magnitude_difficulty, zenith_difficulty, DEFAULT_MIN_ALTITUDE_DEG,
    DEFAULT_MISSING_CEU_ARCSEC, DEFAULT_TARGET_CEU_ARCSEC,
};
use super::tables::ScoringTables;
use super::value::ValueModel;

/// Tunable constants of the difficulty model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParameters {
    pub min_altitude: qtty::Degrees,
    pub target_ceu: qtty::Arcseconds,
    pub missing_ceu: qtty::Arcseconds,
}

impl Default for ScoringParameters {
    fn default() -> Self {
        Self {
            min_altitude: qtty::Degrees::new(DEFAULT_MIN_ALTITUDE_DEG),
            target_ceu: qtty::Arcseconds::new(DEFAULT_TARGET_CEU_ARCSEC),
            missing_ceu: qtty::Arcseconds::new(DEFAULT_MISSING_CEU_ARCSEC),
        }
    }
}

/// Everything a score evaluation reads besides the target and the instant.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    pub ephemeris: &'a dyn EphemerisProvider,
    pub tables: &'a ScoringTables,
    pub params: ScoringParameters,
    /// Limiting magnitude already resolved from the user context.
    pub limiting_magnitude: f64,
    /// Site for the zenith correction; `None` disables it.
    pub observer: Option<Observer>,
}

impl<'a> ScoringContext<'a> {
    pub fn new(ephemeris: &'a dyn EphemerisProvider, limiting_magnitude: f64) -> Self {
        Self {
            ephemeris,
            tables: ScoringTables::standard(),
            params: ScoringParameters::default(),
            limiting_magnitude,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Option<Observer>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_params(mut self, params: ScoringParameters) -> Self {
        self.params = params;
        self
    }

    pub fn with_tables(mut self, tables: &'a ScoringTables) -> Self {
        self.tables = tables;
        self
    }
}

/// Capability interface every catalog target implements.
///
/// Factors returning `None` signal missing ephemeris data: the target is
/// excluded for that instant instead of scoring 0.
pub trait Scorable {
    fn value_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> f64;

    /// Intrinsic, observer-independent difficulty.
    fn difficulty_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> f64;

    /// Difficulty given the user's limiting magnitude.
    fn user_difficulty_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> Option<f64>;

    /// Zenith difficulty when an observer is set, otherwise 1.
    fn observatory_correction(
        &self,
        t: ModifiedJulianDate,
        ctx: &ScoringContext<'_>,
    ) -> Option<f64>;

    fn score_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> Option<f64> {
        let correction = self.observatory_correction(t, ctx)?;
        let user_difficulty = self.user_difficulty_at(t, ctx)?;
        let score =
            self.value_at(t, ctx) * self.difficulty_at(t, ctx) * user_difficulty * correction;
        Some(if score.is_finite() { score.max(0.0) } else { 0.0 })
    }
}

impl CelestialTarget {
    /// Whether the diffuse-source magnitude policy applies.
    pub fn is_extended(&self, tables: &ScoringTables) -> bool {
        match self {
            CelestialTarget::ExtendedSource(_) => true,
            CelestialTarget::MessierObject(record) => {
                tables.messier_types.lookup(&record.object_type).extended
            }
            _ => false,
        }
    }
}

impl Scorable for CelestialTarget {
    fn value_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> f64 {
        ValueModel::new(ctx.tables).value_at(self, t)
    }

    fn difficulty_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> f64 {
        match self {
            CelestialTarget::Asteroid(record) => {
                let ceu = ceu_at(&record.ceu, t, ctx.params.missing_ceu);
                ceu_difficulty(ceu, ctx.params.target_ceu)
            }
            CelestialTarget::MessierObject(record) => {
                ctx.tables.messier_types.lookup(&record.object_type).difficulty
            }
            _ => 1.0,
        }
    }

    fn user_difficulty_at(&self, t: ModifiedJulianDate, ctx: &ScoringContext<'_>) -> Option<f64> {
        let magnitude = ctx.ephemeris.magnitude_at(self, t)?;
        Some(if self.is_extended(ctx.tables) {
            limiting_dso_magnitude_difficulty(magnitude, ctx.limiting_magnitude)
        } else {
            limiting_stellar_magnitude_difficulty(magnitude, ctx.limiting_magnitude)
        })
    }

    fn observatory_correction(
        &self,
        t: ModifiedJulianDate,
        ctx: &ScoringContext<'_>,
    ) -> Option<f64> {
        match ctx.observer {
            None => Some(1.0),
            Some(observer) => {
                let (ra, dec) = ctx.ephemeris.sky_coords_at(self, t)?;
                let alt = crate::astro::altitude(ra, dec, t, &observer);
                Some(zenith_difficulty(alt, ctx.params.min_altitude))
            }
        }
    }
}
