//! Planner configuration file support.
//!
//! Settings are read from a TOML file; every field has a default so a
//! partial (or missing) file is valid. A handful of environment variables
//! override the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithms::difficulty::{
    DEFAULT_MIN_ALTITUDE_DEG, DEFAULT_MISSING_CEU_ARCSEC, DEFAULT_TARGET_CEU_ARCSEC,
};
use crate::algorithms::peak::DEFAULT_STEP_MINUTES;
use crate::algorithms::ScoringParameters;
use crate::error::{PlanError, PlanResult};
use crate::models::ANONYMOUS_LIMITING_MAGNITUDE;

/// Explicit configuration file path.
pub const CONFIG_PATH_ENV: &str = "PLANNER_CONFIG";
/// Overrides `workers.threads`.
pub const WORKERS_ENV: &str = "PLANNER_WORKERS";
/// Overrides `scoring.step_minutes`.
pub const STEP_MINUTES_ENV: &str = "PLANNER_STEP_MINUTES";

const CONFIG_FILE_NAME: &str = "planner.toml";

/// Ceiling for `limits.max_category_limit`.
pub const HARD_MAX_CATEGORY_LIMIT: usize = 500;
/// Ceiling for `limits.max_radius_deg`.
pub const HARD_MAX_RADIUS_DEG: f64 = 90.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub exposure: ExposureSettings,
    #[serde(default)]
    pub workers: WorkerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringSettings {
    /// Peak finder resolution.
    #[serde(default = "default_step_minutes")]
    pub step_minutes: f64,
    #[serde(default = "default_min_altitude_deg")]
    pub min_altitude_deg: f64,
    /// Limiting magnitude used when the caller is not authenticated.
    #[serde(default = "default_anonymous_limiting_magnitude")]
    pub anonymous_limiting_magnitude: f64,
    #[serde(default = "default_target_ceu_arcsec")]
    pub target_ceu_arcsec: f64,
    #[serde(default = "default_missing_ceu_arcsec")]
    pub missing_ceu_arcsec: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_category_limit")]
    pub default_category_limit: usize,
    #[serde(default = "default_max_category_limit")]
    pub max_category_limit: usize,
    #[serde(default = "default_radius_deg")]
    pub default_radius_deg: f64,
    #[serde(default = "default_max_radius_deg")]
    pub max_radius_deg: f64,
    #[serde(default = "default_plan_limit")]
    pub default_plan_limit: usize,
    #[serde(default = "default_max_plan_limit")]
    pub max_plan_limit: usize,
    #[serde(default = "default_window_hours")]
    pub default_window_hours: f64,
    /// Longest window a request may ask for.
    #[serde(default = "default_max_window_hours")]
    pub max_window_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureSettings {
    #[serde(default = "default_min_spacing_minutes")]
    pub default_min_spacing_minutes: f64,
    #[serde(default = "default_max_spacing_minutes")]
    pub default_max_spacing_minutes: f64,
    /// Exposure for a target five magnitudes above the limit.
    #[serde(default = "default_base_exposure_seconds")]
    pub base_exposure_seconds: f64,
    #[serde(default = "default_min_exposure_seconds")]
    pub min_exposure_seconds: f64,
    #[serde(default = "default_max_exposure_seconds")]
    pub max_exposure_seconds: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Scoring worker count; 0 uses all available cores.
    #[serde(default)]
    pub threads: usize,
}

fn default_step_minutes() -> f64 {
    DEFAULT_STEP_MINUTES
}

fn default_min_altitude_deg() -> f64 {
    DEFAULT_MIN_ALTITUDE_DEG
}

fn default_anonymous_limiting_magnitude() -> f64 {
    ANONYMOUS_LIMITING_MAGNITUDE
}

fn default_target_ceu_arcsec() -> f64 {
    DEFAULT_TARGET_CEU_ARCSEC
}

fn default_missing_ceu_arcsec() -> f64 {
    DEFAULT_MISSING_CEU_ARCSEC
}

fn default_category_limit() -> usize {
    25
}

fn default_max_category_limit() -> usize {
    500
}

fn default_radius_deg() -> f64 {
    30.0
}

fn default_max_radius_deg() -> f64 {
    90.0
}

fn default_plan_limit() -> usize {
    100
}

fn default_max_plan_limit() -> usize {
    500
}

fn default_window_hours() -> f64 {
    8.0
}

fn default_max_window_hours() -> f64 {
    48.0
}

fn default_min_spacing_minutes() -> f64 {
    5.0
}

fn default_max_spacing_minutes() -> f64 {
    30.0
}

fn default_base_exposure_seconds() -> f64 {
    30.0
}

fn default_min_exposure_seconds() -> f64 {
    1.0
}

fn default_max_exposure_seconds() -> f64 {
    300.0
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            step_minutes: default_step_minutes(),
            min_altitude_deg: default_min_altitude_deg(),
            anonymous_limiting_magnitude: default_anonymous_limiting_magnitude(),
            target_ceu_arcsec: default_target_ceu_arcsec(),
            missing_ceu_arcsec: default_missing_ceu_arcsec(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            default_category_limit: default_category_limit(),
            max_category_limit: default_max_category_limit(),
            default_radius_deg: default_radius_deg(),
            max_radius_deg: default_max_radius_deg(),
            default_plan_limit: default_plan_limit(),
            max_plan_limit: default_max_plan_limit(),
            default_window_hours: default_window_hours(),
            max_window_hours: default_max_window_hours(),
        }
    }
}

impl Default for ExposureSettings {
    fn default() -> Self {
        Self {
            default_min_spacing_minutes: default_min_spacing_minutes(),
            default_max_spacing_minutes: default_max_spacing_minutes(),
            base_exposure_seconds: default_base_exposure_seconds(),
            min_exposure_seconds: default_min_exposure_seconds(),
            max_exposure_seconds: default_max_exposure_seconds(),
        }
    }
}

impl PlannerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PlanResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PlanError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PlanResult<Self> {
        let config: PlannerConfig = toml::from_str(content)
            .map_err(|e| PlanError::Configuration(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `planner.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> PlanResult<Self> {
        let search_paths = [
            PathBuf::from(CONFIG_FILE_NAME),
            PathBuf::from("backend").join(CONFIG_FILE_NAME),
            PathBuf::from("..").join(CONFIG_FILE_NAME),
        ];

        for path in search_paths.iter() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Err(PlanError::Configuration(format!(
            "No {} found in standard locations",
            CONFIG_FILE_NAME
        )))
    }

    /// Resolve the effective configuration.
    ///
    /// `PLANNER_CONFIG` wins when set, then the default search path, then
    /// built-in defaults. Environment overrides are applied last.
    pub fn load() -> PlanResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path.trim())?,
            _ => match Self::from_default_location() {
                Ok(config) => config,
                Err(e) => {
                    log::debug!("Using built-in planner defaults: {}", e);
                    Self::default()
                }
            },
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply `PLANNER_WORKERS` and `PLANNER_STEP_MINUTES`.
    pub fn apply_env_overrides(&mut self) -> PlanResult<()> {
        if let Ok(val) = std::env::var(WORKERS_ENV) {
            self.workers.threads = val.trim().parse().map_err(|e| {
                PlanError::Configuration(format!("Invalid {} '{}': {}", WORKERS_ENV, val, e))
            })?;
        }
        if let Ok(val) = std::env::var(STEP_MINUTES_ENV) {
            self.scoring.step_minutes = val.trim().parse().map_err(|e| {
                PlanError::Configuration(format!("Invalid {} '{}': {}", STEP_MINUTES_ENV, val, e))
            })?;
        }
        self.validate()
    }

    pub fn validate(&self) -> PlanResult<()> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(PlanError::Configuration(format!(
                    "'{}' must be a positive number, got {}",
                    name, value
                )))
            }
        };

        positive("scoring.step_minutes", self.scoring.step_minutes)?;
        positive("scoring.target_ceu_arcsec", self.scoring.target_ceu_arcsec)?;
        positive("scoring.missing_ceu_arcsec", self.scoring.missing_ceu_arcsec)?;
        positive("limits.default_radius_deg", self.limits.default_radius_deg)?;
        positive("limits.max_radius_deg", self.limits.max_radius_deg)?;
        positive("limits.default_window_hours", self.limits.default_window_hours)?;
        positive("limits.max_window_hours", self.limits.max_window_hours)?;
        positive(
            "exposure.default_min_spacing_minutes",
            self.exposure.default_min_spacing_minutes,
        )?;
        positive("exposure.base_exposure_seconds", self.exposure.base_exposure_seconds)?;
        positive("exposure.min_exposure_seconds", self.exposure.min_exposure_seconds)?;

        if !(-90.0..=90.0).contains(&self.scoring.min_altitude_deg) {
            return Err(PlanError::Configuration(format!(
                "'scoring.min_altitude_deg' must be within [-90, 90], got {}",
                self.scoring.min_altitude_deg
            )));
        }
        if !self.scoring.anonymous_limiting_magnitude.is_finite() {
            return Err(PlanError::Configuration(
                "'scoring.anonymous_limiting_magnitude' must be finite".to_string(),
            ));
        }
        if self.exposure.default_max_spacing_minutes < self.exposure.default_min_spacing_minutes {
            return Err(PlanError::Configuration(
                "'exposure.default_max_spacing_minutes' is below the minimum spacing".to_string(),
            ));
        }
        if self.exposure.max_exposure_seconds < self.exposure.min_exposure_seconds {
            return Err(PlanError::Configuration(
                "'exposure.max_exposure_seconds' is below the minimum exposure".to_string(),
            ));
        }
        if self.limits.max_category_limit == 0 || self.limits.max_plan_limit == 0 {
            return Err(PlanError::Configuration(
                "Result caps must be at least 1".to_string(),
            ));
        }
        if self.limits.max_category_limit > HARD_MAX_CATEGORY_LIMIT {
            return Err(PlanError::Configuration(format!(
                "'limits.max_category_limit' must not exceed {}, got {}",
                HARD_MAX_CATEGORY_LIMIT, self.limits.max_category_limit
            )));
        }
        if self.limits.max_radius_deg > HARD_MAX_RADIUS_DEG {
            return Err(PlanError::Configuration(format!(
                "'limits.max_radius_deg' must not exceed {}, got {}",
                HARD_MAX_RADIUS_DEG, self.limits.max_radius_deg
            )));
        }
        if self.limits.default_window_hours > self.limits.max_window_hours {
            return Err(PlanError::Configuration(
                "'limits.default_window_hours' is above 'limits.max_window_hours'".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of scoring workers to run.
    pub fn worker_threads(&self) -> usize {
        if self.workers.threads > 0 {
            return self.workers.threads;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }

    pub fn scoring_parameters(&self) -> ScoringParameters {
        ScoringParameters {
            min_altitude: qtty::Degrees::new(self.scoring.min_altitude_deg),
            target_ceu: qtty::Arcseconds::new(self.scoring.target_ceu_arcsec),
            missing_ceu: qtty::Arcseconds::new(self.scoring.missing_ceu_arcsec),
        }
    }
}
