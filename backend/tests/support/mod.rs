#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use cosmic_planner::api::PlanRequest;
use cosmic_planner::astro::zenith;
use cosmic_planner::db::LocalRepository;
use cosmic_planner::models::{
    AsteroidRecord, CelestialTarget, CeuParameters, ExoplanetRecord, ExtendedSourceRecord,
    MessierRecord, ModifiedJulianDate, Observer, OrbitalElements, StarRecord, TargetId,
    TransitElements, UserDetectionRecord, VariableStarRecord,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scenario: Colorado site, 2020-06-01T04:00:00Z, limiting magnitude 12.
// ---------------------------------------------------------------------------

pub const SCENARIO_LIMITING_MAGNITUDE: f64 = 12.0;

pub fn scenario_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, 1, 4, 0, 0).unwrap()
}

pub fn scenario_observer() -> Observer {
    Observer::new(40.0, -105.0, 1600.0).unwrap()
}

pub fn scenario_request() -> PlanRequest {
    PlanRequest {
        limiting_magnitude: Some(SCENARIO_LIMITING_MAGNITUDE),
        ..PlanRequest::at(40.0, -105.0, 1600.0, scenario_start())
    }
}

/// `(ra, dec)` of the scenario zenith at the window start.
pub fn scenario_zenith() -> (f64, f64) {
    let t = ModifiedJulianDate::from_datetime(scenario_start());
    let (ra, dec) = zenith(t, &scenario_observer());
    (ra.value(), dec.value())
}

fn wrap_ra(ra: f64) -> f64 {
    ra.rem_euclid(360.0)
}

pub fn star(id: &str, ra: f64, dec: f64, mag: f64) -> CelestialTarget {
    CelestialTarget::FixedStar(StarRecord {
        identifier: TargetId::new(id),
        ra: qtty::Degrees::new(wrap_ra(ra)),
        dec: qtty::Degrees::new(dec),
        mag_fit: Some(mag),
        pm_ra: None,
        pm_dec: None,
    })
}

pub fn ceres() -> AsteroidRecord {
    AsteroidRecord {
        identifier: TargetId::new("(1) Ceres"),
        number: Some(1),
        name: "Ceres".to_string(),
        abs_mag: Some(3.34),
        slope: Some(0.12),
        orbit_code: None,
        critical_code: None,
        astrometry_needed_code: None,
        elements: OrbitalElements {
            epoch: ModifiedJulianDate::new(59000.0),
            mean_anomaly: qtty::Degrees::new(162.7),
            arg_perihelion: qtty::Degrees::new(73.6),
            lon_ascending_node: qtty::Degrees::new(80.3),
            inclination: qtty::Degrees::new(10.59),
            eccentricity: 0.0785,
            semi_major_axis: 2.7663,
        },
        ceu: CeuParameters::default(),
    }
}

/// A mixed catalog clustered around the scenario zenith.
pub fn scenario_targets() -> Vec<CelestialTarget> {
    let (ra, dec) = scenario_zenith();
    vec![
        star("HIP 80000", ra, dec, 6.0),
        star("UCAC4 650-000001", ra + 5.0, dec - 5.0, 10.5),
        star("UCAC4 650-000002", ra - 3.0, dec + 2.0, 12.5),
        star("UCAC4 050-000003", ra + 180.0, -80.0, 4.0),
        CelestialTarget::VariableStar(VariableStarRecord {
            identifier: TargetId::new("V0001 Her"),
            ra: qtty::Degrees::new(wrap_ra(ra + 10.0)),
            dec: qtty::Degrees::new(dec + 5.0),
            variable_type: "M".to_string(),
            mag_max: Some(8.0),
            mag_min: Some(11.0),
            period: Some(qtty::Days::new(280.0)),
        }),
        CelestialTarget::ExtendedSource(ExtendedSourceRecord {
            identifier: TargetId::new("2MASX J16000000+3800000"),
            ra: qtty::Degrees::new(wrap_ra(ra - 8.0)),
            dec: qtty::Degrees::new(dec - 2.0),
            k_mag: Some(9.0),
            semi_major: Some(qtty::Arcseconds::new(60.0)),
            axis_ratio: Some(0.5),
            position_angle: None,
        }),
        CelestialTarget::MessierObject(MessierRecord {
            identifier: TargetId::new("M13"),
            object_type: "GlC".to_string(),
            ra: qtty::Degrees::new(wrap_ra(ra - 15.0)),
            dec: qtty::Degrees::new(dec - 3.5),
            mag_v: Some(5.8),
        }),
        CelestialTarget::Exoplanet(ExoplanetRecord {
            identifier: TargetId::new("HAT-P-0 b"),
            star_identifier: "HAT-P-0".to_string(),
            ra: qtty::Degrees::new(wrap_ra(ra + 12.0)),
            dec: qtty::Degrees::new(dec - 10.0),
            mag_v: Some(10.0),
            transit: TransitElements {
                epoch: Some(ModifiedJulianDate::new(58000.25)),
                period: Some(qtty::Days::new(3.5)),
                duration: Some(qtty::Days::new(0.1)),
            },
            transit_depth: Some(0.01),
        }),
        CelestialTarget::UserDetection(UserDetectionRecord {
            identifier: TargetId::new("detection-42"),
            ra: qtty::Degrees::new(wrap_ra(ra + 2.0)),
            dec: qtty::Degrees::new(dec + 1.0),
            magnitude: Some(11.0),
            image_id: 42,
            catalog_match: false,
        }),
        CelestialTarget::Asteroid(ceres()),
    ]
}

pub fn scenario_repository() -> LocalRepository {
    let repo = LocalRepository::new();
    repo.insert_targets(scenario_targets());
    repo
}
