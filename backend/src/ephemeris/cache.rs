use std::cell::RefCell;
use std::collections::HashMap;

use super::{DirectEphemeris, Ephemeris, EphemerisProvider};
use crate::models::{CelestialTarget, ModifiedJulianDate, TargetId};

/// Per-worker memo of mobile-target ephemerides keyed by `(target, instant)`.
///
/// Fixed targets bypass the memo. Not `Sync`: every scoring worker owns one
/// for the lifetime of a single plan request.
#[derive(Debug, Default)]
pub struct CachedEphemeris<P = DirectEphemeris> {
    inner: P,
    entries: RefCell<HashMap<TargetId, HashMap<u64, Option<Ephemeris>>>>,
}

impl CachedEphemeris<DirectEphemeris> {
    pub fn new() -> Self {
        Self::with_provider(DirectEphemeris)
    }
}

impl<P: EphemerisProvider> CachedEphemeris<P> {
    pub fn with_provider(inner: P) -> Self {
        Self {
            inner,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Number of memoized `(target, instant)` pairs.
    pub fn len(&self) -> usize {
        self.entries.borrow().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl<P: EphemerisProvider> EphemerisProvider for CachedEphemeris<P> {
    fn ephemeris_at(&self, target: &CelestialTarget, t: ModifiedJulianDate) -> Option<Ephemeris> {
        if !target.is_mobile() {
            return self.inner.ephemeris_at(target, t);
        }

        let key = t.to_bits();
        if let Some(hit) = self
            .entries
            .borrow()
            .get(target.id())
            .and_then(|per_target| per_target.get(&key))
        {
            return *hit;
        }

        let computed = self.inner.ephemeris_at(target, t);
        self.entries
            .borrow_mut()
            .entry(target.id().clone())
            .or_default()
            .insert(key, computed);
        computed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AsteroidRecord, CeuParameters, MessierRecord, OrbitalElements};
    use std::cell::Cell;

    struct CountingProvider {
        calls: Cell<usize>,
    }

    impl EphemerisProvider for CountingProvider {
        fn ephemeris_at(
            &self,
            target: &CelestialTarget,
            t: ModifiedJulianDate,
        ) -> Option<Ephemeris> {
            self.calls.set(self.calls.get() + 1);
            DirectEphemeris.ephemeris_at(target, t)
        }
    }

    fn ceres() -> CelestialTarget {
        CelestialTarget::Asteroid(AsteroidRecord {
            identifier: TargetId::new("(1) Ceres"),
            number: Some(1),
            name: "Ceres".to_string(),
            abs_mag: Some(3.34),
            slope: None,
            orbit_code: None,
            critical_code: None,
            astrometry_needed_code: None,
            elements: OrbitalElements {
                epoch: ModifiedJulianDate::new(58600.0),
                mean_anomaly: qtty::Degrees::new(77.37),
                arg_perihelion: qtty::Degrees::new(73.6),
                lon_ascending_node: qtty::Degrees::new(80.3),
                inclination: qtty::Degrees::new(10.59),
                eccentricity: 0.0758,
                semi_major_axis: 2.767,
            },
            ceu: CeuParameters::default(),
        })
    }

    #[test]
    fn test_mobile_targets_are_memoized() {
        let cache = CachedEphemeris::with_provider(CountingProvider { calls: Cell::new(0) });
        let target = ceres();
        let t = ModifiedJulianDate::new(59000.0);

        let first = cache.ephemeris_at(&target, t);
        let second = cache.ephemeris_at(&target, t);
        assert_eq!(first, second);
        assert_eq!(cache.inner.calls.get(), 1);
        assert_eq!(cache.len(), 1);

        cache.ephemeris_at(&target, t.add_minutes(5.0));
        assert_eq!(cache.inner.calls.get(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fixed_targets_bypass_memo() {
        let cache = CachedEphemeris::with_provider(CountingProvider { calls: Cell::new(0) });
        let m13 = CelestialTarget::MessierObject(MessierRecord {
            identifier: TargetId::new("M 13"),
            object_type: "GlC".to_string(),
            ra: qtty::Degrees::new(250.42),
            dec: qtty::Degrees::new(36.46),
            mag_v: Some(5.8),
        });
        let t = ModifiedJulianDate::new(59000.0);
        cache.ephemeris_at(&m13, t);
        cache.ephemeris_at(&m13, t);
        assert_eq!(cache.inner.calls.get(), 2);
        assert!(cache.is_empty());
    }
}
