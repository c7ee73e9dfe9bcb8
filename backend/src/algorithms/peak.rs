//! Peak finder: dense fixed-step scan for the best observing instant.
//!
//! Score functions have discontinuities (transit tiers, altitude cut-off), so
//! this is a plain scan over a grid, not an optimizer.

use serde::{Deserialize, Serialize};

use crate::models::ModifiedJulianDate;

use super::scorable::{Scorable, ScoringContext};

/// Default scan resolution in minutes.
pub const DEFAULT_STEP_MINUTES: f64 = 5.0;

/// Best score found in an interval and when it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakScore {
    pub score: f64,
    pub time: ModifiedJulianDate,
}

/// Scans `[start, end]` every `step` and returns the maximal score.
///
/// Grid points are `start + i·step` for every `i` with the point `<= end`.
/// Ties resolve to the earliest instant. Instants with missing ephemeris are
/// skipped; `None` means no instant could be scored, or `end < start`.
/// A non-positive step evaluates `start` only, so `[t, t]` equals
/// `score_at(t)`.
pub fn peak_score<S: Scorable + ?Sized>(
    target: &S,
    start: ModifiedJulianDate,
    end: ModifiedJulianDate,
    step: qtty::Days,
    ctx: &ScoringContext<'_>,
) -> Option<PeakScore> {
    let span = end.days_since(start).value();
    if !span.is_finite() || span < 0.0 {
        return None;
    }

    let step = step.value();
    let steps = if step.is_finite() && step > 0.0 {
        // Tolerance keeps `end` on the grid when span is a multiple of step.
        (span / step + 1e-9).floor() as u64
    } else {
        0
    };

    let mut best: Option<PeakScore> = None;
    for i in 0..=steps {
        // Integer index avoids accumulated drift across long windows.
        let t = start.add_days(i as f64 * step.max(0.0));
        let Some(score) = target.score_at(t, ctx) else {
            continue;
        };
        match best {
            Some(current) if score <= current.score => {}
            _ => best = Some(PeakScore { score, time: t }),
        }
    }
    best
}

/// Convenience for callers that think in minutes.
pub fn step_from_minutes(minutes: f64) -> qtty::Days {
    qtty::Days::new(minutes / 1440.0)
}
