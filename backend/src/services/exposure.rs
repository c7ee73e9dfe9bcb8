//! Time boxing and exposure assignment for ranked plan entries.

use crate::config::ExposureSettings;
use crate::models::ModifiedJulianDate;

/// Pogson's ratio: flux factor per magnitude.
const POGSON_RATIO: f64 = 2.512;
/// The base exposure applies this many magnitudes above the limit.
const BASE_EXPOSURE_HEADROOM_MAG: f64 = 5.0;

/// Exposure length as a function of target brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExposurePolicy {
    pub base: qtty::Seconds,
    pub min: qtty::Seconds,
    pub max: qtty::Seconds,
    pub limiting_magnitude: f64,
}

impl ExposurePolicy {
    pub fn from_settings(settings: &ExposureSettings, limiting_magnitude: f64) -> Self {
        Self {
            base: qtty::Seconds::new(settings.base_exposure_seconds),
            min: qtty::Seconds::new(settings.min_exposure_seconds),
            max: qtty::Seconds::new(settings.max_exposure_seconds),
            limiting_magnitude,
        }
    }

    /// `base × 2.512^(mag − (lim − 5))`, clamped to `[min, max]`.
    ///
    /// Targets without a magnitude get the base exposure.
    pub fn duration(&self, magnitude: Option<f64>) -> qtty::Seconds {
        let reference = self.limiting_magnitude - BASE_EXPOSURE_HEADROOM_MAG;
        let seconds = match magnitude.filter(|m| m.is_finite()) {
            Some(mag) => self.base.value() * POGSON_RATIO.powf(mag - reference),
            None => self.base.value(),
        };
        let seconds = if seconds.is_finite() { seconds } else { self.max.value() };
        qtty::Seconds::new(seconds.clamp(self.min.value(), self.max.value().max(self.min.value())))
    }

    /// Number of exposures of `duration` fitting in `slot`, at least one.
    pub fn count(&self, slot: qtty::Days, duration: qtty::Seconds) -> u32 {
        let slot_seconds = slot.value() * 86_400.0;
        if duration.value() <= 0.0 || !slot_seconds.is_finite() {
            return 1;
        }
        let n = (slot_seconds / duration.value() + 1e-9).floor();
        if n < 1.0 {
            1
        } else {
            n.min(u32::MAX as f64) as u32
        }
    }
}

/// An entry placed on the timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSlot {
    /// Index into the caller's (ranked) entry list.
    pub index: usize,
    pub start: ModifiedJulianDate,
    pub slot: qtty::Days,
}

/// Lays ranked entries on a timeline.
///
/// `preferred` holds each entry's wished start, in ranking order. Entries
/// claim slots in rank order: each takes the instant nearest its wished start
/// that lies in `[window_start, window_end]` and is at least `min_spacing`
/// from every start already claimed (later wins a tie). An entry with no such
/// instant is dropped, so only lower-ranked entries ever lose their place.
/// Every slot lasts until the next start, clamped to
/// `[min_spacing, max_spacing]`; the last one gets `max_spacing`.
///
/// Returned slots are in chronological order.
pub fn time_box(
    preferred: &[ModifiedJulianDate],
    window_start: ModifiedJulianDate,
    window_end: ModifiedJulianDate,
    min_spacing: qtty::Days,
    max_spacing: qtty::Days,
) -> Vec<TimeSlot> {
    let min_spacing = min_spacing.value().max(0.0);
    let max_spacing = max_spacing.value().max(min_spacing);
    let lo = window_start.value();
    let hi = window_end.value().max(lo);

    let mut claimed: Vec<(f64, usize)> = Vec::with_capacity(preferred.len());
    for (index, wished) in preferred.iter().enumerate() {
        let wished = wished.value().clamp(lo, hi);
        match nearest_free(&claimed, wished, lo, hi, min_spacing) {
            Some(start) => {
                let at = claimed.partition_point(|&(t, _)| t < start);
                claimed.insert(at, (start, index));
            }
            None => log::debug!("Entry {} does not fit in the window", index + 1),
        }
    }

    let mut placed: Vec<TimeSlot> = claimed
        .iter()
        .map(|&(start, index)| TimeSlot {
            index,
            start: ModifiedJulianDate::new(start),
            slot: qtty::Days::new(max_spacing),
        })
        .collect();
    for i in 0..placed.len().saturating_sub(1) {
        let gap = placed[i + 1].start.days_since(placed[i].start).value();
        placed[i].slot = qtty::Days::new(gap.clamp(min_spacing, max_spacing));
    }
    placed
}

/// Closest instant to `wished` in `[lo, hi]` keeping `spacing` from every
/// claimed start. `claimed` is sorted by start.
fn nearest_free(
    claimed: &[(f64, usize)],
    wished: f64,
    lo: f64,
    hi: f64,
    spacing: f64,
) -> Option<f64> {
    // Float noise from `t ± spacing` must not reject a boundary candidate.
    let tolerance = 1e-9;
    let is_free = |t: f64| {
        (lo..=hi).contains(&t)
            && claimed
                .iter()
                .all(|&(c, _)| (t - c).abs() >= spacing - tolerance)
    };

    let mut candidates = vec![wished];
    for &(c, _) in claimed {
        candidates.push(c - spacing);
        candidates.push(c + spacing);
    }

    candidates
        .into_iter()
        .filter(|&t| is_free(t))
        .min_by(|a, b| {
            (a - wished)
                .abs()
                .total_cmp(&(b - wished).abs())
                .then(b.total_cmp(a))
        })
}
