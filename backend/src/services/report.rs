//! Plan export: JSON and a flat human-readable report.
//!
//! The text report starts with `#` header lines, followed by one section per
//! entry:
//!
//! ```text
//! [1] M13
//! type: messier
//! ra: 250.423475
//! dec: 36.461319
//! magnitude: 5.80
//! score: 2.734
//! start: 2020-06-01T05:40:00+00:00
//! rise: 2020-05-31T23:12:41+00:00
//! transit: 2020-06-01T07:03:22+00:00
//! set: 2020-06-01T14:54:03+00:00
//! exposures: 40 x 12.0 s
//! ```

use std::fmt::Write;

use crate::api::{ObservingPlan, ObservingPlanEntry, Visibility};
use crate::models::{ModifiedJulianDate, TargetId};

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ReportError {
    #[error("Line {line}: {message}")]
    Malformed { line: usize, message: String },
}

/// What [`parse_report`] recovers from each section.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub rank: usize,
    pub identifier: TargetId,
    pub score: f64,
}

pub fn plan_to_json(plan: &ObservingPlan) -> serde_json::Result<String> {
    serde_json::to_string_pretty(plan)
}

pub fn entries_to_json(entries: &[ObservingPlanEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(entries)
}

pub fn entries_from_json(json: &str) -> serde_json::Result<Vec<ObservingPlanEntry>> {
    serde_json::from_str(json)
}

/// Full text report with a header describing the plan.
pub fn render_plan(plan: &ObservingPlan) -> String {
    let observer = plan.location.observer;
    let mut out = String::new();
    let _ = writeln!(out, "# Observing plan");
    let _ = writeln!(
        out,
        "# observer: lat {:.5} lon {:.5} elevation {:.0} m ({:?})",
        observer.latitude.value(),
        observer.longitude.value(),
        observer.elevation.value(),
        plan.location.source
    );
    let _ = writeln!(
        out,
        "# window: {} .. {}",
        plan.window_start.to_rfc3339(),
        plan.window_end.to_rfc3339()
    );
    let _ = writeln!(out, "# limiting magnitude: {:.2}", plan.limiting_magnitude);
    if !plan.dropped_categories.is_empty() {
        let dropped: Vec<&str> = plan.dropped_categories.iter().map(|c| c.as_str()).collect();
        let _ = writeln!(out, "# unavailable categories: {}", dropped.join(", "));
    }
    out.push_str(&render_entries(&plan.entries));
    out
}

/// Entry sections only.
pub fn render_entries(entries: &[ObservingPlanEntry]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# entries: {}", entries.len());
    for entry in entries {
        out.push('\n');
        render_entry(&mut out, entry);
    }
    out
}

fn render_entry(out: &mut String, entry: &ObservingPlanEntry) {
    let rts = &entry.rise_transit_set;
    let _ = writeln!(out, "[{}] {}", entry.rank, entry.identifier);
    let _ = writeln!(out, "type: {}", entry.category);
    let _ = writeln!(out, "ra: {:.6}", entry.ra.value());
    let _ = writeln!(out, "dec: {:.6}", entry.dec.value());
    match entry.magnitude {
        Some(mag) => {
            let _ = writeln!(out, "magnitude: {:.2}", mag);
        }
        None => {
            let _ = writeln!(out, "magnitude: unknown");
        }
    }
    // Shortest round-trip form so the score parses back exactly.
    let _ = writeln!(out, "score: {}", entry.score);
    let _ = writeln!(out, "start: {}", entry.start_time.to_rfc3339());
    let _ = writeln!(out, "rise: {}", horizon_event(rts.rise, rts.visibility));
    let _ = writeln!(out, "transit: {}", rts.transit.to_rfc3339());
    let _ = writeln!(out, "set: {}", horizon_event(rts.set, rts.visibility));
    let _ = writeln!(
        out,
        "exposures: {} x {:.1} s",
        entry.exposure_count,
        entry.exposure_duration.value()
    );
}

fn horizon_event(time: Option<ModifiedJulianDate>, visibility: Visibility) -> String {
    match (time, visibility) {
        (Some(t), _) => t.to_rfc3339(),
        (None, Visibility::Circumpolar) => "circumpolar".to_string(),
        (None, Visibility::NeverRises) => "never rises".to_string(),
        (None, Visibility::RisesAndSets) => "unknown".to_string(),
    }
}

/// Recovers rank, identifier and score of every section of a text report.
///
/// Header lines, blank lines and keys other than `score` are ignored.
/// Identifiers are taken verbatim after the single space following `]`, so
/// surrounding whitespace survives a round trip.
pub fn parse_report(text: &str) -> Result<Vec<ReportLine>, ReportError> {
    let mut lines = Vec::new();
    let mut current: Option<(usize, TargetId, Option<f64>)> = None;

    for (number, raw) in text.lines().enumerate() {
        let line_no = number + 1;
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = raw.trim_start().strip_prefix('[') {
            if let Some(done) = current.take() {
                lines.push(finish_section(done, line_no)?);
            }
            let (rank, identifier) = rest.split_once(']').ok_or_else(|| ReportError::Malformed {
                line: line_no,
                message: "missing ']' after rank".to_string(),
            })?;
            let rank = rank.trim().parse::<usize>().map_err(|e| ReportError::Malformed {
                line: line_no,
                message: format!("invalid rank '{}': {}", rank, e),
            })?;
            let identifier = identifier.strip_prefix(' ').unwrap_or(identifier);
            if identifier.is_empty() {
                return Err(ReportError::Malformed {
                    line: line_no,
                    message: "missing identifier".to_string(),
                });
            }
            current = Some((rank, TargetId::new(identifier), None));
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            return Err(ReportError::Malformed {
                line: line_no,
                message: format!("expected 'key: value', got '{}'", line),
            });
        };
        if key.trim() != "score" {
            continue;
        }
        let Some(section) = current.as_mut() else {
            return Err(ReportError::Malformed {
                line: line_no,
                message: "score outside of an entry section".to_string(),
            });
        };
        let score = value.trim().parse::<f64>().map_err(|e| ReportError::Malformed {
            line: line_no,
            message: format!("invalid score '{}': {}", value.trim(), e),
        })?;
        section.2 = Some(score);
    }

    if let Some(done) = current.take() {
        lines.push(finish_section(done, text.lines().count())?);
    }
    Ok(lines)
}

fn finish_section(
    (rank, identifier, score): (usize, TargetId, Option<f64>),
    line: usize,
) -> Result<ReportLine, ReportError> {
    let score = score.ok_or_else(|| ReportError::Malformed {
        line,
        message: format!("entry [{}] {} has no score", rank, identifier),
    })?;
    Ok(ReportLine {
        rank,
        identifier,
        score,
    })
}
