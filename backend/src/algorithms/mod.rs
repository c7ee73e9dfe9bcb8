//! Scoring algorithms: value and difficulty models, score composition and
//! the peak finder.

pub mod difficulty;
pub mod peak;
pub mod scorable;
pub mod tables;
pub mod value;

pub use peak::{peak_score, step_from_minutes, PeakScore};
pub use scorable::{Scorable, ScoringContext, ScoringParameters};
pub use tables::{ScoringTables, STANDARD_TABLES};
pub use value::ValueModel;
