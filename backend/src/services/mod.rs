//! Service layer: candidate selection and plan assembly.
//!
//! Services sit between the repositories and the caller. They orchestrate
//! catalog queries, run the scoring fan-out and shape the results.

pub mod candidates;
pub mod exposure;
pub mod observer;
pub mod planner;
pub mod report;

pub use candidates::{select_candidates, CandidateQuery};
pub use exposure::{time_box, ExposurePolicy, TimeSlot};
pub use observer::{resolve_request, ResolvedRequest};
pub use planner::PlanAssembler;
pub use report::{parse_report, render_entries, render_plan, ReportError, ReportLine};
