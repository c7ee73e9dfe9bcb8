//! # Cosmic Planner
//!
//! Observation scoring and planning engine.
//!
//! For any catalog target and observer this crate computes a time-varying
//! observation score, finds the best instant inside a window, and assembles a
//! ranked, time-boxed observing plan across heterogeneous catalogs.
//!
//! ## Architecture
//!
//! - [`models`]: targets, orbital/transit elements, observer, MJD time
//! - [`astro`]: sidereal time, alt/az, Keplerian propagation, rise/set
//! - [`ephemeris`]: position and magnitude of a target at a time
//! - [`algorithms`]: value and difficulty models, score composition, peak finder
//! - [`db`]: read-only catalog, profile and GeoIP repositories
//! - [`services`]: candidate selection, plan assembly, reports
//! - [`api`]: request and result types
//!
//! ## Example
//! ```ignore
//! use std::sync::Arc;
//! use cosmic_planner::{api::PlanRequest, config::PlannerConfig, db::LocalRepository};
//! use cosmic_planner::services::PlanAssembler;
//!
//! let repo = LocalRepository::from_json_file("catalog.json")?;
//! let assembler = PlanAssembler::new(Arc::new(repo), PlannerConfig::load()?);
//! let plan = assembler.assemble_plan(&PlanRequest::default()).await?;
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod api;
pub mod astro;
pub mod config;
pub mod db;
pub mod ephemeris;
pub mod error;
pub mod models;
pub mod services;

pub use error::{PlanError, PlanResult};
