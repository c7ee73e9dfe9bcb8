//! Repository implementations.
//!
//! - `local`: in-memory store loaded from JSON snapshots, used by the CLI
//!   and the test-suite
pub mod local;

pub use local::{AsteroidTrack, CatalogSnapshot, GeoIpBlock, LocalRepository, TrackPoint};
