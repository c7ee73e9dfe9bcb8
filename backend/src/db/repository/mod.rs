//! Read-only collaborator interfaces the planner queries.
//!
//! The planner never writes through these traits. Implementations must be
//! `Send + Sync` so category queries can run concurrently.

pub mod error;

pub use error::{ErrorContext, ErrorKind, RepositoryError, RepositoryResult};

use std::net::Ipv4Addr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{
    AsteroidRecord, CelestialTarget, ModifiedJulianDate, Observer, TargetCategory, TargetId,
};

/// Spatial and photometric filter for a catalog query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeQuery {
    pub center_ra: qtty::Degrees,
    pub center_dec: qtty::Degrees,
    pub radius: qtty::Degrees,
    /// Only targets strictly brighter than this are returned.
    pub max_magnitude: f64,
    pub limit: usize,
}

/// Stored per-user planning defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    #[serde(default)]
    pub limiting_magnitude: Option<f64>,
    /// Default observatory location.
    #[serde(default)]
    pub home_location: Option<Observer>,
}

/// Catalog tables, one per [`TargetCategory`].
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Fixed-position targets of `category` inside the cone and brighter than
    /// `query.max_magnitude`, ordered by ascending magnitude and truncated to
    /// `query.limit`.
    ///
    /// Asteroids are not served here: their position depends on time.
    async fn cone_search(
        &self,
        category: TargetCategory,
        query: &ConeQuery,
    ) -> RepositoryResult<Vec<CelestialTarget>>;

    /// Coarse superset of asteroids that may be inside the cone at `t`.
    ///
    /// Implementations may rely on precomputed track segments; callers must
    /// propagate each record and re-apply the exact filters.
    async fn asteroid_candidates(
        &self,
        query: &ConeQuery,
        t: ModifiedJulianDate,
    ) -> RepositoryResult<Vec<AsteroidRecord>>;

    /// Targets by identifier, in the requested order; unknown ids are skipped.
    async fn get_targets(&self, ids: &[TargetId]) -> RepositoryResult<Vec<CelestialTarget>>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: i64) -> RepositoryResult<Option<UserProfile>>;
}

/// IP geolocation blocks.
#[async_trait]
pub trait GeoIpRepository: Send + Sync {
    /// `(latitude, longitude)` of the block containing `ip`, if any.
    async fn location_for_ip(&self, ip: Ipv4Addr) -> RepositoryResult<Option<(f64, f64)>>;
}

/// Everything the plan assembler needs.
pub trait FullRepository: CatalogRepository + ProfileRepository + GeoIpRepository {}

impl<T> FullRepository for T where T: CatalogRepository + ProfileRepository + GeoIpRepository {}

/// Dotted quad to the integer form GeoIP ranges are keyed on.
pub fn ipv4_to_integer(ip: &str) -> RepositoryResult<u32> {
    ip.trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|e| {
            RepositoryError::validation(format!("Invalid IPv4 address '{}': {}", ip, e))
                .with_context(ErrorContext::new("ipv4_to_integer").with_subject(ip))
        })
}
