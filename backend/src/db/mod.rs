//! Catalog, profile and GeoIP access behind the repository pattern.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Plan assembler / candidate selector (services)         │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository traits (repository) - read-only interface   │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │        Local Repository (in-memory)          │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! The planner only reads through these traits; catalog import and user
//! management live elsewhere.

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod repositories;
pub mod repository;

pub use repositories::{CatalogSnapshot, LocalRepository};
pub use repository::{
    ipv4_to_integer, CatalogRepository, ConeQuery, ErrorContext, ErrorKind, FullRepository,
    GeoIpRepository, ProfileRepository, RepositoryError, RepositoryResult, UserProfile,
};
