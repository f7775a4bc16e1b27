//! Core query engine for the organization directory.
//! This crate owns the directory read model, the query operations and the
//! storage they run against.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod seed;
pub mod service;

pub use access::{AccessError, ApiKeyGate, API_KEY_HEADER};
pub use config::{ConfigError, DirectoryConfig, LoggingConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::activity::{Activity, ActivityId, ACTIVITY_TREE_MAX_DEPTH};
pub use model::building::{Building, BuildingId};
pub use model::organization::{Organization, OrganizationId, OrganizationView};
pub use model::ModelValidationError;
pub use query::error::{NotFoundTarget, QueryError, QueryResult};
pub use query::geo::{distance_km, within_radius, GeoPoint, EARTH_RADIUS_KM};
pub use query::hierarchy::resolve_subtree;
pub use repo::directory_repo::{DirectoryStore, SqliteDirectoryStore, StoreError, StoreResult};
pub use seed::{seed_demo_data, DirectorySeeder, NewOrganization, SeedError, SeedSummary};
pub use service::query_service::{QueryService, RadiusSearch};
pub use service::read_session::{DirectoryReader, SessionService};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
