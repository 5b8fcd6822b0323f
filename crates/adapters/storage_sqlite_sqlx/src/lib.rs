//! # rainhub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `rainhub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `rainhub-app` (for port traits) and `rainhub-domain` (for
//! domain types). The `app` and `domain` crates must never reference this
//! adapter.

pub mod automation_repo;
pub mod error;
pub mod pool;
pub mod telemetry_repo;

pub use automation_repo::SqliteAutomationRepository;
pub use error::StorageError;
pub use pool::{Config, Database};
pub use telemetry_repo::SqliteTelemetryRepository;
