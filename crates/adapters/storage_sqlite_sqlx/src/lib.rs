//! # hookflow-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository and recorder port traits defined in `hookflow-app::ports`
//! - Manage `SQLite` connection pool lifecycle (WAL journal, `synchronous = FULL`)
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `hookflow-app` (for port traits) and `hookflow-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod automation_repo;
mod error;
mod execution_recorder;
mod pool;
mod row;
mod webhook_repo;

pub use automation_repo::SqliteAutomationRepository;
pub use error::StorageError;
pub use execution_recorder::SqliteExecutionRecorder;
pub use pool::{Config, Database};
pub use webhook_repo::SqliteWebhookRepository;
