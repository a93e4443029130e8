//! # mailflow-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `mailflow-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! Claiming a delay ticket and suspending a run are single transactions, so
//! concurrent sweepers never resume the same run twice.
//!
//! ## Dependency rule
//! Depends on `mailflow-app` (for port traits) and `mailflow-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod codec;
pub mod error;
pub mod pool;

mod activity_log;
mod automation_repo;
mod delay_queue;
mod event_store;
mod membership_store;
mod run_repo;
mod subscriber_repo;

pub use activity_log::SqliteActivityLog;
pub use automation_repo::SqliteAutomationRepository;
pub use delay_queue::SqliteDelayQueue;
pub use event_store::SqliteEventStore;
pub use membership_store::SqliteMembershipStore;
pub use run_repo::SqliteRunRepository;
pub use subscriber_repo::SqliteSubscriberRepository;

#[cfg(test)]
mod test_fixtures;
