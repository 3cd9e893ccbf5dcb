//! Persistence layer for cluster reports and per-user rule feedback.
//!
//! [`store::Storage`] exposes one interface over two interchangeable SQL
//! drivers: an embedded SQLite file (also usable in-memory for tests) and a
//! networked PostgreSQL server. Observable semantics are identical across
//! drivers; where the dialects diverge (upsert conflict resolution), the SQL
//! is generated per driver in one place and any other backend is rejected
//! with [`error::StorageError::UnsupportedDriver`].

pub mod error;
pub mod store;

mod entities;


pub use error::StorageError;
pub use store::feedback::UserFeedbackOnRule;
pub use store::toggle::ClusterRuleToggle;
pub use store::{Storage, StorageConfig};
