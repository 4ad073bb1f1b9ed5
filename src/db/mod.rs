//! Database access layer
//!
//! Connection-managed access to PostgreSQL: secret-based credential
//! resolution feeds a single-session [`manager::ConnectionManager`], and the
//! [`queries`] facade builds domain lookups on its primitives.

pub mod manager;
pub mod queries;
pub mod types;

// Re-export main types
pub use manager::{ConnectionManager, ConnectionOptions};
pub use queries::RowValues;
pub use types::{QueryResults, Row, SqlValue};
