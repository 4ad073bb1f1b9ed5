//! tradesync - event-driven data synchronization for trading operations
//!
//! tradesync keeps a PostgreSQL datastore in step with an upstream
//! trading-operations service: it refreshes contract and order tables,
//! captures periodic account-summary snapshots, and computes simple derived
//! metrics (unrealized P&L, gross position exposure) along the way.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`]: environment-driven runtime settings
//! - [`secrets`]: credential resolution from AWS Secrets Manager, with a
//!   process-scoped cache
//! - [`db`]: the connection-managed database layer, one session per
//!   [`db::ConnectionManager`], with parameterized statements, explicit and
//!   scoped transactions, and the domain query facade on top
//! - [`api`]: HTTP client for the upstream trading service
//! - [`handlers`]: per-event orchestration and the dispatcher
//! - [`error`]: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tradesync::config::Settings;
//! use tradesync::handlers::{dispatch, Event, HandlerContext};
//! use tradesync::secrets::AwsSecretStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::from_env()?;
//! let store = Arc::new(AwsSecretStore::new(&settings.aws_region).await);
//! let ctx = HandlerContext::new(settings, store);
//!
//! let event: Event = serde_json::from_str(r#"{"method": "truncate_orders"}"#)?;
//! let response = dispatch(&ctx, event).await;
//! println!("{} {}", response.status, response.message);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod secrets;

pub use error::{ApiError, ConfigError, DbError, Result, SecretError, SyncError};
