//! Event handlers
//!
//! One module per supported event method, plus the dispatcher. Handlers are
//! the error boundary: every core error is caught here and converted into a
//! structured response, so callers always get a status and a message back.
//!
//! Each invocation constructs its own [`ConnectionManager`], connects,
//! performs its work and disconnects on every exit path, so no connection
//! state crosses invocations.

pub mod capture_account_summary;
pub mod refresh_orders;
pub mod truncate_orders;
pub mod update_contracts_table;

use crate::api::TradingApiClient;
use crate::config::Settings;
use crate::db::manager::{ConnectionManager, ConnectionOptions};
use crate::error::Result;
use crate::secrets::{SecretResolver, SecretStore};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// An incoming event, as dispatched by the scheduler
#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    /// Handler method name
    pub method: String,

    /// Account scope for account-summary capture
    #[serde(default)]
    pub account_number: Option<String>,

    /// Contract metadata for the contracts-table refresh
    #[serde(default)]
    pub contracts_details: Option<serde_json::Value>,
}

/// Structured handler outcome
#[derive(Debug, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_summary: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HandlerResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: 200,
            message: message.into(),
            account_summary: None,
            error: None,
        }
    }

    pub fn failure(status: u16, message: impl Into<String>, error: Option<String>) -> Self {
        Self {
            status,
            message: message.into(),
            account_summary: None,
            error,
        }
    }
}

/// Long-lived handler dependencies: settings, the process-wide credential
/// resolver and the trading-service client.
pub struct HandlerContext {
    pub settings: Settings,
    resolver: Arc<SecretResolver>,
    pub api: TradingApiClient,
}

impl HandlerContext {
    pub fn new(settings: Settings, store: Arc<dyn SecretStore>) -> Self {
        let api = TradingApiClient::new(&settings.service_base_url, &settings.service_api_key);
        Self {
            settings,
            resolver: Arc::new(SecretResolver::new(store)),
            api,
        }
    }

    /// A fresh manager for one invocation's database work
    fn manager(&self) -> ConnectionManager {
        ConnectionManager::new(
            Arc::clone(&self.resolver),
            ConnectionOptions::from_settings(&self.settings),
        )
    }
}

/// Acquire a connection for one block of database work, with guaranteed
/// release on both the success and the failure path.
pub(crate) async fn with_database<T, F>(ctx: &HandlerContext, f: F) -> Result<T>
where
    F: for<'a> FnOnce(&'a mut ConnectionManager) -> BoxFuture<'a, Result<T>>,
{
    let mut db = ctx.manager();
    db.connect().await?;
    let result = f(&mut db).await;
    db.disconnect();
    result
}

/// Route an event to its handler. Unknown methods get a 400-style response.
pub async fn dispatch(ctx: &HandlerContext, event: Event) -> HandlerResponse {
    match event.method.as_str() {
        "update_contracts_table" => update_contracts_table::handle(ctx, &event).await,
        "capture_account_summary" => capture_account_summary::handle(ctx, &event).await,
        "refresh_orders" => refresh_orders::handle(ctx, &event).await,
        "truncate_orders" => truncate_orders::handle(ctx, &event).await,
        other => {
            warn!(method = other, "rejected event with unknown method");
            HandlerResponse::failure(400, format!("Invalid method: {other}"), None)
        }
    }
}
