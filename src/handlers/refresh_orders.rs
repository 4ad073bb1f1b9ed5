//! Orders refresh
//!
//! Clears the orders table, then asks the trading service to repopulate it.
//! The two stages fail with distinct messages so the caller can tell which
//! side broke.

use crate::db::queries::truncate_orders;
use crate::error::SyncError;
use crate::handlers::{Event, HandlerContext, HandlerResponse, with_database};
use tracing::{error, info};

pub async fn handle(ctx: &HandlerContext, event: &Event) -> HandlerResponse {
    info!(method = %event.method, "refreshing orders");

    let truncated = with_database(ctx, |db| {
        Box::pin(async move { truncate_orders(db).await.map_err(SyncError::from) })
    })
    .await;
    if let Err(e) = truncated {
        error!("error truncating orders: {e}");
        return HandlerResponse::failure(
            500,
            "Order refresh failed: Error truncating orders",
            Some(e.to_string()),
        );
    }

    if let Err(e) = ctx.api.refresh_orders().await {
        error!("error refreshing orders: {e}");
        return HandlerResponse::failure(
            500,
            "Order refresh failed: Error refreshing orders",
            Some(e.to_string()),
        );
    }

    HandlerResponse::ok("Orders refreshed")
}
