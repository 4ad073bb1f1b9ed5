//! Orders truncation

use crate::db::queries::truncate_orders;
use crate::error::SyncError;
use crate::handlers::{Event, HandlerContext, HandlerResponse, with_database};
use tracing::{error, info};

pub async fn handle(ctx: &HandlerContext, event: &Event) -> HandlerResponse {
    info!(method = %event.method, "truncating orders");

    let truncated = with_database(ctx, |db| {
        Box::pin(async move { truncate_orders(db).await.map_err(SyncError::from) })
    })
    .await;

    match truncated {
        Ok(()) => HandlerResponse::ok("Orders truncated"),
        Err(e) => {
            error!("error truncating orders: {e}");
            HandlerResponse::failure(500, "Error truncating orders", Some(e.to_string()))
        }
    }
}
