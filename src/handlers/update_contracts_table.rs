//! Contracts-table refresh
//!
//! Pure pass-through to the trading service: forwards the event's contract
//! details and reports the outcome. No database work happens here.

use crate::handlers::{Event, HandlerContext, HandlerResponse};
use tracing::{error, info};

pub async fn handle(ctx: &HandlerContext, event: &Event) -> HandlerResponse {
    let Some(details) = &event.contracts_details else {
        return HandlerResponse::failure(400, "contracts_details is required", None);
    };

    info!(method = %event.method, "updating contracts table");

    match ctx.api.update_contracts_table(details).await {
        Ok(()) => HandlerResponse::ok("Contracts table updated"),
        Err(e) => {
            error!("error updating contracts table: {e}");
            HandlerResponse::failure(500, "Error updating contracts table", Some(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::test_context;

    #[tokio::test]
    async fn missing_contract_details_is_a_client_error() {
        let ctx = test_context();
        let event: Event =
            serde_json::from_str(r#"{"method": "update_contracts_table"}"#).unwrap();
        let response = handle(&ctx, &event).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.message, "contracts_details is required");
    }
}
