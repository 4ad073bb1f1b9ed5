//! Account-summary snapshot capture
//!
//! Pulls the current account summary from the trading service, enriches it
//! with index prices and derived position metrics from the database, and
//! appends one row to `account_history`.

use crate::api::AccountSummaryRow;
use crate::db::queries::{
    RowValues, get_gross_positions_and_unique_contracts, get_index_price, get_unrealized_pl,
    insert_rows,
};
use crate::db::types::SqlValue;
use crate::error::Result;
use crate::handlers::{Event, HandlerContext, HandlerResponse, with_database};
use rust_decimal::prelude::ToPrimitive;
use tracing::error;

/// Snapshot column for a known account-summary tag
fn lookup_column(tag: &str) -> Option<&'static str> {
    match tag {
        "AvailableFunds" => Some("available_funds"),
        "NetLiquidation" => Some("net_liquidation"),
        "ExcessLiquidity" => Some("excess_liquidity"),
        "MaintMarginReq" => Some("maintenance_margin"),
        _ => None,
    }
}

/// Extract the known tags from the raw summary rows into snapshot columns.
/// Unknown tags and non-numeric values are skipped.
pub fn parse_account_summary(rows: &[AccountSummaryRow]) -> RowValues {
    let mut snapshot = RowValues::new();
    for row in rows {
        let Some(column) = row.tag.as_deref().and_then(lookup_column) else {
            continue;
        };
        if let Some(value) = row.value.as_deref()
            && let Ok(parsed) = value.parse::<f64>()
        {
            snapshot.insert(column.to_string(), SqlValue::Float(parsed));
        }
    }
    snapshot
}

pub async fn handle(ctx: &HandlerContext, event: &Event) -> HandlerResponse {
    match run(ctx, event).await {
        Ok(response) => response,
        Err(e) => {
            error!("error capturing account summary: {e}");
            HandlerResponse::failure(
                500,
                "Error capturing account summary",
                Some(e.to_string()),
            )
        }
    }
}

async fn run(ctx: &HandlerContext, event: &Event) -> Result<HandlerResponse> {
    let response = ctx
        .api
        .get_account_summary(event.account_number.as_deref())
        .await?;
    let rows = response.account_summary;

    // The service reports the account number on every summary row; without
    // one there is nothing to snapshot against.
    let Some(account) = rows.first().and_then(|row| row.account.clone()) else {
        return Ok(HandlerResponse {
            status: 202,
            message: "No account summary data found".to_string(),
            account_summary: Some(serde_json::to_value(&rows).unwrap_or_default()),
            error: None,
        });
    };

    let mut snapshot = parse_account_summary(&rows);
    snapshot.insert("account".to_string(), SqlValue::Text(account.clone()));

    let snapshot = with_database(ctx, move |db| {
        Box::pin(async move {
            let spx = get_index_price(db, "SPX").await?;
            let vix = get_index_price(db, "VIX").await?;
            let unrealized_pl = get_unrealized_pl(db, &account).await?;
            let (gross_positions, unique_contracts) =
                get_gross_positions_and_unique_contracts(db, &account).await?;

            snapshot.insert("spx".to_string(), SqlValue::from(spx));
            snapshot.insert("vix".to_string(), SqlValue::from(vix));
            snapshot.insert("unrealized_pl".to_string(), SqlValue::Decimal(unrealized_pl));
            snapshot.insert(
                "gross_positions".to_string(),
                SqlValue::Int(gross_positions.trunc().to_i64().unwrap_or(0)),
            );
            snapshot.insert("unique_contracts".to_string(), SqlValue::Int(unique_contracts));

            let columns: Vec<&str> = snapshot.keys().map(String::as_str).collect();
            insert_rows(db, "account_history", &columns, std::slice::from_ref(&snapshot))
                .await?;
            Ok(snapshot)
        })
    })
    .await?;

    let summary: serde_json::Map<String, serde_json::Value> = snapshot
        .iter()
        .map(|(column, value)| (column.clone(), value.to_json()))
        .collect();

    Ok(HandlerResponse {
        status: 200,
        message: "Account summary captured successfully".to_string(),
        account_summary: Some(serde_json::Value::Object(summary)),
        error: None,
    })
}
