//! Domain queries
//!
//! Higher-level lookups built purely on [`ConnectionManager`] primitives:
//! index price lookup, position aggregation, unrealized P&L and a multi-row
//! insert builder. No independent error handling here beyond surfacing the
//! manager's errors.

use crate::db::manager::ConnectionManager;
use crate::db::types::SqlValue;
use crate::error::{DbError, DbResult};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// One row of values for the insert builder, keyed by column name
pub type RowValues = HashMap<String, SqlValue>;

/// Internal contract identifier for a human-facing index symbol.
///
/// Exactly two symbols are supported; anything else is an input error.
fn contract_id_for_symbol(symbol: &str) -> Option<&'static str> {
    match symbol {
        "SPX" => Some("416904"),
        "VIX" => Some("13455763"),
        _ => None,
    }
}

/// Latest mid price for a supported index symbol.
///
/// Returns `None` when no quote row exists for the contract.
///
/// # Errors
/// `DbError::UnknownSymbol` for symbols outside the lookup table (checked
/// before touching the connection).
pub async fn get_index_price(db: &ConnectionManager, symbol: &str) -> DbResult<Option<Decimal>> {
    let contract_id = contract_id_for_symbol(symbol)
        .ok_or_else(|| DbError::UnknownSymbol(symbol.to_string()))?;

    let results = db
        .query(
            "SELECT mid FROM live_prices \
             WHERE contract_id = $1 AND security_type = 'IND' \
             ORDER BY quote_timestamp DESC \
             LIMIT 1",
            &[SqlValue::Text(contract_id.to_string())],
        )
        .await?;

    Ok(results
        .first()
        .and_then(|row| row.get("mid"))
        .and_then(|v| v.as_decimal()))
}

/// Sum of absolute open-position quantities and the count of distinct
/// contracts for an account. `(0, 0)` when the account has no open positions.
pub async fn get_gross_positions_and_unique_contracts(
    db: &ConnectionManager,
    account: &str,
) -> DbResult<(Decimal, i64)> {
    let results = db
        .query(
            "SELECT COALESCE(SUM(ABS(quantity)), 0) AS gross_positions, \
                    COUNT(DISTINCT contract_id) AS unique_contracts \
             FROM positions \
             WHERE account = $1 AND status = 'open'",
            &[SqlValue::Text(account.to_string())],
        )
        .await?;

    let Some(row) = results.first() else {
        return Ok((Decimal::ZERO, 0));
    };

    let gross = row
        .get("gross_positions")
        .and_then(|v| v.as_decimal())
        .unwrap_or(Decimal::ZERO);
    let unique = row
        .get("unique_contracts")
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    Ok((gross, unique))
}

/// Unrealized P&L over an account's open positions: each position joined to
/// its latest mid price, summing `quantity * multiplier * (mid - open_price)`.
/// Returns zero when nothing matches.
pub async fn get_unrealized_pl(db: &ConnectionManager, account: &str) -> DbResult<Decimal> {
    let results = db
        .query(
            "SELECT COALESCE(SUM(p.quantity * p.multiplier * (lp.mid - p.open_price)), 0) \
                    AS unrealized_pl \
             FROM positions p \
             LEFT JOIN LATERAL ( \
                 SELECT mid FROM live_prices \
                 WHERE contract_id = p.contract_id \
                 ORDER BY quote_timestamp DESC \
                 LIMIT 1 \
             ) lp ON TRUE \
             WHERE p.account = $1 AND p.status = 'open'",
            &[SqlValue::Text(account.to_string())],
        )
        .await?;

    Ok(results
        .first()
        .and_then(|row| row.get("unrealized_pl"))
        .and_then(|v| v.as_decimal())
        .unwrap_or(Decimal::ZERO))
}

/// Closed allow-list check for schema identifiers. Table and column names are
/// interpolated into statement text, so they must come from caller-controlled
/// constants and pass this check; everything else binds as a parameter.
fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Build one multi-row `INSERT` covering all rows in a single round trip.
///
/// Column order in the generated statement follows `columns` exactly; a row
/// missing a column binds null for it. Returns `None` for an empty row list.
///
/// # Errors
/// `DbError::InvalidIdentifier` when the table or a column name fails the
/// identifier check.
pub fn build_insert(
    table: &str,
    columns: &[&str],
    rows: &[RowValues],
) -> DbResult<Option<(String, Vec<SqlValue>)>> {
    if rows.is_empty() {
        return Ok(None);
    }
    if !valid_identifier(table) {
        return Err(DbError::InvalidIdentifier(table.to_string()));
    }
    for column in columns {
        if !valid_identifier(column) {
            return Err(DbError::InvalidIdentifier(column.to_string()));
        }
    }
    if columns.is_empty() {
        return Err(DbError::query_failed(
            "INSERT",
            format!("no columns given for table {table}"),
        ));
    }

    let mut params = Vec::with_capacity(rows.len() * columns.len());
    let mut row_groups = Vec::with_capacity(rows.len());
    let mut placeholder = 1;

    for row in rows {
        let group: Vec<String> = columns
            .iter()
            .map(|column| {
                params.push(row.get(*column).cloned().unwrap_or(SqlValue::Null));
                let text = format!("${placeholder}");
                placeholder += 1;
                text
            })
            .collect();
        row_groups.push(format!("({})", group.join(", ")));
    }

    let sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        table,
        columns.join(", "),
        row_groups.join(", ")
    );
    Ok(Some((sql, params)))
}

/// Build and execute a multi-row insert; no-op for an empty row list.
pub async fn insert_rows(
    db: &mut ConnectionManager,
    table: &str,
    columns: &[&str],
    rows: &[RowValues],
) -> DbResult<()> {
    match build_insert(table, columns, rows)? {
        Some((sql, params)) => {
            db.execute(&sql, &params).await?;
            Ok(())
        }
        None => Ok(()),
    }
}

/// Clear the orders table ahead of a refresh
pub async fn truncate_orders(db: &mut ConnectionManager) -> DbResult<()> {
    db.execute("TRUNCATE TABLE orders", &[]).await?;
    Ok(())
}
