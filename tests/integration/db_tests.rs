//! Integration tests for the connection manager and query facade
//!
//! These tests require the test PostgreSQL database to be running. Each test
//! builds its own manager; table fixtures are session-scoped TEMP tables, so
//! nothing leaks between tests or into a shared schema.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::env;
use std::sync::Arc;
use std::time::Duration;

use tradesync::config::SslMode;
use tradesync::db::manager::{ConnectionManager, ConnectionOptions};
use tradesync::db::queries::{
    get_gross_positions_and_unique_contracts, get_index_price, get_unrealized_pl,
};
use tradesync::db::types::SqlValue;
use tradesync::error::{DbError, SecretResult};
use tradesync::secrets::{SecretResolver, SecretStore};

/// Serves the test database's coordinates through the normal secret-resolution
/// path, so connect() exercises the resolver exactly as production does.
struct EnvCredentialStore;

#[async_trait]
impl SecretStore for EnvCredentialStore {
    async fn fetch_secret(&self, _name: &str) -> SecretResult<String> {
        let host = env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port: u16 = env::var("TEST_DB_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(5433);
        let username = env::var("TEST_DB_USER").unwrap_or_else(|_| "test_user".to_string());
        let password =
            env::var("TEST_DB_PASSWORD").unwrap_or_else(|_| "test_password".to_string());
        Ok(json!({
            "host": host,
            "port": port,
            "username": username,
            "password": password
        })
        .to_string())
    }
}

fn test_manager(autocommit: bool) -> ConnectionManager {
    let resolver = Arc::new(SecretResolver::new(Arc::new(EnvCredentialStore)));
    ConnectionManager::new(
        resolver,
        ConnectionOptions {
            secret_name: "integration-test".to_string(),
            database: Some(env::var("TEST_DB_NAME").unwrap_or_else(|_| "test_db".to_string())),
            ssl_mode: SslMode::Disable,
            connect_timeout: Duration::from_secs(5),
            autocommit,
        },
    )
}

async fn connect_or_skip(autocommit: bool) -> Option<ConnectionManager> {
    let mut db = test_manager(autocommit);
    match db.connect().await {
        Ok(()) => Some(db),
        Err(e) => {
            eprintln!("Skipping test: Database not available - {e}");
            None
        }
    }
}

async fn count(db: &ConnectionManager, table: &str) -> i64 {
    let results = db
        .query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
        .await
        .unwrap();
    results
        .first()
        .and_then(|row| row.get("n"))
        .and_then(|v| v.as_i64())
        .unwrap()
}

#[tokio::test]
async fn connect_and_disconnect() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };
    assert!(db.is_connected());
    db.disconnect();
    assert!(!db.is_connected());
}

#[tokio::test]
async fn double_connect_is_a_noop() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };
    db.connect().await.unwrap();
    assert!(db.is_connected());
    db.disconnect();
}

#[tokio::test]
async fn query_materializes_row_mappings() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    let results = db
        .query("SELECT 1 AS num, 'hello' AS msg, NULL::text AS missing", &[])
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let row = results.first().unwrap();
    assert_eq!(row.get("num"), Some(&SqlValue::Int(1)));
    assert_eq!(row.get("msg").and_then(|v| v.as_str()), Some("hello"));
    assert!(row.get("missing").unwrap().is_null(), "nulls stay present");
    db.disconnect();
}

#[tokio::test]
async fn parameters_bind_positionally() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    let results = db
        .query(
            "SELECT $1::int8 AS a, $2::text AS b, $3::numeric AS c",
            &[
                SqlValue::Int(7),
                SqlValue::Text("U123".to_string()),
                SqlValue::Decimal(Decimal::new(425, 2)),
            ],
        )
        .await
        .unwrap();

    let row = results.first().unwrap();
    assert_eq!(row.get("a"), Some(&SqlValue::Int(7)));
    assert_eq!(row.get("b").and_then(|v| v.as_str()), Some("U123"));
    assert_eq!(
        row.get("c").and_then(|v| v.as_decimal()),
        Some(Decimal::new(425, 2))
    );
    db.disconnect();
}

#[tokio::test]
async fn failed_statement_reports_the_statement() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    let err = db
        .query("SELECT * FROM definitely_not_a_table", &[])
        .await
        .unwrap_err();
    match err {
        DbError::QueryFailed { statement, .. } => {
            assert!(statement.contains("definitely_not_a_table"));
        }
        other => panic!("expected QueryFailed, got {other:?}"),
    }
    db.disconnect();
}

#[tokio::test]
async fn execute_many_is_all_or_nothing() {
    let Some(mut db) = connect_or_skip(false).await else {
        return;
    };

    db.execute("CREATE TEMP TABLE batch_target (id INT PRIMARY KEY)", &[])
        .await
        .unwrap();

    // Third tuple violates the primary key; the whole batch must vanish.
    let err = db
        .execute_many(
            "INSERT INTO batch_target (id) VALUES ($1)",
            &[
                vec![SqlValue::Int(1)],
                vec![SqlValue::Int(2)],
                vec![SqlValue::Int(2)],
            ],
        )
        .await;
    assert!(err.is_err());
    assert_eq!(count(&db, "batch_target").await, 0, "no partial rows");

    // A clean batch lands completely, with a single commit around it.
    let affected = db
        .execute_many(
            "INSERT INTO batch_target (id) VALUES ($1)",
            &[
                vec![SqlValue::Int(1)],
                vec![SqlValue::Int(2)],
                vec![SqlValue::Int(3)],
            ],
        )
        .await
        .unwrap();
    assert_eq!(affected, 3);
    assert_eq!(count(&db, "batch_target").await, 3);
    db.disconnect();
}

#[tokio::test]
async fn scoped_transaction_commits_and_restores_autocommit() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute("CREATE TEMP TABLE scoped_target (id INT PRIMARY KEY)", &[])
        .await
        .unwrap();

    db.with_transaction(|db| {
        Box::pin(async move {
            db.execute("INSERT INTO scoped_target (id) VALUES ($1)", &[SqlValue::Int(1)])
                .await?;
            db.execute("INSERT INTO scoped_target (id) VALUES ($1)", &[SqlValue::Int(2)])
                .await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    assert!(db.autocommit(), "autocommit restored after success");
    assert_eq!(count(&db, "scoped_target").await, 2);
    db.disconnect();
}

#[tokio::test]
async fn scoped_transaction_rolls_back_and_restores_autocommit() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute("CREATE TEMP TABLE scoped_target (id INT PRIMARY KEY)", &[])
        .await
        .unwrap();
    db.execute("INSERT INTO scoped_target (id) VALUES ($1)", &[SqlValue::Int(1)])
        .await
        .unwrap();

    let result = db
        .with_transaction(|db| {
            Box::pin(async move {
                db.execute("INSERT INTO scoped_target (id) VALUES ($1)", &[SqlValue::Int(10)])
                    .await?;
                // Duplicate key: the scope must roll back everything it did.
                db.execute("INSERT INTO scoped_target (id) VALUES ($1)", &[SqlValue::Int(1)])
                    .await?;
                Ok(())
            })
        })
        .await;

    assert!(result.is_err());
    assert!(db.autocommit(), "autocommit restored after failure");
    assert_eq!(count(&db, "scoped_target").await, 1, "scope left no trace");
    db.disconnect();
}

#[tokio::test]
async fn explicit_transaction_controls() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute("CREATE TEMP TABLE explicit_target (id INT)", &[])
        .await
        .unwrap();

    db.begin_transaction().await.unwrap();
    assert!(!db.autocommit(), "begin forces the manager out of autocommit");
    db.execute("INSERT INTO explicit_target (id) VALUES ($1)", &[SqlValue::Int(1)])
        .await
        .unwrap();
    db.rollback().await.unwrap();
    assert_eq!(count(&db, "explicit_target").await, 0);

    db.begin_transaction().await.unwrap();
    db.execute("INSERT INTO explicit_target (id) VALUES ($1)", &[SqlValue::Int(2)])
        .await
        .unwrap();
    db.commit().await.unwrap();
    assert_eq!(count(&db, "explicit_target").await, 1);
    db.disconnect();
}

#[tokio::test]
async fn index_price_uses_the_latest_quote() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute(
        "CREATE TEMP TABLE live_prices (contract_id TEXT, security_type TEXT, \
         mid NUMERIC, quote_timestamp TIMESTAMPTZ)",
        &[],
    )
    .await
    .unwrap();
    db.execute(
        "INSERT INTO live_prices VALUES \
         ('416904', 'IND', 99.0, now() - interval '3 hours'), \
         ('416904', 'IND', 100.5, now() - interval '2 hours'), \
         ('416904', 'IND', 101.5, now() - interval '1 hour'), \
         ('13455763', 'IND', 15.25, now())",
        &[],
    )
    .await
    .unwrap();

    let spx = get_index_price(&db, "SPX").await.unwrap();
    assert_eq!(spx, Some(Decimal::new(1015, 1)));

    let vix = get_index_price(&db, "VIX").await.unwrap();
    assert_eq!(vix, Some(Decimal::new(1525, 2)));
    db.disconnect();
}

#[tokio::test]
async fn index_price_is_absent_without_quotes() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute(
        "CREATE TEMP TABLE live_prices (contract_id TEXT, security_type TEXT, \
         mid NUMERIC, quote_timestamp TIMESTAMPTZ)",
        &[],
    )
    .await
    .unwrap();

    assert_eq!(get_index_price(&db, "SPX").await.unwrap(), None);
    db.disconnect();
}

#[tokio::test]
async fn gross_positions_normalize_to_zero() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute(
        "CREATE TEMP TABLE positions (account TEXT, contract_id TEXT, quantity NUMERIC, \
         multiplier NUMERIC, open_price NUMERIC, status TEXT)",
        &[],
    )
    .await
    .unwrap();

    let (gross, unique) = get_gross_positions_and_unique_contracts(&db, "U123")
        .await
        .unwrap();
    assert_eq!(gross, Decimal::ZERO);
    assert_eq!(unique, 0);
    db.disconnect();
}

#[tokio::test]
async fn gross_positions_aggregate_open_positions() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute(
        "CREATE TEMP TABLE positions (account TEXT, contract_id TEXT, quantity NUMERIC, \
         multiplier NUMERIC, open_price NUMERIC, status TEXT)",
        &[],
    )
    .await
    .unwrap();
    db.execute(
        "INSERT INTO positions VALUES \
         ('U123', 'c1', -2, 100, 10, 'open'), \
         ('U123', 'c2', 3, 100, 20, 'open'), \
         ('U123', 'c3', 99, 100, 30, 'closed'), \
         ('U999', 'c1', 7, 100, 10, 'open')",
        &[],
    )
    .await
    .unwrap();

    let (gross, unique) = get_gross_positions_and_unique_contracts(&db, "U123")
        .await
        .unwrap();
    assert_eq!(gross, Decimal::from(5));
    assert_eq!(unique, 2);
    db.disconnect();
}

#[tokio::test]
async fn unrealized_pl_joins_each_position_to_its_latest_mid() {
    let Some(mut db) = connect_or_skip(true).await else {
        return;
    };

    db.execute(
        "CREATE TEMP TABLE positions (account TEXT, contract_id TEXT, quantity NUMERIC, \
         multiplier NUMERIC, open_price NUMERIC, status TEXT)",
        &[],
    )
    .await
    .unwrap();
    db.execute(
        "CREATE TEMP TABLE live_prices (contract_id TEXT, security_type TEXT, \
         mid NUMERIC, quote_timestamp TIMESTAMPTZ)",
        &[],
    )
    .await
    .unwrap();

    // Stale quote must not contribute: only the latest mid counts.
    db.execute(
        "INSERT INTO live_prices VALUES \
         ('c1', 'OPT', 50.0, now() - interval '1 day'), \
         ('c1', 'OPT', 12.0, now())",
        &[],
    )
    .await
    .unwrap();
    db.execute(
        "INSERT INTO positions VALUES ('U123', 'c1', 2, 100, 10, 'open')",
        &[],
    )
    .await
    .unwrap();

    // 2 * 100 * (12 - 10)
    let pl = get_unrealized_pl(&db, "U123").await.unwrap();
    assert_eq!(pl, Decimal::from(400));

    let none = get_unrealized_pl(&db, "U999").await.unwrap();
    assert_eq!(none, Decimal::ZERO);
    db.disconnect();
}
