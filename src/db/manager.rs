//! Connection lifecycle and statement execution
//!
//! One [`ConnectionManager`] owns at most one live database session. Handlers
//! construct a manager per invocation, connect, do their work and disconnect;
//! nothing here pools connections or reconnects behind the caller's back. An
//! operation on a disconnected manager is a programming error
//! ([`DbError::NotConnected`]), not a retryable condition.

use crate::config::{Settings, SslMode};
use crate::db::types::{QueryResults, Row, SqlValue, extract_value};
use crate::error::{DbError, DbResult};
use crate::secrets::SecretResolver;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tokio_postgres::Client;
use tokio_postgres::types::ToSql;
use tracing::{debug, info, warn};

/// Connection parameters that do not come from the secret payload
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Secrets Manager name holding host/port/username/password
    pub secret_name: String,

    /// Database to connect to (optional, can connect without specifying)
    pub database: Option<String>,

    /// SSL mode for the session
    pub ssl_mode: SslMode,

    /// Bound on connection establishment
    pub connect_timeout: Duration,

    /// Whether statements self-commit; explicit transactions force this off
    pub autocommit: bool,
}

impl ConnectionOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            secret_name: settings.db_secret_name.clone(),
            database: Some(settings.database.clone()),
            ssl_mode: settings.ssl_mode,
            connect_timeout: settings.connect_timeout,
            autocommit: settings.autocommit,
        }
    }
}

/// Manages one database session: lifecycle, parameterized statements and
/// transaction boundaries.
pub struct ConnectionManager {
    options: ConnectionOptions,
    resolver: Arc<SecretResolver>,
    client: Option<Client>,
    autocommit: bool,
    tx_open: bool,
}

impl ConnectionManager {
    pub fn new(resolver: Arc<SecretResolver>, options: ConnectionOptions) -> Self {
        let autocommit = options.autocommit;
        Self {
            options,
            resolver,
            client: None,
            autocommit,
            tx_open: false,
        }
    }

    /// Current autocommit mode (statement-level self-commit when true)
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Establish the database session.
    ///
    /// Idempotent: a second call on a live session logs a warning and returns.
    /// Credentials are resolved lazily through the secret resolver on first use.
    ///
    /// # Errors
    /// Returns `DbError::ConnectionFailed` wrapping the underlying cause
    /// (credential resolution, auth failure, timeout, unknown host).
    pub async fn connect(&mut self) -> DbResult<()> {
        if self.is_connected() {
            warn!("connection already established");
            return Ok(());
        }

        let creds = self
            .resolver
            .resolve(&self.options.secret_name)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let mut config = tokio_postgres::Config::new();
        config
            .host(&creds.host)
            .port(creds.port)
            .user(&creds.username)
            .password(&creds.password)
            .connect_timeout(self.options.connect_timeout);
        if let Some(database) = &self.options.database {
            config.dbname(database);
        }

        let client = match self.options.ssl_mode {
            SslMode::Disable => {
                let (client, connection) = config
                    .connect(tokio_postgres::NoTls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("database connection terminated: {e}");
                    }
                });
                client
            }
            SslMode::Prefer | SslMode::Require => {
                let tls = tokio_postgres_rustls::MakeRustlsConnect::new(make_tls_config());
                let (client, connection) = config
                    .connect(tls)
                    .await
                    .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;
                tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        warn!("database connection terminated: {e}");
                    }
                });
                client
            }
        };

        self.client = Some(client);
        self.tx_open = false;
        info!(
            host = %creds.host,
            database = self.options.database.as_deref().unwrap_or(""),
            "connected to database"
        );
        Ok(())
    }

    /// Close the database session.
    ///
    /// Idempotent and infallible: disconnect is a best-effort terminal action,
    /// so close failures are logged by the connection driver, never raised.
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            info!("database connection closed");
        }
        self.tx_open = false;
    }

    /// Check whether the session is open and usable
    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    fn client(&self) -> DbResult<&Client> {
        self.client
            .as_ref()
            .filter(|c| !c.is_closed())
            .ok_or(DbError::NotConnected)
    }

    /// Execute a read statement and materialize all rows as row-mappings.
    ///
    /// Parameters bind positionally (`$1..$n`); caller values are never
    /// interpolated into the statement text.
    ///
    /// # Errors
    /// `DbError::NotConnected` when disconnected, `DbError::QueryFailed` (with
    /// the failing statement) on execution errors.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> DbResult<QueryResults> {
        let client = self.client()?;

        let stmt = client
            .prepare(sql)
            .await
            .map_err(|e| DbError::query_failed(sql, e))?;
        let columns = Arc::new(
            stmt.columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect::<Vec<_>>(),
        );

        let pg_rows = client
            .query(&stmt, &param_refs(params))
            .await
            .map_err(|e| DbError::query_failed(sql, e))?;

        let rows = pg_rows
            .iter()
            .map(|pg_row| {
                let values = (0..columns.len()).map(|i| extract_value(pg_row, i)).collect();
                Row::new(Arc::clone(&columns), values)
            })
            .collect::<Vec<_>>();

        debug!(rows = rows.len(), "query executed");
        Ok(QueryResults::new(columns, rows))
    }

    /// Execute a write statement and return the affected-row count.
    ///
    /// In non-autocommit mode with no explicit transaction open the statement
    /// is committed before returning; on failure the transaction is rolled back
    /// before the error surfaces.
    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        self.client()?;

        let wrap = !self.autocommit && !self.tx_open;
        if wrap {
            self.batch("BEGIN").await?;
        }

        match self.execute_inner(sql, params).await {
            Ok(count) => {
                if wrap {
                    self.batch("COMMIT").await?;
                }
                debug!(affected = count, "statement executed");
                Ok(count)
            }
            Err(e) => {
                self.rollback_after_failure().await;
                Err(e)
            }
        }
    }

    async fn execute_inner(&self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        let client = self.client()?;
        let stmt = client
            .prepare(sql)
            .await
            .map_err(|e| DbError::query_failed(sql, e))?;
        client
            .execute(&stmt, &param_refs(params))
            .await
            .map_err(|e| DbError::query_failed(sql, e))
    }

    /// Apply one statement once per parameter tuple, in list order, as a single
    /// batched operation. Under non-autocommit mode the batch commits exactly
    /// once; the first failure rolls back the whole batch.
    pub async fn execute_many(&mut self, sql: &str, params_list: &[Vec<SqlValue>]) -> DbResult<u64> {
        self.client()?;

        let wrap = !self.autocommit && !self.tx_open;
        if wrap {
            self.batch("BEGIN").await?;
        }

        match self.execute_many_inner(sql, params_list).await {
            Ok(count) => {
                if wrap {
                    self.batch("COMMIT").await?;
                }
                debug!(affected = count, tuples = params_list.len(), "batch executed");
                Ok(count)
            }
            Err(e) => {
                self.rollback_after_failure().await;
                Err(e)
            }
        }
    }

    async fn execute_many_inner(&self, sql: &str, params_list: &[Vec<SqlValue>]) -> DbResult<u64> {
        let client = self.client()?;
        let stmt = client
            .prepare(sql)
            .await
            .map_err(|e| DbError::query_failed(sql, e))?;

        let mut affected = 0;
        for params in params_list {
            affected += client
                .execute(&stmt, &param_refs(params))
                .await
                .map_err(|e| DbError::query_failed(sql, e))?;
        }
        Ok(affected)
    }

    /// Begin an explicit transaction, forcing the manager out of autocommit
    /// mode if it was in it.
    pub async fn begin_transaction(&mut self) -> DbResult<()> {
        self.client()?;
        self.autocommit = false;
        if !self.tx_open {
            self.batch("BEGIN").await?;
            self.tx_open = true;
        }
        debug!("transaction started");
        Ok(())
    }

    /// Commit the current transaction
    pub async fn commit(&mut self) -> DbResult<()> {
        self.client()?;
        self.batch("COMMIT").await?;
        self.tx_open = false;
        debug!("transaction committed");
        Ok(())
    }

    /// Roll back the current transaction
    pub async fn rollback(&mut self) -> DbResult<()> {
        self.client()?;
        self.batch("ROLLBACK").await?;
        self.tx_open = false;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Run a block of statements as one transaction.
    ///
    /// Commits when the block completes, rolls back and re-raises when it
    /// fails, and restores the manager's original autocommit mode on every
    /// exit path.
    pub async fn with_transaction<T, F>(&mut self, f: F) -> DbResult<T>
    where
        F: for<'a> FnOnce(&'a mut ConnectionManager) -> BoxFuture<'a, DbResult<T>>,
    {
        let original_autocommit = self.autocommit;

        if let Err(e) = self.begin_transaction().await {
            self.autocommit = original_autocommit;
            return Err(e);
        }

        let outcome = match f(self).await {
            Ok(value) => self.commit().await.map(|_| value),
            Err(e) => {
                if let Err(rollback_err) = self.rollback().await {
                    warn!("rollback after failed transaction block also failed: {rollback_err}");
                }
                Err(e)
            }
        };

        self.autocommit = original_autocommit;
        outcome
    }

    async fn batch(&self, sql: &str) -> DbResult<()> {
        self.client()?
            .batch_execute(sql)
            .await
            .map_err(|e| DbError::query_failed(sql, e))
    }

    /// Best-effort rollback when a write path fails under non-autocommit mode.
    async fn rollback_after_failure(&mut self) {
        if self.autocommit {
            return;
        }
        if let Err(e) = self.batch("ROLLBACK").await {
            warn!("rollback after failed statement also failed: {e}");
        }
        self.tx_open = false;
    }
}

fn param_refs(params: &[SqlValue]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|p| p as &(dyn ToSql + Sync)).collect()
}

/// Build a rustls ClientConfig that trusts OS certificates (with Mozilla roots
/// as fallback)
fn make_tls_config() -> rustls::ClientConfig {
    let mut root_store = rustls::RootCertStore::empty();

    let native_certs = rustls_native_certs::load_native_certs();
    let mut loaded = 0;
    for cert in native_certs.certs {
        if root_store.add(cert).is_ok() {
            loaded += 1;
        }
    }
    if loaded == 0 {
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth()
}
