//! Credential resolution
//!
//! Database credentials live in AWS Secrets Manager as a JSON document with
//! `host`, `username`, `password` and an optional `port`. The resolver fetches
//! a secret once and caches it for the life of the process; there is no expiry
//! or refresh, so rotated credentials require a restart.

use crate::error::{SecretError, SecretResult};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

/// Structured database credentials, as stored in the secret payload
#[derive(Debug, Clone, Deserialize)]
pub struct DbCredentials {
    /// Database host
    pub host: String,

    /// Database port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username
    pub username: String,

    /// Password
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

/// Raw access to a secret store, one payload string per secret name.
///
/// Abstracted behind a trait so tests can substitute an in-memory store.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the raw payload for a secret name.
    ///
    /// # Errors
    /// Returns `SecretError::Unavailable` when the store has no payload for the
    /// name, `SecretError::Store` for transport failures.
    async fn fetch_secret(&self, name: &str) -> SecretResult<String>;
}

/// AWS Secrets Manager-backed store
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

impl AwsSecretStore {
    /// Build a store for the given region using the default credential chain.
    pub async fn new(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }
    }
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn fetch_secret(&self, name: &str) -> SecretResult<String> {
        let response = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| SecretError::Store(e.to_string()))?;

        match response.secret_string() {
            Some(payload) => Ok(payload.to_string()),
            None => Err(SecretError::Unavailable(name.to_string())),
        }
    }
}

/// Resolves secret names into parsed credentials, caching each first success.
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    cache: Mutex<HashMap<String, Arc<DbCredentials>>>,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a secret name into credentials.
    ///
    /// The first successful resolution per name is cached; later calls return
    /// the cached value without a store round-trip.
    ///
    /// # Errors
    /// Surfaces the store's `Unavailable`/`Store` errors, or `SecretError::Parse`
    /// when the payload does not decode into [`DbCredentials`].
    pub async fn resolve(&self, name: &str) -> SecretResult<Arc<DbCredentials>> {
        if let Some(cached) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Ok(Arc::clone(cached));
        }

        let payload = self.store.fetch_secret(name).await?;
        let credentials: DbCredentials = serde_json::from_str(&payload)?;
        let credentials = Arc::new(credentials);

        info!(secret = name, "retrieved database credentials");
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), Arc::clone(&credentials));

        Ok(credentials)
    }
}
