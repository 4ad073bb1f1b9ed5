//! Trading-service HTTP client
//!
//! Thin client for the upstream trading-operations service. Responses are
//! trigger/result signals for the handlers, not part of this crate's own
//! data model, so only the account-summary payload gets a typed shape.

use crate::config::settings::API_KEY_HEADER;
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Client for the upstream trading-operations service
#[derive(Clone)]
pub struct TradingApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// One tag/value row of an account summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummaryRow {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Response payload of `GET /account`
#[derive(Debug, Deserialize)]
pub struct AccountSummaryResponse {
    #[serde(default)]
    pub account_summary: Vec<AccountSummaryRow>,
}

impl TradingApiClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        }
    }

    /// Fetch the account summary, optionally scoped to one account number.
    ///
    /// # Errors
    /// `ApiError::Status` on a non-success reply, `ApiError::Deserialization`
    /// when the body does not match the expected shape.
    pub async fn get_account_summary(
        &self,
        account_number: Option<&str>,
    ) -> ApiResult<AccountSummaryResponse> {
        let mut request = self
            .client
            .get(format!("{}/account", self.base_url))
            .header(API_KEY_HEADER, &self.api_key);
        if let Some(account) = account_number {
            request = request.query(&[("account_number", account)]);
        }

        let text = expect_success(request.send().await?).await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Deserialization(e.to_string()))
    }

    /// Ask the service to rebuild its contracts table for the given details.
    pub async fn update_contracts_table(
        &self,
        contracts_details: &serde_json::Value,
    ) -> ApiResult<()> {
        let response = self
            .client
            .post(format!("{}/data/update-contracts-table", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&json!({ "contracts_details": contracts_details }))
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }

    /// Ask the service to repopulate the orders table.
    pub async fn refresh_orders(&self) -> ApiResult<()> {
        let response = self
            .client
            .patch(format!("{}/data/refresh-orders", self.base_url))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        expect_success(response).await?;
        Ok(())
    }
}

async fn expect_success(response: reqwest::Response) -> ApiResult<String> {
    let status = response.status();
    let text = response.text().await?;
    if status.is_success() {
        Ok(text)
    } else {
        Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}
