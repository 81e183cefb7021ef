//! Ledger gateway client
//!
//! Talks to a JSON gateway in front of the ledger node. The gateway owns
//! signing and submission; this client only resolves identifiers and asks
//! for location writes.
//!
//! | Operation | Request | Response |
//! |---|---|---|
//! | token for transaction | `GET /transactions/{tx}/token` | `{"token_id": 7}` |
//! | pool for token | `GET /tokens/{id}/pool` | `{"pool_id": 3}` |
//! | pool items | `GET /pools/{id}/items` | `{"items": [..]}` |
//! | location write | `POST /pools/{id}/location` `{"location": ".."}` | `{"tx_hash": "0x..", "status": 1}` |

use super::{BridgeError, CommitReceipt, LedgerCommit, LedgerLookup, PoolId, TokenId};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const USER_AGENT: &str = concat!("sctrk-sc/", env!("CARGO_PKG_VERSION"));

/// Receipt status reported for a successful write
const STATUS_CONFIRMED: u64 = 1;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_id: u64,
}

#[derive(Debug, Deserialize)]
struct PoolResponse {
    pool_id: u64,
}

#[derive(Debug, Deserialize)]
struct PoolItemsResponse {
    items: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct LocationRequest<'a> {
    location: &'a str,
}

#[derive(Debug, Deserialize)]
struct ReceiptResponse {
    tx_hash: String,
    status: u64,
}

/// Gateway-backed implementation of both ledger contracts
pub struct HttpLedger {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpLedger {
    /// Create a client for `base_url`
    ///
    /// `request_timeout` bounds each individual HTTP request.
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, BridgeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BridgeError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Querying ledger gateway");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::LookupFailure(format!(
                "GET {} returned {}: {}",
                path,
                status.as_u16(),
                error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| BridgeError::LookupFailure(format!("malformed response from {}: {}", path, e)))
    }
}

#[async_trait]
impl LedgerLookup for HttpLedger {
    async fn resolve_token_id(&self, tx_ref: &str) -> Result<TokenId, BridgeError> {
        let response: TokenResponse = self
            .get_json(&format!("/transactions/{}/token", tx_ref))
            .await?;
        Ok(TokenId(response.token_id))
    }

    async fn resolve_pool_id(&self, token_id: TokenId) -> Result<PoolId, BridgeError> {
        let response: PoolResponse = self.get_json(&format!("/tokens/{}/pool", token_id)).await?;
        Ok(PoolId(response.pool_id))
    }

    async fn pool_item_count(&self, pool_id: PoolId) -> Result<usize, BridgeError> {
        let response: PoolItemsResponse = self.get_json(&format!("/pools/{}/items", pool_id)).await?;
        Ok(response.items.len())
    }
}

#[async_trait]
impl LedgerCommit for HttpLedger {
    async fn commit_location(
        &self,
        pool_id: PoolId,
        location: &str,
    ) -> Result<CommitReceipt, BridgeError> {
        let url = format!("{}/pools/{}/location", self.base_url, pool_id);
        tracing::info!(pool_id = %pool_id, location = %location, "Submitting location update");

        let response = self
            .http_client
            .post(&url)
            .json(&LocationRequest { location })
            .send()
            .await
            .map_err(|e| BridgeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BridgeError::CommitFailure(format!(
                "gateway returned {}: {}",
                status.as_u16(),
                error_text
            )));
        }

        let receipt: ReceiptResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::CommitFailure(format!("malformed receipt: {}", e)))?;

        tracing::debug!(tx_hash = %receipt.tx_hash, status = receipt.status, "Location update receipt");

        Ok(CommitReceipt {
            tx_hash: receipt.tx_hash,
            confirmed: receipt.status == STATUS_CONFIRMED,
        })
    }
}
