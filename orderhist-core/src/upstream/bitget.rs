//! Bitget v2 futures order-history client.
//!
//! Signs each request with the account's API key (HMAC-SHA256 over
//! `timestamp + method + path + ?query`, base64 encoded), maps HTTP and
//! envelope failures onto [`UpstreamError`], and feeds the circuit breaker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{OrdersApi, OrdersPage, UpstreamError};
use crate::domain::{OrderRecord, QueryParams};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.bitget.com";
pub const ORDERS_HISTORY_PATH: &str = "/api/v2/mix/order/orders-history";
const SUCCESS_CODE: &str = "00000";

/// Envelope codes that mean the account is being throttled.
const RATE_LIMIT_CODES: [&str; 1] = ["429"];

type HmacSha256 = Hmac<Sha256>;

fn is_rate_limit_code(err: &UpstreamError) -> bool {
    matches!(err, UpstreamError::Api { code, .. } if RATE_LIMIT_CODES.contains(&code.as_str()))
}

/// API key triple issued by the exchange.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Response envelope shared by every Bitget v2 endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    code: String,
    #[serde(default)]
    msg: String,
    data: Option<HistoryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryData {
    entrusted_list: Option<Vec<OrderRecord>>,
    end_id: Option<String>,
}

pub struct BitgetClient {
    client: reqwest::blocking::Client,
    base_url: String,
    credentials: Credentials,
    circuit_breaker: Arc<CircuitBreaker>,
}

impl BitgetClient {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        circuit_breaker: Arc<CircuitBreaker>,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            circuit_breaker,
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    /// Build the request URL for the order-history endpoint.
    fn history_url(&self, params: &QueryParams) -> Result<reqwest::Url, UpstreamError> {
        reqwest::Url::parse_with_params(
            &format!("{}{ORDERS_HISTORY_PATH}", self.base_url),
            params.iter(),
        )
        .map_err(|e| UpstreamError::Transport(format!("invalid request URL: {e}")))
    }

    /// Signature over `timestamp + METHOD + path[?query]`.
    fn sign(
        &self,
        timestamp: &str,
        method: &str,
        path: &str,
        query: Option<&str>,
    ) -> Result<String, UpstreamError> {
        let mut prehash = format!("{timestamp}{method}{path}");
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            prehash.push('?');
            prehash.push_str(q);
        }
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret_key.as_bytes())
            .map_err(|e| UpstreamError::Transport(format!("signing key rejected: {e}")))?;
        mac.update(prehash.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Decode a response body into a page, surfacing envelope errors.
    fn parse_body(body: &str) -> Result<OrdersPage, UpstreamError> {
        let envelope: Envelope = serde_json::from_str(body)
            .map_err(|e| UpstreamError::ResponseFormat(format!("order history body: {e}")))?;

        if envelope.code != SUCCESS_CODE {
            return Err(UpstreamError::Api {
                code: envelope.code,
                message: envelope.msg,
            });
        }

        let (orders, end_id) = match envelope.data {
            Some(data) => (data.entrusted_list.unwrap_or_default(), data.end_id),
            None => (Vec::new(), None),
        };
        Ok(OrdersPage { orders, end_id })
    }
}

impl OrdersApi for BitgetClient {
    fn name(&self) -> &str {
        "bitget"
    }

    fn list_orders(&self, params: &QueryParams) -> Result<OrdersPage, UpstreamError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(UpstreamError::CircuitOpen {
                remaining_secs: self.circuit_breaker.remaining_cooldown().as_secs(),
            });
        }

        let url = self.history_url(params)?;
        let timestamp = chrono::Utc::now().timestamp_millis().to_string();
        let signature = self.sign(&timestamp, "GET", url.path(), url.query())?;
        debug!(%url, "requesting order history page");

        let resp = self
            .client
            .get(url)
            .header("ACCESS-KEY", &self.credentials.api_key)
            .header("ACCESS-SIGN", signature)
            .header("ACCESS-TIMESTAMP", &timestamp)
            .header("ACCESS-PASSPHRASE", &self.credentials.passphrase)
            .header("Content-Type", "application/json")
            .header("locale", "en-US")
            .send()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = resp.status();

        if status == reqwest::StatusCode::FORBIDDEN {
            warn!("exchange returned 403, tripping circuit breaker");
            self.circuit_breaker.trip();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: resp.text().unwrap_or_default(),
            });
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            self.circuit_breaker.record_failure();
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(UpstreamError::RateLimited {
                retry_after_secs: retry_after,
            });
        }

        let body = resp
            .text()
            .map_err(|e| UpstreamError::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            // Error bodies usually carry the same envelope with a failure code.
            let err = match Self::parse_body(&body) {
                Err(api @ UpstreamError::Api { .. }) => api,
                _ => UpstreamError::Status {
                    status: status.as_u16(),
                    body,
                },
            };
            // 4xx rejections are about this request, not the exchange's health.
            if status.is_server_error() || is_rate_limit_code(&err) {
                self.circuit_breaker.record_failure();
            }
            return Err(err);
        }

        match Self::parse_body(&body) {
            Ok(page) => {
                self.circuit_breaker.record_success();
                Ok(page)
            }
            Err(e) => {
                if is_rate_limit_code(&e) {
                    self.circuit_breaker.record_failure();
                }
                Err(e)
            }
        }
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
