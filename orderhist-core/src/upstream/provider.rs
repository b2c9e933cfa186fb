//! Orders API trait and structured error types.
//!
//! The OrdersApi trait abstracts over the exchange client so the fetcher can be
//! driven by the real HTTP client or by a scripted fake in tests.

use crate::domain::{OrderRecord, QueryParams};
use thiserror::Error;

/// Cursor value the exchange uses for "no more pages".
pub const END_OF_DATA_CURSOR: &str = "0";

/// Errors from one call to the order-history endpoint.
///
/// [`UpstreamError::is_recoverable`] decides whether a fetch keeps what it has
/// collected (recoverable) or fails outright.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UpstreamError {
    #[error("exchange API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("HTTP {status} from exchange: {body}")]
    Status { status: u16, body: String },

    #[error("rate limited by exchange (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("circuit breaker open: exchange requests suspended for {remaining_secs}s")]
    CircuitOpen { remaining_secs: u64 },

    #[error("network error: {0}")]
    Transport(String),

    #[error("response format changed: {0}")]
    ResponseFormat(String),
}

impl UpstreamError {
    /// Errors the exchange reported about this request. Collected pages stay valid.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Api { .. }
                | UpstreamError::Status { .. }
                | UpstreamError::RateLimited { .. }
                | UpstreamError::CircuitOpen { .. }
        )
    }
}

/// One page of the order-history listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersPage {
    pub orders: Vec<OrderRecord>,
    /// Raw continuation cursor (`endId`) as sent.
    pub end_id: Option<String>,
}

impl OrdersPage {
    pub fn new(orders: Vec<OrderRecord>, end_id: Option<&str>) -> Self {
        Self {
            orders,
            end_id: end_id.map(String::from),
        }
    }

    /// Cursor for the next page, or `None` when the exchange signalled the end.
    pub fn next_cursor(&self) -> Option<&str> {
        match self.end_id.as_deref() {
            None => None,
            Some(c) if c.is_empty() || c == END_OF_DATA_CURSOR => None,
            Some(c) => Some(c),
        }
    }
}

/// Exchange client able to list historical orders.
///
/// Implementations own transport and authentication. A single instance is
/// shared by every fetch task in the process.
pub trait OrdersApi: Send + Sync {
    /// Human-readable name of this client.
    fn name(&self) -> &str;

    /// Fetch one page of orders for `params`.
    fn list_orders(&self, params: &QueryParams) -> Result<OrdersPage, UpstreamError>;

    /// Whether the client is currently willing to make requests.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_sentinels() {
        assert_eq!(OrdersPage::new(vec![], None).next_cursor(), None);
        assert_eq!(OrdersPage::new(vec![], Some("0")).next_cursor(), None);
        assert_eq!(OrdersPage::new(vec![], Some("")).next_cursor(), None);
        assert_eq!(OrdersPage::new(vec![], Some("5")).next_cursor(), Some("5"));
    }

    #[test]
    fn recoverability() {
        assert!(UpstreamError::Api {
            code: "40034".into(),
            message: "param error".into()
        }
        .is_recoverable());
        assert!(UpstreamError::RateLimited { retry_after_secs: 1 }.is_recoverable());
        assert!(!UpstreamError::Transport("reset".into()).is_recoverable());
        assert!(!UpstreamError::ResponseFormat("bad json".into()).is_recoverable());
    }
}
