//! Exchange access: the OrdersApi seam, the Bitget client, and its circuit breaker.

pub mod bitget;
pub mod circuit_breaker;
pub mod provider;
pub mod scripted;

pub use bitget::{BitgetClient, Credentials, DEFAULT_BASE_URL};
pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use provider::{OrdersApi, OrdersPage, UpstreamError, END_OF_DATA_CURSOR};
pub use scripted::ScriptedApi;
