//! Scripted in-process exchange for tests and dry runs.
//!
//! Replays a fixed sequence of page results and records the params each call
//! was made with. Once the script runs out every call returns an empty page.

use super::provider::{OrdersApi, OrdersPage, UpstreamError};
use crate::domain::QueryParams;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

type Script = VecDeque<Result<OrdersPage, UpstreamError>>;

#[derive(Debug, Default)]
pub struct ScriptedApi {
    default_script: Mutex<Script>,
    per_symbol: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<QueryParams>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script used for any call whose `symbol` has no dedicated script.
    pub fn with_pages(
        self,
        pages: impl IntoIterator<Item = Result<OrdersPage, UpstreamError>>,
    ) -> Self {
        self.default_script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(pages);
        self
    }

    /// Script for calls filtered to `symbol`. Lets parallel tasks replay
    /// independently of each other.
    pub fn with_symbol_pages(
        self,
        symbol: &str,
        pages: impl IntoIterator<Item = Result<OrdersPage, UpstreamError>>,
    ) -> Self {
        self.per_symbol
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(symbol.to_string())
            .or_default()
            .extend(pages);
        self
    }

    /// Params of every call made so far, in call order.
    pub fn calls(&self) -> Vec<QueryParams> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl OrdersApi for ScriptedApi {
    fn name(&self) -> &str {
        "scripted"
    }

    fn list_orders(&self, params: &QueryParams) -> Result<OrdersPage, UpstreamError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(params.clone());

        let scripted = params.symbol().and_then(|symbol| {
            self.per_symbol
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_mut(symbol)
                .map(|script| script.pop_front())
        });

        let next = match scripted {
            Some(next) => next,
            None => self
                .default_script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front(),
        };

        next.unwrap_or_else(|| Ok(OrdersPage::default()))
    }
}
