//! Cursor-following order-history fetcher.
//!
//! Pages are requested strictly in sequence since each cursor comes from the
//! previous response. A recoverable exchange error ends the loop early and the
//! orders collected so far are returned as a partial result; only transport
//! and decoding failures abort the fetch.

use crate::domain::{OrderRecord, QueryParams};
use crate::upstream::{OrdersApi, UpstreamError};
use tracing::{debug, info, warn};

/// Why a fetch stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum Completeness {
    /// The exchange signalled end-of-data (empty page or end cursor).
    Complete,
    /// A recoverable error on page `failed_page` (1-based) cut the fetch short.
    Partial {
        failed_page: usize,
        error: UpstreamError,
    },
}

/// Orders in exchange page order, plus how the fetch ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub orders: Vec<OrderRecord>,
    pub completeness: Completeness,
    /// Pages that returned data.
    pub pages: usize,
}

impl FetchResult {
    pub fn is_complete(&self) -> bool {
        matches!(self.completeness, Completeness::Complete)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

pub struct HistoryFetcher<'a> {
    api: &'a dyn OrdersApi,
}

impl<'a> HistoryFetcher<'a> {
    pub fn new(api: &'a dyn OrdersApi) -> Self {
        Self { api }
    }

    /// Follow the cursor from `params` until the exchange runs out of orders.
    ///
    /// Returns `Err` only for non-recoverable errors; see
    /// [`UpstreamError::is_recoverable`].
    pub fn fetch(&self, params: &QueryParams) -> Result<FetchResult, UpstreamError> {
        let mut orders: Vec<OrderRecord> = Vec::new();
        let mut page_params = params.clone();
        let mut pages = 0;

        loop {
            let page_no = pages + 1;
            let page = match self.api.list_orders(&page_params) {
                Ok(page) => page,
                Err(e) if e.is_recoverable() => {
                    warn!(
                        api = self.api.name(),
                        params = %page_params,
                        page = page_no,
                        collected = orders.len(),
                        error = %e,
                        "exchange error, returning collected orders"
                    );
                    return Ok(FetchResult {
                        orders,
                        completeness: Completeness::Partial {
                            failed_page: page_no,
                            error: e,
                        },
                        pages,
                    });
                }
                Err(e) => return Err(e),
            };

            if page.orders.is_empty() {
                debug!(page = page_no, "empty page, end of data");
                break;
            }

            pages = page_no;
            let received = page.orders.len();
            let next_cursor = page.next_cursor().map(String::from);
            orders.extend(page.orders);
            debug!(page = page_no, received, total = orders.len(), "page fetched");

            match next_cursor {
                Some(cursor) => page_params = page_params.with_cursor(&cursor),
                None => break,
            }
        }

        info!(
            product_type = params.product_type(),
            symbol = params.symbol().unwrap_or("*"),
            pages,
            orders = orders.len(),
            "order history fetched"
        );

        Ok(FetchResult {
            orders,
            completeness: Completeness::Complete,
            pages,
        })
    }
}
