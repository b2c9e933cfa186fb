//! Persisted documents: per-symbol artifacts, the aggregate report, and the
//! task descriptors that point from one to the other.
//!
//! Counts are never trusted from input. Both [`SymbolArtifact`] and
//! [`AggregateReport`] recompute them on decode, so `orders_count` always
//! equals the number of orders actually held.

use super::order::OrderRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Orders for one symbol plus their count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawArtifact")]
pub struct SymbolArtifact {
    orders: Vec<OrderRecord>,
    orders_count: usize,
}

#[derive(Deserialize)]
struct RawArtifact {
    #[serde(default)]
    orders: Vec<OrderRecord>,
}

impl From<RawArtifact> for SymbolArtifact {
    fn from(raw: RawArtifact) -> Self {
        Self::new(raw.orders)
    }
}

impl SymbolArtifact {
    pub fn new(orders: Vec<OrderRecord>) -> Self {
        let orders_count = orders.len();
        Self {
            orders,
            orders_count,
        }
    }

    pub fn push(&mut self, order: OrderRecord) {
        self.orders.push(order);
        self.orders_count += 1;
    }

    pub fn orders(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn orders_count(&self) -> usize {
        self.orders_count
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn into_orders(self) -> Vec<OrderRecord> {
        self.orders
    }
}

/// Consolidated report for one product type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawReport")]
pub struct AggregateReport {
    symbols: BTreeMap<String, SymbolArtifact>,
    total_orders: usize,
}

#[derive(Deserialize)]
struct RawReport {
    #[serde(default)]
    symbols: BTreeMap<String, SymbolArtifact>,
}

impl From<RawReport> for AggregateReport {
    fn from(raw: RawReport) -> Self {
        let total_orders = raw.symbols.values().map(SymbolArtifact::orders_count).sum();
        Self {
            symbols: raw.symbols,
            total_orders,
        }
    }
}

impl AggregateReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order to its symbol bucket.
    pub fn push(&mut self, order: OrderRecord) {
        let symbol = order.bucket_symbol().to_string();
        self.symbols.entry(symbol).or_default().push(order);
        self.total_orders += 1;
    }

    pub fn symbols(&self) -> &BTreeMap<String, SymbolArtifact> {
        &self.symbols
    }

    pub fn bucket(&self, symbol: &str) -> Option<&SymbolArtifact> {
        self.symbols.get(symbol)
    }

    pub fn total_orders(&self) -> usize {
        self.total_orders
    }

    /// Per-symbol counts, used to compare two runs.
    pub fn counts(&self) -> BTreeMap<&str, usize> {
        self.symbols
            .iter()
            .map(|(s, a)| (s.as_str(), a.orders_count()))
            .collect()
    }
}

/// Location of one per-symbol artifact plus its record-count hint.
///
/// A missing `orders_count` reads as zero, which the aggregator treats as
/// "nothing to read".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub bucket: String,
    #[serde(rename = "s3Key")]
    pub s3_key: String,
    #[serde(default)]
    pub orders_count: usize,
}

impl TaskDescriptor {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, orders_count: usize) -> Self {
        Self {
            bucket: bucket.into(),
            s3_key: key.into(),
            orders_count,
        }
    }
}
