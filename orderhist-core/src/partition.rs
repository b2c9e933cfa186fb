//! Group fetched orders by symbol and persist one artifact per symbol.
//!
//! Two layouts:
//! - grouped: one bucket per symbol, newest first (`cTime` descending)
//! - single: the fetch was already scoped to one symbol, oldest first
//!
//! Sorting is stable, and orders without a usable `cTime` count as oldest.

use crate::domain::{OrderRecord, SymbolArtifact, UNKNOWN_SYMBOL};
use crate::storage::{put_json, symbol_artifact_key, ArtifactReceipt, ObjectStore, StorageError};
use std::cmp::Reverse;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Bucket orders by symbol, each bucket sorted newest first.
pub fn partition(records: Vec<OrderRecord>) -> BTreeMap<String, SymbolArtifact> {
    let mut grouped: BTreeMap<String, Vec<OrderRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.bucket_symbol().to_string())
            .or_default()
            .push(record);
    }

    if let Some(unknown) = grouped.get(UNKNOWN_SYMBOL) {
        warn!(
            count = unknown.len(),
            "orders without a symbol grouped under {UNKNOWN_SYMBOL}"
        );
    }

    grouped
        .into_iter()
        .map(|(symbol, mut orders)| {
            orders.sort_by_key(|o| Reverse(o.creation_time()));
            (symbol, SymbolArtifact::new(orders))
        })
        .collect()
}

/// Wrap orders for a single symbol, sorted oldest first.
pub fn partition_single(mut records: Vec<OrderRecord>) -> SymbolArtifact {
    records.sort_by_key(OrderRecord::creation_time);
    SymbolArtifact::new(records)
}

/// A persisted artifact and the number of orders in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedArtifact {
    pub symbol: String,
    pub orders_count: usize,
    pub receipt: ArtifactReceipt,
}

/// Writes partitioned artifacts under `orders-history/{productType}/`.
pub struct SymbolPartitioner<'a> {
    store: &'a dyn ObjectStore,
    bucket: &'a str,
}

impl<'a> SymbolPartitioner<'a> {
    pub fn new(store: &'a dyn ObjectStore, bucket: &'a str) -> Self {
        Self { store, bucket }
    }

    /// Persist orders for one symbol. An empty set is still written so
    /// "zero orders" is distinguishable from "never fetched".
    pub fn persist_single(
        &self,
        product_type: &str,
        symbol: &str,
        records: Vec<OrderRecord>,
    ) -> Result<PersistedArtifact, StorageError> {
        let artifact = partition_single(records);
        self.write(product_type, symbol, &artifact)
    }

    /// Persist one artifact per symbol present in `records`.
    pub fn persist_grouped(
        &self,
        product_type: &str,
        records: Vec<OrderRecord>,
    ) -> Result<Vec<PersistedArtifact>, StorageError> {
        partition(records)
            .iter()
            .map(|(symbol, artifact)| self.write(product_type, symbol, artifact))
            .collect()
    }

    fn write(
        &self,
        product_type: &str,
        symbol: &str,
        artifact: &SymbolArtifact,
    ) -> Result<PersistedArtifact, StorageError> {
        let key = symbol_artifact_key(product_type, symbol);
        let receipt = put_json(self.store, self.bucket, &key, artifact)?;
        info!(
            product_type,
            symbol,
            orders = artifact.orders_count(),
            key = %receipt.key,
            "symbol artifact written"
        );
        Ok(PersistedArtifact {
            symbol: symbol.to_string(),
            orders_count: artifact.orders_count(),
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn times(artifact: &SymbolArtifact) -> Vec<Option<i64>> {
        artifact.orders().iter().map(OrderRecord::creation_time).collect()
    }

    #[test]
    fn grouped_mode_sorts_each_bucket_descending() {
        let records = vec![
            OrderRecord::new("BTCUSDT", 1),
            OrderRecord::new("ETHUSDT", 5),
            OrderRecord::new("BTCUSDT", 3),
            OrderRecord::new("BTCUSDT", 2),
        ];
        let grouped = partition(records);

        assert_eq!(grouped.len(), 2);
        assert_eq!(times(&grouped["BTCUSDT"]), vec![Some(3), Some(2), Some(1)]);
        assert_eq!(grouped["BTCUSDT"].orders_count(), 3);
        assert_eq!(grouped["ETHUSDT"].orders_count(), 1);
    }

    #[test]
    fn single_mode_sorts_ascending() {
        let artifact = partition_single(vec![
            OrderRecord::new("BTCUSDT", 100),
            OrderRecord::new("BTCUSDT", 90),
        ]);
        assert_eq!(times(&artifact), vec![Some(90), Some(100)]);
        assert_eq!(artifact.orders_count(), 2);
    }

    #[test]
    fn symbol_less_orders_go_to_unknown() {
        let orphan: OrderRecord = serde_json::from_str(r#"{"cTime":"7"}"#).unwrap();
        let grouped = partition(vec![orphan, OrderRecord::new("BTCUSDT", 1)]);
        assert_eq!(grouped[UNKNOWN_SYMBOL].orders_count(), 1);
    }

    #[test]
    fn missing_ctime_sorts_as_oldest() {
        let undated: OrderRecord = serde_json::from_str(r#"{"symbol":"A"}"#).unwrap();
        let artifact = partition_single(vec![OrderRecord::new("A", 5), undated.clone()]);
        assert_eq!(artifact.orders()[0], undated);

        let grouped = partition(vec![undated.clone(), OrderRecord::new("A", 5)]);
        assert_eq!(grouped["A"].orders()[1], undated);
    }

    #[test]
    fn empty_single_artifact_is_still_written() {
        let store = MemoryStore::new();
        let partitioner = SymbolPartitioner::new(&store, "bucket");

        let persisted = partitioner
            .persist_single("usdt-futures", "ETHUSDT", vec![])
            .unwrap();

        assert_eq!(persisted.orders_count, 0);
        let body = store
            .get("bucket", "orders-history/usdt-futures/ETHUSDT.json")
            .unwrap();
        let artifact: SymbolArtifact = serde_json::from_slice(&body).unwrap();
        assert!(artifact.is_empty());

        let raw: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(raw["orders_count"], 0);
    }

    #[test]
    fn grouped_persist_writes_one_key_per_symbol() {
        let store = MemoryStore::new();
        let partitioner = SymbolPartitioner::new(&store, "bucket");

        let persisted = partitioner
            .persist_grouped(
                "usdt-futures",
                vec![OrderRecord::new("BTCUSDT", 1), OrderRecord::new("ETHUSDT", 2)],
            )
            .unwrap();

        assert_eq!(persisted.len(), 2);
        assert_eq!(
            store.keys("bucket"),
            vec![
                "orders-history/usdt-futures/BTCUSDT.json".to_string(),
                "orders-history/usdt-futures/ETHUSDT.json".to_string(),
            ]
        );
    }

    #[test]
    fn rerun_overwrites_identically() {
        let store = MemoryStore::new();
        let partitioner = SymbolPartitioner::new(&store, "bucket");
        let records = vec![OrderRecord::new("BTCUSDT", 1), OrderRecord::new("BTCUSDT", 2)];

        let first = partitioner
            .persist_single("usdt-futures", "BTCUSDT", records.clone())
            .unwrap();
        let second = partitioner
            .persist_single("usdt-futures", "BTCUSDT", records)
            .unwrap();

        assert_eq!(first.receipt.digest, second.receipt.digest);
        assert_eq!(store.len(), 1);
    }
}
