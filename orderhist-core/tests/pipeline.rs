//! End-to-end pipeline tests: fetch → partition → persist → aggregate.
//!
//! Driven by a scripted exchange; storage is either in-memory or a temp dir.

use orderhist_core::domain::{AggregateReport, OrderRecord, QueryParams, SymbolArtifact};
use orderhist_core::storage::{report_key, symbol_artifact_key, FsStore, MemoryStore, ObjectStore};
use orderhist_core::upstream::{OrdersPage, ScriptedApi, UpstreamError};
use orderhist_core::{HistoryFetcher, ReportAggregator, SymbolPartitioner, TaskDescriptor};

const PRODUCT: &str = "usdt-futures";
const BUCKET: &str = "orders";

fn btc(c_time: i64) -> OrderRecord {
    OrderRecord::new("BTCUSDT", c_time).with_field("orderId", c_time.to_string())
}

fn two_page_exchange() -> ScriptedApi {
    ScriptedApi::new().with_pages([
        Ok(OrdersPage::new(vec![btc(100)], Some("5"))),
        Ok(OrdersPage::new(vec![btc(90)], Some("0"))),
    ])
}

#[test]
fn two_pages_fetch_completely() {
    let api = two_page_exchange();
    let params = QueryParams::new(PRODUCT).with("symbol", "BTCUSDT");

    let result = HistoryFetcher::new(&api).fetch(&params).unwrap();

    assert_eq!(result.len(), 2);
    assert!(result.is_complete());
}

#[test]
fn single_symbol_artifact_is_ascending() {
    let api = two_page_exchange();
    let params = QueryParams::new(PRODUCT).with("symbol", "BTCUSDT");
    let result = HistoryFetcher::new(&api).fetch(&params).unwrap();

    let store = MemoryStore::new();
    let persisted = SymbolPartitioner::new(&store, BUCKET)
        .persist_single(PRODUCT, "BTCUSDT", result.orders)
        .unwrap();

    assert_eq!(persisted.orders_count, 2);
    let body = store
        .get(BUCKET, &symbol_artifact_key(PRODUCT, "BTCUSDT"))
        .unwrap();
    let artifact: SymbolArtifact = serde_json::from_slice(&body).unwrap();
    let times: Vec<_> = artifact.orders().iter().map(|o| o.creation_time()).collect();
    assert_eq!(times, vec![Some(90), Some(100)]);
    assert_eq!(artifact.orders_count(), 2);
}

#[test]
fn aggregate_skips_zero_hint_symbol() {
    let store = MemoryStore::new();
    let partitioner = SymbolPartitioner::new(&store, BUCKET);
    let btc_art = partitioner
        .persist_single(PRODUCT, "BTCUSDT", vec![btc(100), btc(90)])
        .unwrap();
    let eth_art = partitioner.persist_single(PRODUCT, "ETHUSDT", vec![]).unwrap();

    let tasks = vec![
        TaskDescriptor::new(BUCKET, btc_art.receipt.key, btc_art.orders_count),
        TaskDescriptor::new(BUCKET, eth_art.receipt.key, eth_art.orders_count),
    ];
    let report = ReportAggregator::new(&store).aggregate(&tasks).unwrap();

    assert_eq!(report.total_orders(), 2);
    assert_eq!(report.symbols().len(), 1);
    assert_eq!(report.bucket("BTCUSDT").unwrap().orders_count(), 2);
    assert!(report.bucket("ETHUSDT").is_none());
}

#[test]
fn partial_fetch_is_persisted_and_aggregated() {
    let api = ScriptedApi::new().with_pages([
        Ok(OrdersPage::new(vec![btc(300), btc(200)], Some("2"))),
        Err(UpstreamError::Api {
            code: "429".into(),
            message: "Too Many Requests".into(),
        }),
    ]);
    let params = QueryParams::new(PRODUCT).with("symbol", "BTCUSDT");
    let result = HistoryFetcher::new(&api).fetch(&params).unwrap();
    assert!(!result.is_complete());

    let store = MemoryStore::new();
    let persisted = SymbolPartitioner::new(&store, BUCKET)
        .persist_single(PRODUCT, "BTCUSDT", result.orders)
        .unwrap();
    let task = TaskDescriptor::new(BUCKET, persisted.receipt.key, persisted.orders_count);

    let report = ReportAggregator::new(&store).aggregate(&[task]).unwrap();
    assert_eq!(report.total_orders(), 2);
}

#[test]
fn filesystem_pipeline_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    // Unscoped fetch: orders for several symbols come back mixed.
    let api = ScriptedApi::new().with_pages([
        Ok(OrdersPage::new(
            vec![btc(5), OrderRecord::new("ETHUSDT", 4), btc(3)],
            Some("3"),
        )),
        Ok(OrdersPage::new(vec![OrderRecord::new("ETHUSDT", 2)], None)),
    ]);
    let result = HistoryFetcher::new(&api)
        .fetch(&QueryParams::new(PRODUCT))
        .unwrap();

    let persisted = SymbolPartitioner::new(&store, BUCKET)
        .persist_grouped(PRODUCT, result.orders)
        .unwrap();
    assert_eq!(persisted.len(), 2);

    let tasks: Vec<TaskDescriptor> = persisted
        .iter()
        .map(|p| TaskDescriptor::new(BUCKET, p.receipt.key.clone(), p.orders_count))
        .collect();
    let aggregator = ReportAggregator::new(&store);
    let report = aggregator.aggregate(&tasks).unwrap();
    aggregator.write_report(BUCKET, PRODUCT, &report).unwrap();

    let stored_path = dir.path().join(BUCKET).join(report_key(PRODUCT));
    let stored: AggregateReport =
        serde_json::from_str(&std::fs::read_to_string(stored_path).unwrap()).unwrap();

    assert_eq!(stored.total_orders(), 4);
    assert_eq!(stored.bucket("BTCUSDT").unwrap().orders_count(), 2);
    assert_eq!(stored.bucket("ETHUSDT").unwrap().orders_count(), 2);
    // Grouped artifacts are newest first.
    let eth_times: Vec<_> = stored.bucket("ETHUSDT").unwrap().orders().iter().map(|o| o.creation_time()).collect();
    assert_eq!(eth_times, vec![Some(4), Some(2)]);
}

#[test]
fn pass_through_fields_survive_the_pipeline() {
    let store = MemoryStore::new();
    let order = btc(1)
        .with_field("side", "sell")
        .with_field("presetStopLossPrice", serde_json::Value::Null);
    let persisted = SymbolPartitioner::new(&store, BUCKET)
        .persist_single(PRODUCT, "BTCUSDT", vec![order.clone()])
        .unwrap();
    let task = TaskDescriptor::new(BUCKET, persisted.receipt.key, 1);

    let report = ReportAggregator::new(&store).aggregate(&[task]).unwrap();

    assert_eq!(report.bucket("BTCUSDT").unwrap().orders()[0], order);
}
