//! Property tests for request handling.
//!
//! Uses proptest to verify:
//! 1. Extract symbol lists are de-duplicated, keeping first-seen order
//! 2. Numeric filters reach the exchange as their decimal text
//! 3. Coordinator totals equal the orders scripted per symbol

use orderhist_core::storage::MemoryStore;
use orderhist_core::upstream::{OrdersPage, ScriptedApi};
use orderhist_core::OrderRecord;
use orderhist_runner::{Coordinator, ExtractRequest, FetchRequest, TaskContext, TaskStatus};
use proptest::prelude::*;
use std::sync::Arc;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_symbol() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["BTCUSDT", "ETHUSDT", "SOLUSDT", "XRPUSDT", "ADAUSDT"])
        .prop_map(String::from)
}

// ── 1. Symbol de-duplication ─────────────────────────────────────────

proptest! {
    #[test]
    fn extract_symbols_are_unique_and_ordered(symbols in prop::collection::vec(arb_symbol(), 1..20)) {
        let request = ExtractRequest::new("usdt-futures", symbols.clone());
        let (_, unique) = request.validate().unwrap();

        let mut expected: Vec<&str> = Vec::new();
        for s in &symbols {
            if !expected.contains(&s.as_str()) {
                expected.push(s);
            }
        }
        prop_assert_eq!(unique, expected);
    }
}

// ── 2. Filter encoding ───────────────────────────────────────────────

proptest! {
    #[test]
    fn numeric_filters_become_decimal_text(start in 0i64..i64::MAX, limit in 1u32..1000) {
        let request = FetchRequest::new("usdt-futures")
            .with("startTime", start)
            .with("limit", limit);
        let params = request.to_params().unwrap();

        let start_text = start.to_string();
        let limit_text = limit.to_string();
        prop_assert_eq!(params.get("startTime"), Some(start_text.as_str()));
        prop_assert_eq!(params.get("limit"), Some(limit_text.as_str()));
    }
}

// ── 3. Coordinator accounting ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn coordinator_total_matches_scripted_orders(counts in prop::collection::vec(0usize..6, 1..5)) {
        let mut api = ScriptedApi::new();
        let mut symbols = Vec::new();
        for (i, count) in counts.iter().enumerate() {
            let symbol = format!("SYM{i}USDT");
            let orders: Vec<OrderRecord> =
                (0..*count).map(|t| OrderRecord::new(symbol.clone(), t as i64)).collect();
            api = api.with_symbol_pages(&symbol, [Ok(OrdersPage::new(orders, None))]);
            symbols.push(symbol);
        }
        let ctx = TaskContext::new(Arc::new(api), Arc::new(MemoryStore::new()), "bucket");
        let refs: Vec<&str> = symbols.iter().map(String::as_str).collect();

        let summary = Coordinator::new(ctx, 3).execute("usdt-futures", &refs).unwrap();

        prop_assert_eq!(summary.report.total_orders, counts.iter().sum::<usize>());
        prop_assert!(summary.symbols.iter().all(|s| s.status == TaskStatus::Complete));
        prop_assert_eq!(summary.tasks.len(), counts.len());
    }
}
