//! Object key layout.
//!
//! `orders-history/{productType}/{symbol}.json` for per-symbol artifacts and
//! `orders-history/{productType}/{productType}_orders.json` for the report.

pub const KEY_PREFIX: &str = "orders-history";

pub fn symbol_artifact_key(product_type: &str, symbol: &str) -> String {
    format!("{KEY_PREFIX}/{product_type}/{symbol}.json")
}

pub fn report_key(product_type: &str) -> String {
    format!("{KEY_PREFIX}/{product_type}/{product_type}_orders.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout() {
        assert_eq!(
            symbol_artifact_key("usdt-futures", "BTCUSDT"),
            "orders-history/usdt-futures/BTCUSDT.json"
        );
        assert_eq!(
            report_key("usdt-futures"),
            "orders-history/usdt-futures/usdt-futures_orders.json"
        );
    }
}
