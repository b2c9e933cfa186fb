//! Query parameters for the order-history endpoint.

use std::collections::BTreeMap;

pub const PRODUCT_TYPE: &str = "productType";
pub const SYMBOL: &str = "symbol";
/// Pagination cursor: the exchange returns orders with ids below this value.
pub const CURSOR: &str = "idLessThan";

/// Optional filters the endpoint understands, in the order they are documented.
pub const OPTIONAL_KEYS: [&str; 8] = [
    "symbol",
    "startTime",
    "endTime",
    "orderId",
    "clientOid",
    "idLessThan",
    "orderSource",
    "limit",
];

/// Filter set for one fetch. `productType` is always present.
///
/// Values are kept as strings since they travel as a query string. Keys are
/// sorted so the encoded query (and therefore the request signature) is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, String>,
}

impl QueryParams {
    pub fn new(product_type: impl Into<String>) -> Self {
        let mut values = BTreeMap::new();
        values.insert(PRODUCT_TYPE.to_string(), product_type.into());
        Self { values }
    }

    /// Set an optional filter. Setting `productType` through here replaces it.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn product_type(&self) -> &str {
        self.values
            .get(PRODUCT_TYPE)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn symbol(&self) -> Option<&str> {
        self.get(SYMBOL)
    }

    pub fn cursor(&self) -> Option<&str> {
        self.get(CURSOR)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Copy of these params positioned at `cursor`. Nothing else changes.
    pub fn with_cursor(&self, cursor: &str) -> Self {
        let mut next = self.clone();
        next.values.insert(CURSOR.to_string(), cursor.to_string());
        next
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Display for QueryParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (k, v) in &self.values {
            if !first {
                f.write_str("&")?;
            }
            write!(f, "{k}={v}")?;
            first = false;
        }
        Ok(())
    }
}
