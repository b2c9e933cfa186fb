//! Order records as returned by the exchange's order-history endpoint.
//!
//! A record is kept as the exact field map the exchange sent, explicit nulls
//! included, and written back out unchanged. Only `symbol` and `cTime` are
//! interpreted, and only through accessors.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;

/// Bucket name for records that arrive without a usable `symbol` field.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

const SYMBOL: &str = "symbol";
const CREATION_TIME: &str = "cTime";

/// A single historical order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderRecord {
    fields: Map<String, Value>,
}

impl OrderRecord {
    /// Build a record the way the exchange formats it (`cTime` as a string).
    pub fn new(symbol: impl Into<String>, c_time: i64) -> Self {
        Self::default()
            .with_field(SYMBOL, symbol.into())
            .with_field(CREATION_TIME, c_time.to_string())
    }

    /// Attach a field, replacing any previous value under `key`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Raw `symbol` value as sent.
    pub fn symbol(&self) -> Option<&Value> {
        self.fields.get(SYMBOL)
    }

    /// Parsed creation time, if present and numeric. Numbers are accepted
    /// as well as the exchange's decimal strings.
    pub fn creation_time(&self) -> Option<i64> {
        match self.fields.get(CREATION_TIME)? {
            Value::String(s) => s.trim().parse().ok(),
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Symbol used for grouping. Scalars group under their text; missing,
    /// null, empty, and structured values land in [`UNKNOWN_SYMBOL`].
    pub fn bucket_symbol(&self) -> Cow<'_, str> {
        match self.symbol() {
            Some(Value::String(s)) if !s.is_empty() => Cow::Borrowed(s.as_str()),
            Some(Value::Number(n)) => Cow::Owned(n.to_string()),
            Some(Value::Bool(b)) => Cow::Owned(b.to_string()),
            _ => Cow::Borrowed(UNKNOWN_SYMBOL),
        }
    }

    /// Look up any field, `symbol` and `cTime` included.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}
