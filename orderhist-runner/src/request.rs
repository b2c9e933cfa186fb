//! Task payloads and their validation.
//!
//! Payloads use the exchange's camelCase field names. Filter values may be
//! given as strings or numbers; both travel as query-string text.

use orderhist_core::domain::params::OPTIONAL_KEYS;
use orderhist_core::{QueryParams, TaskDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Missing {0} in payload")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

fn require_product_type(product_type: &Option<String>) -> Result<&str, ValidationError> {
    product_type
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ValidationError::MissingField("productType"))
}

/// One fetch: `productType` plus any of the endpoint's optional filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Everything else in the payload. Keys the endpoint does not know are ignored.
    #[serde(flatten)]
    pub filters: Map<String, Value>,
}

impl FetchRequest {
    pub fn new(product_type: impl Into<String>) -> Self {
        Self {
            product_type: Some(product_type.into()),
            filters: Map::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.filters.insert(key.to_string(), value.into());
        self
    }

    /// Validate and convert to exchange query parameters.
    pub fn to_params(&self) -> Result<QueryParams, ValidationError> {
        let mut params = QueryParams::new(require_product_type(&self.product_type)?);
        for key in OPTIONAL_KEYS {
            let text = match self.filters.get(key) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) if s.is_empty() => continue,
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(other) => {
                    return Err(ValidationError::InvalidField {
                        field: key.to_string(),
                        reason: format!("expected a string or number, got {other}"),
                    })
                }
            };
            params = params.with(key, text);
        }
        Ok(params)
    }
}

/// Fan-in: merge the artifacts named by `tasks` into one report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskDescriptor>,
}

impl AggregateRequest {
    pub fn product_type(&self) -> Result<&str, ValidationError> {
        require_product_type(&self.product_type)
    }
}

/// Full extraction: fetch every symbol, then aggregate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    #[serde(default)]
    pub symbols: Vec<String>,
}

impl ExtractRequest {
    pub fn new<I, S>(product_type: impl Into<String>, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            product_type: Some(product_type.into()),
            symbols: symbols.into_iter().map(Into::into).collect(),
        }
    }

    /// Product type and the de-duplicated, non-empty symbol list.
    pub fn validate(&self) -> Result<(&str, Vec<&str>), ValidationError> {
        let product_type = require_product_type(&self.product_type)?;
        let mut symbols: Vec<&str> = Vec::with_capacity(self.symbols.len());
        for symbol in self.symbols.iter().map(|s| s.trim()) {
            if symbol.is_empty() {
                return Err(ValidationError::InvalidField {
                    field: "symbols".into(),
                    reason: "symbol names must not be empty".into(),
                });
            }
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        if symbols.is_empty() {
            return Err(ValidationError::MissingField("symbols"));
        }
        Ok((product_type, symbols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_product_type_is_rejected() {
        let request: FetchRequest = serde_json::from_value(json!({"symbol": "BTCUSDT"})).unwrap();
        assert_eq!(
            request.to_params().unwrap_err(),
            ValidationError::MissingField("productType")
        );

        let blank = FetchRequest::new("  ");
        assert!(blank.to_params().is_err());
    }

    #[test]
    fn numbers_and_strings_become_query_text() {
        let request: FetchRequest = serde_json::from_value(json!({
            "productType": "usdt-futures",
            "symbol": "BTCUSDT",
            "startTime": 1700000000000u64,
            "limit": "100",
            "endTime": null,
            "somethingElse": "ignored"
        }))
        .unwrap();

        let params = request.to_params().unwrap();
        assert_eq!(params.product_type(), "usdt-futures");
        assert_eq!(params.symbol(), Some("BTCUSDT"));
        assert_eq!(params.get("startTime"), Some("1700000000000"));
        assert_eq!(params.get("limit"), Some("100"));
        assert_eq!(params.get("endTime"), None);
        assert_eq!(params.get("somethingElse"), None);
    }

    #[test]
    fn structured_filter_value_is_rejected() {
        let request = FetchRequest::new("usdt-futures").with("symbol", json!(["BTCUSDT"]));
        assert!(matches!(
            request.to_params(),
            Err(ValidationError::InvalidField { field, .. }) if field == "symbol"
        ));
    }

    #[test]
    fn extract_dedupes_symbols_in_order() {
        let request = ExtractRequest::new("usdt-futures", ["ETHUSDT", "BTCUSDT", "ETHUSDT"]);
        let (product_type, symbols) = request.validate().unwrap();
        assert_eq!(product_type, "usdt-futures");
        assert_eq!(symbols, vec!["ETHUSDT", "BTCUSDT"]);
    }

    #[test]
    fn extract_requires_symbols() {
        let request = ExtractRequest::new("usdt-futures", Vec::<String>::new());
        assert_eq!(request.validate().unwrap_err(), ValidationError::MissingField("symbols"));
    }

    #[test]
    fn aggregate_request_accepts_descriptor_without_hint() {
        let request: AggregateRequest = serde_json::from_value(json!({
            "productType": "usdt-futures",
            "tasks": [{"bucket": "b", "s3Key": "k.json"}]
        }))
        .unwrap();
        assert_eq!(request.product_type().unwrap(), "usdt-futures");
        assert_eq!(request.tasks[0].orders_count, 0);
    }
}
