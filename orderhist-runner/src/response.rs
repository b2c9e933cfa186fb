//! `{statusCode, body}` envelope returned by every task.

use crate::request::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResponse {
    pub status_code: u16,
    pub body: Value,
}

impl TaskResponse {
    pub const OK: u16 = 200;
    pub const BAD_REQUEST: u16 = 400;
    pub const INTERNAL_ERROR: u16 = 500;

    pub fn ok<T: Serialize + ?Sized>(body: &T) -> Result<Self, serde_json::Error> {
        Ok(Self {
            status_code: Self::OK,
            body: serde_json::to_value(body)?,
        })
    }

    pub fn bad_request(err: &ValidationError) -> Self {
        Self {
            status_code: Self::BAD_REQUEST,
            body: json!({ "error": err.to_string() }),
        }
    }

    pub fn internal_error(message: impl std::fmt::Display) -> Self {
        Self {
            status_code: Self::INTERNAL_ERROR,
            body: json!({ "error": message.to_string() }),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}
