// src/service/api.rs

//! Request and response shapes of the queue endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SluiceError;

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u16,
    pub result: String,
    pub message: Value,
}

impl ApiResponse {
    pub fn ok(message: Value) -> Self {
        Self {
            code: 200,
            result: "OK".to_string(),
            message,
        }
    }

    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            code: 202,
            result: "OK".to_string(),
            message: Value::String(message.into()),
        }
    }

    pub fn error(err: &SluiceError) -> Self {
        Self {
            code: err.status_code(),
            result: "Error".to_string(),
            message: Value::String(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Body of a fill trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRequest {
    pub pipeline: String,

    #[serde(default, rename = "maxItems", alias = "maxitems")]
    pub max_items: Option<usize>,
}
