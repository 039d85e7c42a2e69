//! The uniform response envelope.
//!
//! # Design
//! Every completed exchange becomes an `ApiResult`, whatever its status.
//! `success` is derived from the status at construction and is never set
//! independently, so `success == (200..300).contains(&http_status)` holds for
//! every value this crate produces. Payloads stay opaque `serde_json::Value`s;
//! typed views of individual resources are left to callers.

use serde::Serialize;
use serde_json::Value;

use crate::http::HttpResponse;

/// Status reported by results that never reached the network.
pub const NO_HTTP_STATUS: u16 = 0;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    http_status: u16,
    success: bool,
    data: Value,
    raw_body: String,
}

impl ApiResult {
    /// Normalize a completed exchange.
    ///
    /// A body that is not JSON (an empty one included) is kept in `data` as
    /// a JSON string holding the raw text.
    pub fn from_response(response: HttpResponse) -> Self {
        let data = serde_json::from_str(&response.body)
            .unwrap_or_else(|_| Value::String(response.body.clone()));
        Self {
            http_status: response.status,
            success: is_success(response.status),
            data,
            raw_body: response.body,
        }
    }

    /// A call rejected locally before any request was sent, such as one
    /// missing a required path parameter.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self {
            http_status: NO_HTTP_STATUS,
            success: false,
            data: serde_json::json!({ "message": message.into() }),
            raw_body: String::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.http_status
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn raw_body(&self) -> &str {
        &self.raw_body
    }

    /// The upstream's conventional human-readable `message`, when present.
    pub fn message(&self) -> Option<&str> {
        self.data.get("message").and_then(Value::as_str)
    }

    pub fn into_data(self) -> Value {
        self.data
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
