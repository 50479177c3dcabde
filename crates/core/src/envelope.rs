//! Typed response envelope shared by every backend endpoint.
//!
//! The backend wraps payloads as `{ success, data, message, error }`, but some
//! endpoints answer with a bare payload. Both shapes are normalized here so call
//! sites never reach into nested optional paths themselves.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::ApiError;

const ENVELOPE_KEYS: [&str; 4] = ["success", "data", "message", "error"];

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    /// Sibling fields such as `total` next to a top-level `data` array.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ResponseEnvelope {
    /// Interpret a decoded JSON body, treating non-envelope bodies as raw data.
    pub fn from_value(value: Value) -> Result<Self, ApiError> {
        let is_envelope = value
            .as_object()
            .map(|object| ENVELOPE_KEYS.iter().any(|key| object.contains_key(*key)))
            .unwrap_or(false);

        if is_envelope {
            Ok(serde_json::from_value(value)?)
        } else {
            Ok(Self {
                data: Some(value),
                ..Self::default()
            })
        }
    }

    /// Best human-readable message carried by the envelope, if any.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Validate a 2xx envelope and return its payload (`Value::Null` when absent).
    pub fn into_payload(self) -> Result<Value, ApiError> {
        if self.success == Some(false) {
            let message = self
                .message()
                .unwrap_or("Request was rejected by the server")
                .to_string();
            return Err(ApiError::Validation(message));
        }

        if let Some(error) = self.error.as_deref().map(str::trim) {
            if !error.is_empty() {
                return Err(ApiError::Server {
                    status: 200,
                    message: error.to_string(),
                });
            }
        }

        if self.extra.is_empty() {
            return Ok(self.data.unwrap_or(Value::Null));
        }

        let mut payload = self.extra;
        if let Some(data) = self.data {
            payload.insert("data".to_string(), data);
        }
        Ok(Value::Object(payload))
    }
}

/// Extract a failure message from an arbitrary error body.
pub fn failure_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(_) => ResponseEnvelope::from_value(body.clone())
            .ok()
            .and_then(|envelope| envelope.message().map(str::to_string)),
        _ => None,
    }
}
