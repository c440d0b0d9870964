//! Decoded API responses.
//!
//! # Design
//! A body that is not valid JSON is kept as the raw string instead of raising
//! an error, so malformed bodies surface later as absent keys. Key access is
//! limited to top-level keys and follows "is set" semantics: a key holding
//! `null` is treated as absent, and `set` never introduces a new key.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// The body of a response after decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(String),
}

impl ResponseBody {
    /// Decode a textual body as JSON, keeping the raw text on failure.
    pub fn decode(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        match serde_json::from_str(&raw) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Raw(raw),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    body: ResponseBody,
    status: u16,
}

impl Response {
    pub fn new(raw: impl Into<String>, status: u16) -> Self {
        Self {
            body: ResponseBody::decode(raw),
            status,
        }
    }

    /// Build a response around an already decoded body.
    pub fn from_value(value: Value, status: u16) -> Self {
        Self {
            body: ResponseBody::Json(value),
            status,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &ResponseBody {
        &self.body
    }

    pub fn into_body(self) -> ResponseBody {
        self.body
    }

    /// Top-level value under `key`, or `None` when the key is missing, holds
    /// `null`, or the body is not a JSON object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match &self.body {
            ResponseBody::Json(Value::Object(map)) => map.get(key).filter(|v| !v.is_null()),
            _ => None,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replace the value of an existing key. Returns whether the body changed;
    /// unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: Value) -> bool {
        if !self.has(key) {
            return false;
        }
        if let ResponseBody::Json(Value::Object(map)) = &mut self.body {
            if let Some(slot) = map.get_mut(key) {
                *slot = value;
                return true;
            }
        }
        false
    }

    /// The `message` field of the body, rendered as text.
    pub fn message(&self) -> Option<String> {
        self.get("message").map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Deserialize the value under `key` into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self, key: &str) -> Result<T, ApiError> {
        let value = self
            .get(key)
            .ok_or_else(|| ApiError::DeserializationError(format!("missing key `{key}`")))?;
        T::deserialize(value).map_err(|e| ApiError::DeserializationError(e.to_string()))
    }
}
