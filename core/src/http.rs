//! HTTP transport types shared by the request pipeline and executors.
//!
//! # Design
//! Requests and responses are plain data. `Request` builds an `HttpRequest`,
//! hands it to an `Executor`, and interprets the `HttpResponse` it gets back.
//! Keeping the exchange as data lets executors be swapped (ureq in
//! production, `StubExecutor` in tests) without touching the pipeline.
//!
//! All fields use owned types (`String`, `Vec`) so values can be recorded and
//! inspected after the call.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is fully qualified (host, path and query string). `headers` already
/// contains the persistent headers of the issuing `Request`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
///
/// Any status code is a valid response here; deciding whether 4xx/5xx is a
/// failure is the pipeline's job, not the executor's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// The executor could not complete the exchange.
///
/// `status` is the last status the executor observed, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
    pub status: Option<u16>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Headers sent with every request issued by one `Request`.
///
/// Keys are matched case-insensitively; setting an existing key replaces its
/// value in place so the original order is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSet {
    entries: Vec<(String, String)>,
}

impl Default for HeaderSet {
    fn default() -> Self {
        Self {
            entries: vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("Accept".to_string(), "application/json".to_string()),
            ],
        }
    }
}

impl HeaderSet {
    /// A header set without the JSON defaults.
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        find_header(&self.entries, key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.entries.iter().position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persistent headers followed by `extra`. An extra header overrides a
    /// persistent one with the same name.
    pub fn merged(&self, extra: &[(String, String)]) -> Vec<(String, String)> {
        let mut merged = self.clone();
        for (key, value) in extra {
            merged.set(key.clone(), value.clone());
        }
        merged.entries
    }
}

/// Case-insensitive lookup in a header list.
pub fn find_header<'a>(headers: &'a [(String, String)], key: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v.as_str())
}
