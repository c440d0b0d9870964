//! The request pipeline: URL building, execution and status interpretation.
//!
//! # Design
//! `Request` owns the base host, the persistent header set and a shared
//! executor. Each call is one blocking round trip:
//!
//! 1. merge persistent and per-call headers, hand the exchange to the executor
//! 2. a transport failure becomes `ApiError::Transport` (status defaults to 500)
//! 3. the raw body is decoded into a `Response`
//! 4. a status of 400 or above becomes `ApiError::Http` with the body's
//!    `message`
//! 5. otherwise the response headers replace the "last headers" snapshot
//!
//! The snapshot sits behind a mutex so `Request` can be shared, but callers
//! sharing one instance across threads see whichever call finished last.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::error::ApiError;
use crate::executor::Executor;
use crate::http::{HeaderSet, HttpMethod, HttpRequest};
use crate::response::Response;

pub struct Request {
    host: String,
    executor: Arc<dyn Executor>,
    headers: HeaderSet,
    last_headers: Mutex<Option<Vec<(String, String)>>>,
}

impl Request {
    pub fn new(host: &str, executor: Arc<dyn Executor>) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            executor,
            headers: HeaderSet::default(),
            last_headers: Mutex::new(None),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Add a header sent with every request from now on.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.set(key, value);
    }

    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Headers of the most recent successful response.
    pub fn last_headers(&self) -> Option<Vec<(String, String)>> {
        self.last_headers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn get<P: Serialize + ?Sized>(&self, path: &str, query: &P) -> Result<Response, ApiError> {
        let url = self.build_url(path, query)?;
        self.execute(HttpMethod::Get, &url, None, &[])
    }

    pub fn post<P: Serialize + ?Sized>(&self, path: &str, body: &P) -> Result<Response, ApiError> {
        self.send(HttpMethod::Post, path, body)
    }

    pub fn put<P: Serialize + ?Sized>(&self, path: &str, body: &P) -> Result<Response, ApiError> {
        self.send(HttpMethod::Put, path, body)
    }

    pub fn patch<P: Serialize + ?Sized>(&self, path: &str, body: &P) -> Result<Response, ApiError> {
        self.send(HttpMethod::Patch, path, body)
    }

    pub fn delete<P: Serialize + ?Sized>(&self, path: &str, body: &P) -> Result<Response, ApiError> {
        self.send(HttpMethod::Delete, path, body)
    }

    /// `host + path`, followed by the encoded query when there is one.
    pub fn build_url<P: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &P,
    ) -> Result<String, ApiError> {
        let query = encode_query(&to_value(query)?)?;
        let url = format!("{}{path}", self.host);
        if query.is_empty() {
            return Ok(url);
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        Ok(format!("{url}{separator}{query}"))
    }

    /// Execute one exchange against a fully qualified `url`.
    pub fn execute(
        &self,
        method: HttpMethod,
        url: &str,
        body: Option<&Value>,
        headers: &[(String, String)],
    ) -> Result<Response, ApiError> {
        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: self.headers.merged(headers),
            body: encode_body(method, body)?,
        };

        let started = Instant::now();
        let raw = self.executor.execute(&request).map_err(|e| {
            warn!(%method, url, error = %e.message, "transport failure");
            ApiError::Transport {
                status: e.status.unwrap_or(500),
                message: e.message,
            }
        })?;
        debug!(
            %method,
            url,
            status = raw.status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );

        let response = Response::new(raw.body, raw.status);
        check_status(&response)?;

        *self.last_headers.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw.headers);
        Ok(response)
    }

    fn send<P: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: &P,
    ) -> Result<Response, ApiError> {
        let body = to_value(body)?;
        let url = format!("{}{path}", self.host);
        self.execute(method, &url, Some(&body), &[])
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("host", &self.host)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Map failure status codes to `ApiError::Http`.
fn check_status(response: &Response) -> Result<(), ApiError> {
    if response.status() < 400 {
        return Ok(());
    }
    warn!(status = response.status(), "API returned an error status");
    Err(ApiError::Http {
        status: response.status(),
        message: response.message().unwrap_or_default(),
    })
}

fn to_value<P: Serialize + ?Sized>(params: &P) -> Result<Value, ApiError> {
    serde_json::to_value(params).map_err(|e| ApiError::SerializationError(e.to_string()))
}

/// GET carries no body. DELETE only carries one when there is something to
/// send; the other verbs always send a JSON document.
fn encode_body(method: HttpMethod, body: Option<&Value>) -> Result<Option<String>, ApiError> {
    let body = match (method, body) {
        (HttpMethod::Get, _) => return Ok(None),
        (HttpMethod::Delete, None) => return Ok(None),
        (HttpMethod::Delete, Some(value)) if is_blank(value) => return Ok(None),
        (_, Some(value)) if !value.is_null() => value.clone(),
        _ => Value::Object(serde_json::Map::new()),
    };
    serde_json::to_string(&body)
        .map(Some)
        .map_err(|e| ApiError::SerializationError(e.to_string()))
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Encode query parameters in insertion order. Nested values use bracket
/// keys (`tags[0]=a`, `filter[state]=open`), booleans become `1`/`0` and
/// nulls are skipped.
pub fn encode_query(params: &Value) -> Result<String, ApiError> {
    let map = match params {
        Value::Null => return Ok(String::new()),
        Value::Object(map) => map,
        other => {
            return Err(ApiError::SerializationError(format!(
                "query parameters must be a map, got {other}"
            )))
        }
    };
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in map {
        append_pair(&mut serializer, key, value);
    }
    Ok(serializer.finish())
}

fn append_pair(serializer: &mut form_urlencoded::Serializer<'_, String>, key: &str, value: &Value) {
    match value {
        Value::Null => {}
        Value::Bool(flag) => {
            serializer.append_pair(key, if *flag { "1" } else { "0" });
        }
        Value::Number(number) => {
            serializer.append_pair(key, &number.to_string());
        }
        Value::String(s) => {
            serializer.append_pair(key, s);
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                append_pair(serializer, &format!("{key}[{index}]"), item);
            }
        }
        Value::Object(map) => {
            for (sub, item) in map {
                append_pair(serializer, &format!("{key}[{sub}]"), item);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{find_header, TransportError};
    use crate::testing::StubExecutor;
    use crate::upload::Upload;
    use serde_json::json;

    const HOST: &str = "http://api.test";

    fn request_with(stub: &Arc<StubExecutor>) -> Request {
        Request::new(HOST, stub.clone())
    }

    #[test]
    fn get_appends_query_and_sends_no_body() {
        let stub = Arc::new(StubExecutor::new().respond(200, r#"{"data":[]}"#));
        let request = request_with(&stub);

        request.get("/items", &json!({"page": 2})).unwrap();

        let sent = stub.last_request().unwrap();
        assert_eq!(sent.method, HttpMethod::Get);
        assert_eq!(sent.url, "http://api.test/items?page=2");
        assert!(sent.body.is_none());
    }

    #[test]
    fn get_without_params_has_no_question_mark() {
        let request = Request::new(HOST, Arc::new(StubExecutor::new()));
        assert_eq!(request.build_url("/items", &json!({})).unwrap(), "http://api.test/items");
        assert_eq!(request.build_url("/items", &Value::Null).unwrap(), "http://api.test/items");
    }

    #[test]
    fn query_keeps_insertion_order_and_percent_encodes() {
        let request = Request::new(HOST, Arc::new(StubExecutor::new()));
        let url = request
            .build_url("/search", &json!({"q": "rust & serde", "page": 1, "draft": false, "skip": null}))
            .unwrap();
        assert_eq!(url, "http://api.test/search?q=rust+%26+serde&page=1&draft=0");
    }

    #[test]
    fn nested_query_values_use_brackets() {
        let query = encode_query(&json!({"tags": ["a", "b"], "filter": {"state": "open"}})).unwrap();
        assert_eq!(query, "tags%5B0%5D=a&tags%5B1%5D=b&filter%5Bstate%5D=open");
    }

    #[test]
    fn query_must_be_a_map() {
        let err = encode_query(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::SerializationError(_)));
    }

    #[test]
    fn path_with_query_is_extended() {
        let request = Request::new(HOST, Arc::new(StubExecutor::new()));
        let url = request.build_url("/items?sort=id", &json!({"page": 3})).unwrap();
        assert_eq!(url, "http://api.test/items?sort=id&page=3");
    }

    #[test]
    fn write_verbs_send_json_bodies() {
        let stub = Arc::new(
            StubExecutor::new()
                .respond(201, "{}")
                .respond(200, "{}")
                .respond(200, "{}"),
        );
        let request = request_with(&stub);

        request.post("/items", &json!({"title": "A"})).unwrap();
        request.put("/items/1", &json!({"title": "B"})).unwrap();
        request.patch("/items/1", &json!({})).unwrap();

        let sent = stub.requests();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "http://api.test/items");
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"title":"A"}"#));
        assert_eq!(sent[1].method, HttpMethod::Put);
        assert_eq!(sent[1].body.as_deref(), Some(r#"{"title":"B"}"#));
        assert_eq!(sent[2].method, HttpMethod::Patch);
        assert_eq!(sent[2].body.as_deref(), Some("{}"));
    }

    #[test]
    fn uploads_are_sent_as_base64() {
        #[derive(Serialize)]
        struct NewArticle {
            title: &'static str,
            cover: Upload,
        }

        let stub = Arc::new(StubExecutor::new().respond(201, "{}").respond(200, "{}"));
        let request = request_with(&stub);

        let article = NewArticle {
            title: "A",
            cover: Upload::new("cover.png", b"hello".to_vec()),
        };
        request.post("/articles", &article).unwrap();
        request
            .put("/articles/1", &json!({"cover": Upload::new("c.txt", b"hi".to_vec())}))
            .unwrap();

        let sent = stub.requests();
        assert_eq!(
            sent[0].body.as_deref(),
            Some(r#"{"title":"A","cover":{"name":"cover.png","base64":"aGVsbG8="}}"#)
        );
        assert_eq!(
            sent[1].body.as_deref(),
            Some(r#"{"cover":{"name":"c.txt","base64":"aGk="}}"#)
        );
    }

    #[test]
    fn delete_sends_body_only_when_non_empty() {
        let stub = Arc::new(StubExecutor::new().respond(204, "").respond(200, "{}"));
        let request = request_with(&stub);

        request.delete("/items/1", &json!({})).unwrap();
        request.delete("/items", &json!({"ids": [1, 2]})).unwrap();

        let sent = stub.requests();
        assert!(sent[0].body.is_none());
        assert_eq!(sent[1].body.as_deref(), Some(r#"{"ids":[1,2]}"#));
    }

    #[test]
    fn persistent_and_extra_headers_are_merged() {
        let stub = Arc::new(StubExecutor::new().respond(200, "{}"));
        let mut request = request_with(&stub);
        request.set_header("X-Client-Secret", "s3cret");

        request
            .execute(
                HttpMethod::Get,
                "http://api.test/me",
                None,
                &[("X-Trace".to_string(), "t-1".to_string())],
            )
            .unwrap();

        let sent = stub.last_request().unwrap();
        assert_eq!(find_header(&sent.headers, "content-type"), Some("application/json"));
        assert_eq!(find_header(&sent.headers, "accept"), Some("application/json"));
        assert_eq!(find_header(&sent.headers, "x-client-secret"), Some("s3cret"));
        assert_eq!(find_header(&sent.headers, "x-trace"), Some("t-1"));
    }

    #[test]
    fn error_status_raises_http_error_with_message() {
        for status in [400u16, 401, 404, 422, 500, 503] {
            let stub = Arc::new(StubExecutor::new().respond(status, r#"{"message":"nope"}"#));
            let err = request_with(&stub).get("/items", &json!({})).unwrap_err();
            match err {
                ApiError::Http { status: got, message } => {
                    assert_eq!(got, status);
                    assert_eq!(message, "nope");
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn error_status_without_message_has_empty_text() {
        let stub = Arc::new(StubExecutor::new().respond(502, "<html>bad gateway</html>"));
        let err = request_with(&stub).get("/items", &json!({})).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 502, ref message } if message.is_empty()));
    }

    #[test]
    fn transport_failure_carries_executor_status() {
        let stub = Arc::new(
            StubExecutor::new()
                .fail(TransportError::new("operation timed out").with_status(504))
                .fail(TransportError::new("could not resolve host")),
        );
        let request = request_with(&stub);

        let err = request.get("/items", &json!({})).unwrap_err();
        assert!(
            matches!(err, ApiError::Transport { status: 504, ref message } if message == "operation timed out")
        );

        let err = request.get("/items", &json!({})).unwrap_err();
        assert!(
            matches!(err, ApiError::Transport { status: 500, ref message } if message == "could not resolve host")
        );
    }

    #[test]
    fn last_headers_track_the_latest_success() {
        let stub = Arc::new(
            StubExecutor::new()
                .respond_with_headers(200, vec![("X-Page".to_string(), "1".to_string())], "{}")
                .respond_with_headers(404, vec![("X-Page".to_string(), "2".to_string())], "{}")
                .respond_with_headers(200, vec![("X-Page".to_string(), "3".to_string())], "{}"),
        );
        let request = request_with(&stub);
        assert!(request.last_headers().is_none());

        request.get("/a", &json!({})).unwrap();
        assert_eq!(
            request.last_headers().unwrap(),
            vec![("X-Page".to_string(), "1".to_string())]
        );

        request.get("/b", &json!({})).unwrap_err();
        assert_eq!(
            request.last_headers().unwrap(),
            vec![("X-Page".to_string(), "1".to_string())]
        );

        request.get("/c", &json!({})).unwrap();
        assert_eq!(
            request.last_headers().unwrap(),
            vec![("X-Page".to_string(), "3".to_string())]
        );
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let request = Request::new("http://api.test/", Arc::new(StubExecutor::new()));
        assert_eq!(request.host(), "http://api.test");
    }

    #[test]
    fn success_returns_decoded_response() {
        let stub = Arc::new(StubExecutor::new().respond(200, r#"{"data":{"id":1}}"#));
        let response = request_with(&stub).get("/items/1", &json!({})).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.get("data"), Some(&json!({"id": 1})));
    }
}
