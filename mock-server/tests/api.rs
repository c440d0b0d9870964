use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_secret, Article};
use serde_json::Value;
use tower::{Service, ServiceExt};

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

// --- list ---

#[tokio::test]
async fn list_articles_empty() {
    let resp = app().oneshot(empty_request("GET", "/articles")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-total-count"], "0");
    let body: Value = body_json(resp).await;
    assert_eq!(body["data"], serde_json::json!([]));
    assert_eq!(body["meta"]["pagination"]["total"], 0);
    assert_eq!(body["meta"]["pagination"]["total_pages"], 0);
    assert_eq!(body["meta"]["pagination"]["current_page"], 1);
}

#[tokio::test]
async fn list_rejects_zero_per_page() {
    let resp = app()
        .oneshot(empty_request("GET", "/articles?per_page=0"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "page and per_page must be at least 1");
}

#[tokio::test]
async fn list_rejects_unparseable_page_with_message() {
    let resp = app()
        .oneshot(empty_request("GET", "/articles?page=abc"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("query string"));
}

// --- create ---

#[tokio::test]
async fn create_article_returns_201() {
    let resp = app()
        .oneshot(json_request("POST", "/articles", r#"{"title":"Hello"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = body_json(resp).await;
    let article: Article = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(article.id, 1);
    assert_eq!(article.title, "Hello");
    assert!(!article.published);
}

#[tokio::test]
async fn create_article_blank_title_returns_422_with_message() {
    let resp = app()
        .oneshot(json_request("POST", "/articles", r#"{"title":"  "}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "The title field is required.");
}

#[tokio::test]
async fn create_article_malformed_json_has_message() {
    let resp = app()
        .oneshot(json_request("POST", "/articles", r#"{"not_title":1}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = body_json(resp).await;
    assert!(body["message"].as_str().unwrap().contains("title"));
}

// --- get / update / delete ---

#[tokio::test]
async fn get_article_not_found() {
    let resp = app().oneshot(empty_request("GET", "/articles/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Article 42 not found");
}

#[tokio::test]
async fn update_article_not_found() {
    let resp = app()
        .oneshot(json_request("PATCH", "/articles/42", r#"{"title":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_article_not_found() {
    let resp = app().oneshot(empty_request("DELETE", "/articles/42")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- secret ---

#[tokio::test]
async fn secret_is_enforced() {
    let resp = app_with_secret("s3cret")
        .oneshot(empty_request("GET", "/articles"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["message"], "Invalid client secret");

    let resp = app_with_secret("s3cret")
        .oneshot(
            Request::builder()
                .uri("/articles")
                .header("X-Client-Secret", "s3cret")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// --- full lifecycle with pagination ---

#[tokio::test]
async fn crud_lifecycle_with_pagination() {
    let mut app = app().into_service();

    for title in ["one", "two", "three"] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", "/articles", &format!(r#"{{"title":"{title}"}}"#)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    // second page of two
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/articles?page=2&per_page=2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let articles: Vec<Article> = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].title, "three");
    assert_eq!(body["meta"]["pagination"]["total"], 3);
    assert_eq!(body["meta"]["pagination"]["total_pages"], 2);
    assert_eq!(body["meta"]["pagination"]["current_page"], 2);
    assert_eq!(body["meta"]["pagination"]["count"], 1);

    // partial update through PUT keeps other fields
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            "/articles/2",
            r#"{"published":true,"cover":{"original":"http://img/2.jpg"}}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = body_json(resp).await;
    let updated: Article = serde_json::from_value(body["data"].clone()).unwrap();
    assert_eq!(updated.title, "two");
    assert!(updated.published);
    assert_eq!(updated.cover.unwrap().original, "http://img/2.jpg");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", "/articles/2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete is a 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/articles/2"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
