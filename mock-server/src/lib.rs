use std::{collections::BTreeMap, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, Request, State,
    },
    http::{HeaderMap, HeaderValue, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

pub const SECRET_HEADER: &str = "x-client-secret";
pub const DEFAULT_PER_PAGE: u64 = 15;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Cover {
    pub original: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Article {
    pub id: u64,
    pub title: String,
    pub published: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Cover>,
}

#[derive(Deserialize)]
pub struct CreateArticle {
    pub title: String,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub cover: Option<Cover>,
}

#[derive(Deserialize)]
pub struct UpdateArticle {
    pub title: Option<String>,
    pub published: Option<bool>,
    pub cover: Option<Cover>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "first_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

fn first_page() -> u64 {
    1
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

#[derive(Debug, Default)]
pub struct Store {
    next_id: u64,
    articles: BTreeMap<u64, Article>,
}

#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    secret: Option<Arc<str>>,
}

/// An error answered as `{"message": ...}` with the given status.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub message: String,
}

impl ApiFailure {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn not_found(id: u64) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("Article {id} not found"))
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

impl From<JsonRejection> for ApiFailure {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiFailure {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(rejection.status(), rejection.body_text())
    }
}

pub fn app() -> Router {
    router(AppState::default())
}

/// Like `app`, but every route requires the `X-Client-Secret` header.
pub fn app_with_secret(secret: &str) -> Router {
    router(AppState {
        secret: Some(Arc::from(secret)),
        ..AppState::default()
    })
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/{id}",
            get(get_article)
                .put(update_article)
                .patch(update_article)
                .delete(delete_article),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_secret))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    info!(addr = ?listener.local_addr().ok(), "mock server listening");
    axum::serve(listener, app).await
}

async fn require_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiFailure> {
    if let Some(expected) = &state.secret {
        let given = request
            .headers()
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok());
        if given != Some(&**expected) {
            debug!("rejected request with a missing or wrong client secret");
            return Err(ApiFailure::new(StatusCode::UNAUTHORIZED, "Invalid client secret"));
        }
    }
    Ok(next.run(request).await)
}

async fn list_articles(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<(HeaderMap, Json<Value>), ApiFailure> {
    let Query(query) = query?;
    if query.page == 0 || query.per_page == 0 {
        return Err(ApiFailure::new(
            StatusCode::BAD_REQUEST,
            "page and per_page must be at least 1",
        ));
    }

    let store = state.store.read().await;
    let total = store.articles.len() as u64;
    let total_pages = total.div_ceil(query.per_page);
    let offset = (query.page - 1).saturating_mul(query.per_page);
    let page: Vec<&Article> = store
        .articles
        .values()
        .skip(usize::try_from(offset).unwrap_or(usize::MAX))
        .take(usize::try_from(query.per_page).unwrap_or(usize::MAX))
        .collect();

    let mut headers = HeaderMap::new();
    headers.insert("x-total-count", HeaderValue::from(total));

    let body = json!({
        "data": page,
        "meta": {
            "pagination": {
                "total": total,
                "count": page.len(),
                "per_page": query.per_page,
                "current_page": query.page,
                "total_pages": total_pages,
            }
        }
    });
    Ok((headers, Json(body)))
}

async fn create_article(
    State(state): State<AppState>,
    input: Result<Json<CreateArticle>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiFailure> {
    let Json(input) = input?;
    if input.title.trim().is_empty() {
        return Err(ApiFailure::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "The title field is required.",
        ));
    }

    let mut store = state.store.write().await;
    store.next_id += 1;
    let article = Article {
        id: store.next_id,
        title: input.title,
        published: input.published,
        cover: input.cover,
    };
    store.articles.insert(article.id, article.clone());
    info!(id = article.id, "created article");
    Ok((StatusCode::CREATED, Json(json!({ "data": article }))))
}

async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Value>, ApiFailure> {
    let store = state.store.read().await;
    let article = store.articles.get(&id).ok_or_else(|| ApiFailure::not_found(id))?;
    Ok(Json(json!({ "data": article })))
}

async fn update_article(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    input: Result<Json<UpdateArticle>, JsonRejection>,
) -> Result<Json<Value>, ApiFailure> {
    let Json(input) = input?;
    let mut store = state.store.write().await;
    let article = store.articles.get_mut(&id).ok_or_else(|| ApiFailure::not_found(id))?;
    if let Some(title) = input.title {
        article.title = title;
    }
    if let Some(published) = input.published {
        article.published = published;
    }
    if let Some(cover) = input.cover {
        article.cover = Some(cover);
    }
    Ok(Json(json!({ "data": article })))
}

async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiFailure> {
    let mut store = state.store.write().await;
    store
        .articles
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| ApiFailure::not_found(id))
}
