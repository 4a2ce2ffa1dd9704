//! Handlers under `/api`.
//!
//! - `GET    /api`                        Service info
//! - `POST   /api/chat`                   Answer a batch of user turns
//! - `GET    /api/articles`               Article summaries, newest first
//! - `GET    /api/articles/{slug}`        One article
//! - `POST   /api/admin/login`            Exchange the admin password for a token
//! - `POST   /api/admin/articles`         Create an article (bearer token)
//! - `PUT    /api/admin/articles/{slug}`  Update an article (bearer token)
//! - `DELETE /api/admin/articles/{slug}`  Delete an article (bearer token)

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use lumen_core::article::{Article, ArticleSummary};
use lumen_core::wire::{ChatRequest, ChatResponse};

use crate::SharedState;
use crate::error::ApiError;

/// Maximum number of admin tokens held at once.
const MAX_ADMIN_TOKENS: usize = 100;

/// Reply for a chat body that is not a well-formed request. Missing or blank
/// turns deserialize fine and are reported by the chat service instead.
const INVALID_CHAT_BODY: &str = "Invalid request body";

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Serialize)]
pub(crate) struct ApiInfo {
    name: &'static str,
    version: &'static str,
    endpoints: Endpoints,
}

#[derive(Serialize)]
struct Endpoints {
    health: &'static str,
    api: &'static str,
    chat: &'static str,
    articles: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    password: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LoginResponse {
    success: bool,
    token: String,
    message: &'static str,
}

#[derive(Deserialize)]
pub(crate) struct ArticleInput {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
pub(crate) struct DeleteResponse {
    success: bool,
    message: &'static str,
}

/// Turn a body rejection into a 400, except oversized bodies which keep 413.
fn reject_body(rejection: JsonRejection, message: &str) -> ApiError {
    warn!(error = %rejection.body_text(), "Rejected request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
    }
    ApiError::bad_request(message)
}

impl ArticleInput {
    fn validated(payload: Result<Json<Self>, JsonRejection>) -> Result<Self, ApiError> {
        const REQUIRED: &str = "Title and content are required";
        let Json(input) = payload.map_err(|r| reject_body(r, REQUIRED))?;
        if input.title.trim().is_empty() || input.content.trim().is_empty() {
            return Err(ApiError::bad_request(REQUIRED));
        }
        Ok(input)
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub(crate) async fn api_info_handler() -> Json<ApiInfo> {
    Json(ApiInfo {
        name: "Lumen API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: Endpoints {
            health: "/health",
            api: "/api",
            chat: "/api/chat",
            articles: "/api/articles",
        },
    })
}

pub(crate) async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|r| reject_body(r, INVALID_CHAT_BODY))?;

    let response = state.chat.respond(&request).await?;
    Ok(Json(response))
}

pub(crate) async fn list_articles_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<ArticleSummary>>, ApiError> {
    Ok(Json(state.articles.list().await?))
}

pub(crate) async fn get_article_handler(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<Article>, ApiError> {
    Ok(Json(state.articles.get(&slug).await?))
}

pub(crate) async fn login_handler(
    State(state): State<SharedState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Some(expected) = state.admin_password.as_deref() else {
        return Err(ApiError::internal("Admin password not configured"));
    };

    let password = match payload {
        Ok(Json(LoginRequest {
            password: Some(password),
        })) if !password.is_empty() => password,
        _ => return Err(ApiError::bad_request("Password is required")),
    };

    if password != expected {
        warn!("Admin login rejected");
        return Err(ApiError::unauthorized("Invalid password"));
    }

    let token = uuid::Uuid::new_v4().to_string();
    let mut tokens = state.admin_tokens.write().await;
    if tokens.len() >= MAX_ADMIN_TOKENS {
        tokens.remove(0);
    }
    tokens.push(token.clone());
    drop(tokens);

    info!("Admin login accepted");
    Ok(Json(LoginResponse {
        success: true,
        token,
        message: "Authentication successful",
    }))
}

pub(crate) async fn create_article_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ArticleInput>, JsonRejection>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let input = ArticleInput::validated(payload)?;
    let article = state.articles.create(&input.title, &input.content).await?;
    info!(slug = %article.slug, "Article created");
    Ok((StatusCode::CREATED, Json(article)))
}

pub(crate) async fn update_article_handler(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
    payload: Result<Json<ArticleInput>, JsonRejection>,
) -> Result<Json<Article>, ApiError> {
    let input = ArticleInput::validated(payload)?;
    let article = state
        .articles
        .update(&slug, &input.title, &input.content)
        .await?;
    info!(old_slug = %slug, slug = %article.slug, "Article updated");
    Ok(Json(article))
}

pub(crate) async fn delete_article_handler(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    state.articles.delete(&slug).await?;
    info!(slug = %slug, "Article deleted");
    Ok(Json(DeleteResponse {
        success: true,
        message: "Article deleted successfully",
    }))
}
