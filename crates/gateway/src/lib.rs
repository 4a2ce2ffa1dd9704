//! HTTP API gateway for Lumen.
//!
//! Exposes the chat endpoint, health and service info, the public article
//! listing, and the password-guarded admin article routes.
//!
//! Built on Axum for high performance async HTTP.

pub mod api;
pub mod error;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{Method, header},
    middleware::{self, Next},
    response::Json,
    routing::{get, post, put},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use lumen_agent::{ChatService, RetrievalAugmenter};
use lumen_config::AppConfig;
use lumen_core::article::ArticleStore;
use lumen_memory::{ChromaStore, FileArticleStore, ProviderEmbedder};

pub use error::ApiError;

/// Shared application state for the gateway.
pub struct AppState {
    pub chat: Arc<ChatService>,
    pub articles: Arc<dyn ArticleStore>,
    pub admin_password: Option<String>,
    /// Tokens issued by `POST /api/admin/login`, oldest first.
    pub admin_tokens: RwLock<Vec<String>>,
}

impl AppState {
    pub fn new(
        chat: Arc<ChatService>,
        articles: Arc<dyn ArticleStore>,
        admin_password: Option<String>,
    ) -> Self {
        Self {
            chat,
            articles,
            admin_password,
            admin_tokens: RwLock::new(Vec::new()),
        }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the full router.
///
/// Layers applied:
/// - Bearer token authentication on the admin article routes
/// - CORS for browser clients
/// - Request body size limit
/// - HTTP trace logging
pub fn build_router(state: SharedState, max_body_bytes: usize) -> Router {
    let admin = Router::new()
        .route("/api/admin/articles", post(api::create_article_handler))
        .route(
            "/api/admin/articles/{slug}",
            put(api::update_article_handler).delete(api::delete_article_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api", get(api::api_info_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/articles", get(api::list_articles_handler))
        .route("/api/articles/{slug}", get(api::get_article_handler))
        .route("/api/admin/login", post(api::login_handler))
        .merge(admin)
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Builds the provider, the optional retrieval augmenter, and the chat
/// service once, then serves until the listener fails.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let provider = lumen_providers::build_from_config(&config);

    let retrieval = if config.retrieval_enabled() {
        let store = Arc::new(ChromaStore::new(config.retrieval.chroma_url.clone()));
        let embedder = Arc::new(ProviderEmbedder::new(
            provider.clone(),
            config.provider.embedding_model.clone(),
        ));
        info!(
            url = %config.retrieval.chroma_url,
            collection = %config.retrieval.collection,
            "Retrieval enabled"
        );
        Some(Arc::new(RetrievalAugmenter::new(
            store,
            embedder,
            config.retrieval.collection.clone(),
        )))
    } else {
        info!("Retrieval disabled");
        None
    };

    let chat = Arc::new(ChatService::from_config(&config, provider, retrieval));

    if config.gateway.admin_password.is_none() {
        warn!("No admin password configured; admin login is disabled");
    }

    let articles = Arc::new(FileArticleStore::open(config.gateway.articles_dir())?);

    let state = Arc::new(AppState::new(
        chat,
        articles,
        config.gateway.admin_password.clone(),
    ));
    let app = build_router(state, config.gateway.max_body_bytes);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Authentication middleware for the admin routes.
///
/// Requires `Authorization: Bearer <token>` with a token issued by login.
async fn auth_middleware(
    State(state): State<SharedState>,
    req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, ApiError> {
    let Some(token) = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
    else {
        return Err(ApiError::unauthorized("Authorization token required"));
    };

    let known = state.admin_tokens.read().await.iter().any(|t| *t == token);
    if !known {
        warn!("Unauthorized admin request: invalid bearer token");
        return Err(ApiError::unauthorized("Invalid authorization token"));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use lumen_agent::{CompletionSettings, PromptAssembler};
    use lumen_core::error::{ProviderError, RetrievalError};
    use lumen_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use lumen_core::retrieval::{Collection, Embedder, VectorStore};
    use lumen_memory::InMemoryArticleStore;
    use serde_json::{Value, json};
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct MockProvider {
        reply: Result<String, ProviderError>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl MockProvider {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: ProviderError) -> Self {
            Self {
                reply: Err(error),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Provider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            self.requests.lock().unwrap().push(request);
            self.reply.clone().map(|content| ProviderResponse {
                content,
                usage: None,
                model: "mock-model".into(),
            })
        }
    }

    struct DownVectorStore;

    #[async_trait]
    impl VectorStore for DownVectorStore {
        fn name(&self) -> &str {
            "down"
        }

        async fn open_collection(
            &self,
            _name: &str,
        ) -> Result<Arc<dyn Collection>, RetrievalError> {
            Err(RetrievalError::Unavailable("connection refused".into()))
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, RetrievalError> {
            Ok(vec![1.0])
        }
    }

    fn app_with(
        provider: Arc<MockProvider>,
        retrieval: Option<Arc<RetrievalAugmenter>>,
        admin_password: Option<&str>,
    ) -> Router {
        app_with_articles(
            provider,
            retrieval,
            Arc::new(InMemoryArticleStore::new()),
            admin_password,
        )
    }

    fn app_with_articles(
        provider: Arc<MockProvider>,
        retrieval: Option<Arc<RetrievalAugmenter>>,
        articles: Arc<dyn ArticleStore>,
        admin_password: Option<&str>,
    ) -> Router {
        let chat = Arc::new(ChatService::new(
            provider,
            retrieval,
            PromptAssembler::new(30_000),
            CompletionSettings::default(),
        ));
        let state = Arc::new(AppState::new(
            chat,
            articles,
            admin_password.map(String::from),
        ));
        build_router(state, 1024 * 1024)
    }

    fn app() -> Router {
        app_with(Arc::new(MockProvider::replying("Hello!")), None, Some("s3cret"))
    }

    fn json_request(method: &str, uri: &str, body: Value, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn login(app: &Router) -> String {
        let (status, body) = send(
            app,
            json_request("POST", "/api/admin/login", json!({"password": "s3cret"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn api_info_lists_endpoints() {
        let req = Request::builder().uri("/api").body(Body::empty()).unwrap();
        let (status, body) = send(&app(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["endpoints"]["chat"], "/api/chat");
    }

    #[tokio::test]
    async fn chat_answers_a_batch() {
        let provider = Arc::new(MockProvider::replying("Hello!"));
        let app = app_with(provider.clone(), None, None);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/chat",
                json!({
                    "messages": ["hi", "how are you?"],
                    "conversationHistory": [
                        {"id": 1, "text": "earlier", "sender": "user", "timestamp": "2024-01-01T00:00:00Z"},
                        {"id": 2, "text": "reply", "sender": "bot", "timestamp": "2024-01-01T00:00:01Z"}
                    ]
                }),
                None,
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hello!");
        assert_eq!(body["sources"], json!([]));

        let sent = provider.requests.lock().unwrap()[0].envelope.clone();
        let texts: Vec<&str> = sent.segments()[1..].iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["earlier", "reply", "hi", "how are you?"]);
    }

    #[tokio::test]
    async fn chat_accepts_legacy_single_message() {
        let (status, body) = send(
            &app(),
            json_request("POST", "/api/chat", json!({"message": "hi"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], "Hello!");
    }

    #[tokio::test]
    async fn chat_rejects_empty_and_malformed_bodies() {
        let app = app();
        for body in [json!({"messages": []}), json!({}), json!({"messages": ["  "]})] {
            let (status, value) = send(&app, json_request("POST", "/api/chat", body, None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(value["error"], "At least one message is required");
        }

        let req = Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, value) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(value["error"], "Invalid request body");
    }

    #[tokio::test]
    async fn chat_reports_bad_history_separately_from_missing_turns() {
        let app = app();
        for entry in [
            json!({"text": "no id", "sender": "user", "timestamp": "2024-01-01T00:00:00Z"}),
            json!({"id": 1, "text": "who?", "sender": "robot", "timestamp": "2024-01-01T00:00:00Z"}),
        ] {
            let body = json!({"messages": ["hello"], "conversationHistory": [entry]});
            let (status, value) = send(&app, json_request("POST", "/api/chat", body, None)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(value["error"], "Invalid request body");
        }
    }

    #[tokio::test]
    async fn chat_with_retrieval_down_still_answers() {
        let augmenter = Arc::new(RetrievalAugmenter::new(
            Arc::new(DownVectorStore),
            Arc::new(UnitEmbedder),
            "bipolar_studies",
        ));
        let app = app_with(Arc::new(MockProvider::replying("ok")), Some(augmenter), None);

        let (status, body) = send(
            &app,
            json_request("POST", "/api/chat", json!({"messages": ["hello"]}), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sources"], json!([]));
    }

    #[tokio::test]
    async fn chat_upstream_failure_is_sanitized() {
        let provider = Arc::new(MockProvider::failing(ProviderError::RateLimited {
            retry_after_secs: 30,
        }));
        let app = app_with(provider, None, None);

        let (status, body) = send(
            &app,
            json_request("POST", "/api/chat", json!({"messages": ["hello"]}), None),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            body["error"],
            "API rate limit exceeded. Please try again later."
        );
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let chat = Arc::new(ChatService::new(
            Arc::new(MockProvider::replying("ok")),
            None,
            PromptAssembler::new(30_000),
            CompletionSettings::default(),
        ));
        let state = Arc::new(AppState::new(chat, Arc::new(InMemoryArticleStore::new()), None));
        let app = build_router(state, 64);

        let big = "x".repeat(256);
        let (status, _) = send(
            &app,
            json_request("POST", "/api/chat", json!({"messages": [big]}), None),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let app = app();

        let (status, body) = send(
            &app,
            json_request("POST", "/api/admin/login", json!({"password": "wrong"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid password");

        let (status, _) = send(
            &app,
            json_request("POST", "/api/admin/login", json!({}), None),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let token = login(&app).await;
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn login_without_configured_password_fails() {
        let app = app_with(Arc::new(MockProvider::replying("ok")), None, None);
        let (status, body) = send(
            &app,
            json_request("POST", "/api/admin/login", json!({"password": "anything"}), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Admin password not configured");
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let app = app();
        let article = json!({"title": "Sleep", "content": "Regular sleep helps."});

        let (status, body) = send(
            &app,
            json_request("POST", "/api/admin/articles", article.clone(), None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Authorization token required");

        let (status, body) = send(
            &app,
            json_request("POST", "/api/admin/articles", article, Some("made-up")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid authorization token");
    }

    #[tokio::test]
    async fn article_lifecycle() {
        let app = app();
        let token = login(&app).await;

        let (status, created) = send(
            &app,
            json_request(
                "POST",
                "/api/admin/articles",
                json!({"title": "Sleep and Mood", "content": "Regular sleep helps."}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let slug = created["slug"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/admin/articles",
                json!({"title": "Sleep and Mood", "content": "Again."}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/admin/articles",
                json!({"title": "  ", "content": "No title."}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let req = Request::builder().uri("/api/articles").body(Body::empty()).unwrap();
        let (status, list) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert!(list[0].get("content").is_none());

        let req = Request::builder()
            .uri(format!("/api/articles/{slug}"))
            .body(Body::empty())
            .unwrap();
        let (status, article) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(article["content"], "Regular sleep helps.");

        let (status, updated) = send(
            &app,
            json_request(
                "PUT",
                &format!("/api/admin/articles/{slug}"),
                json!({"title": "Sleep and Mood", "content": "Updated."}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["content"], "Updated.");

        let (status, _) = send(
            &app,
            json_request(
                "PUT",
                "/api/admin/articles/missing",
                json!({"title": "T", "content": "C"}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = Request::builder()
            .method("DELETE")
            .uri(format!("/api/admin/articles/{slug}"))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let req = Request::builder()
            .uri(format!("/api/articles/{slug}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Article not found");
    }

    #[tokio::test]
    async fn oldest_admin_token_is_evicted() {
        let app = app();
        let first = login(&app).await;
        for _ in 0..100 {
            login(&app).await;
        }

        let req = json_request(
            "POST",
            "/api/admin/articles",
            json!({"title": "T", "content": "C"}),
            Some(&first),
        );
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn published_articles_survive_gateway_restart() {
        let dir = tempfile::tempdir().unwrap();
        let file_app = || {
            app_with_articles(
                Arc::new(MockProvider::replying("ok")),
                None,
                Arc::new(FileArticleStore::open(dir.path()).unwrap()),
                Some("s3cret"),
            )
        };

        let first = file_app();
        let token = login(&first).await;
        let (status, _) = send(
            &first,
            json_request(
                "POST",
                "/api/admin/articles",
                json!({"title": "Mood Charting", "content": "Track daily."}),
                Some(&token),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        drop(first);

        let second = file_app();
        let req = Request::builder()
            .uri("/api/articles/mood-charting")
            .body(Body::empty())
            .unwrap();
        let (status, article) = send(&second, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(article["content"], "Track daily.");
    }
}
