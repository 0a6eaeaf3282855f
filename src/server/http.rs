//! HTTP API over the analyzer.
//!
//! Routes:
//! - `GET /` service banner
//! - `GET /api/health` liveness and index size
//! - `POST /api/analyze` run an analysis
//! - `POST /api/reload` rebuild the index from the dataset and swap it in

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};

use crate::analysis::{AnalyzerHandle, BuildOptions, build_analyzer};
use crate::config::Settings;
use crate::server::request::{
    AnalyzeRequest, AnalyzeResponse, ErrorResponse, HealthResponse, RootResponse,
};

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub handle: AnalyzerHandle,
    pub settings: Arc<Settings>,
    /// Held for the whole rebuild so reloads never write the saved index concurrently
    reload_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(handle: AnalyzerHandle, settings: Settings) -> Self {
        Self {
            handle,
            settings: Arc::new(settings),
            reload_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub status: String,
    pub index_size: usize,
}

/// Handler failures and their status codes.
#[derive(Debug)]
enum ApiError {
    /// 422
    Validation(String),
    /// 500
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Validation(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            ApiError::Internal(detail) => (StatusCode::INTERNAL_SERVER_ERROR, detail),
        };
        (status, Json(ErrorResponse { detail })).into_response()
    }
}

fn analysis_failed(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(format!("Analysis failed: {e}"))
}

/// Builds the router with CORS applied.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.settings.server.allow_origins);

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/analyze", post(analyze))
        .route("/api/reload", post(reload))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Muse semantic profile matching API".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let analyzer = state.handle.current();
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: true,
        index_size: analyzer.index().len(),
    })
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::Validation(e.body_text()))?;

    let analyzer = state.handle.current();
    let request = request
        .validate(analyzer.settings())
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let report = tokio::task::spawn_blocking(move || {
        analyzer.analyze(&request.text, request.top_k, request.mode)
    })
    .await
    .map_err(analysis_failed)?
    .map_err(|e| {
        error!("Error during analysis: {e}");
        analysis_failed(e)
    })?;

    info!("Analysis completed in {:.2}ms", report.processing_time_ms);
    Ok(Json(AnalyzeResponse::from(report)))
}

async fn reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let _guard = state.reload_lock.lock().await;

    let embedder = state.handle.current().embedder();
    let settings = Arc::clone(&state.settings);

    let outcome = tokio::task::spawn_blocking(move || {
        build_analyzer(
            &settings,
            embedder,
            BuildOptions {
                force_rebuild: true,
                show_progress: false,
            },
        )
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Reload failed: {e}")))?
    .map_err(|e| {
        error!("Reload failed: {e}");
        ApiError::Internal(format!("Reload failed: {e}"))
    })?;

    let index_size = outcome.analyzer.index().len();
    state.handle.swap(outcome.analyzer);

    Ok(Json(ReloadResponse {
        status: "reloaded".to_string(),
        index_size,
    }))
}

/// Serves the API on `bind` until Ctrl+C.
pub async fn serve_http(settings: Settings, handle: AnalyzerHandle, bind: String) -> anyhow::Result<()> {
    let app = router(AppState::new(handle, settings));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("Listening on http://{bind}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Analyzer;
    use crate::corpus::CorpusRecord;
    use crate::vector::{EmbeddingGenerator, MockEmbeddingGenerator, VectorIndex};
    use axum::body::Body;
    use axum::http::{Request, header};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const DATASET: &str = r#"[
        {"name": "Hypatia", "category": "philosopher", "period": "4th century",
         "themes": ["rational"], "texts": ["reason, logic and the mind"]},
        {"name": "Hafez", "category": "writer", "period": "14th century",
         "themes": ["romantic", "spiritual"], "texts": ["love, wine and the divine"]}
    ]"#;

    const TEXT: &str = "Reason and logic guide my mind through every problem I face at work.";

    fn state(dir: &TempDir) -> AppState {
        let dataset = dir.path().join("dataset.json");
        std::fs::write(&dataset, DATASET).unwrap();

        let mut settings = Settings::default();
        settings.dataset_path = dataset;
        settings.index_path = dir.path().join("index");
        settings.analysis.persist_index = false;

        let embedder: Arc<dyn EmbeddingGenerator> = Arc::new(MockEmbeddingGenerator::new());
        let mut index = VectorIndex::new(embedder.dimension());
        index
            .add(
                embedder.embed_batch(&["reason and logic"]).unwrap(),
                vec![CorpusRecord::new("Hypatia", "philosopher", "4th century")],
            )
            .unwrap();
        let analyzer = Analyzer::new(embedder, index, settings.analysis.clone()).unwrap();

        AppState::new(AnalyzerHandle::new(analyzer), settings)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_root_and_health() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir));

        let response = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let root: RootResponse = body_json(response).await;
        assert_eq!(root.version, env!("CARGO_PKG_VERSION"));

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let health: HealthResponse = body_json(response).await;
        assert_eq!(health.status, "healthy");
        assert!(health.model_loaded);
        assert_eq!(health.index_size, 1);
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir));

        let body = serde_json::json!({"text": TEXT, "mode": "quick", "top_k": 5}).to_string();
        let response = app.oneshot(post_json("/api/analyze", &body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let result: AnalyzeResponse = body_json(response).await;
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].name, "Hypatia");
        assert!(result.matches[0].reason.contains("(score: 1.00)"));
        assert_eq!(result.projection.last().unwrap().label, "You");
        assert!(result.processing_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_analyze_validation_errors() {
        let dir = TempDir::new().unwrap();
        let app = router(state(&dir));

        let short = serde_json::json!({"text": "too short"}).to_string();
        let response = app
            .clone()
            .oneshot(post_json("/api/analyze", &short))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error: ErrorResponse = body_json(response).await;
        assert!(error.detail.contains("at least 50"));

        let bad_k = serde_json::json!({"text": TEXT, "top_k": 11}).to_string();
        let response = app
            .clone()
            .oneshot(post_json("/api/analyze", &bad_k))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let response = app
            .oneshot(post_json("/api/analyze", r#"{"mode": "quick"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_reload_swaps_index() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir);
        let handle = state.handle.clone();
        let app = router(state);

        let response = app
            .oneshot(post_json("/api/reload", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reloaded: ReloadResponse = body_json(response).await;
        assert_eq!(reloaded.index_size, 2);
        assert_eq!(handle.current().index().len(), 2);
    }

    #[tokio::test]
    async fn test_reloads_are_serialized() {
        let dir = TempDir::new().unwrap();
        let mut state = state(&dir);
        let mut settings = (*state.settings).clone();
        settings.analysis.persist_index = true;
        state.settings = Arc::new(settings);
        let index_path = state.settings.index_path.clone();
        let lock = Arc::clone(&state.reload_lock);
        let app = router(state);

        // A reload in progress blocks the next one
        let guard = lock.lock().await;
        let blocked = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            app.clone().oneshot(post_json("/api/reload", "")),
        )
        .await;
        assert!(blocked.is_err());
        drop(guard);

        let (first, second) = tokio::join!(
            app.clone().oneshot(post_json("/api/reload", "")),
            app.oneshot(post_json("/api/reload", "")),
        );
        assert_eq!(first.unwrap().status(), StatusCode::OK);
        assert_eq!(second.unwrap().status(), StatusCode::OK);

        let saved = crate::vector::IndexStorage::new(index_path).load().unwrap();
        assert_eq!(saved.len(), 2);
    }

    #[tokio::test]
    async fn test_reload_failure_keeps_old_analyzer() {
        let dir = TempDir::new().unwrap();
        let mut state = state(&dir);
        let mut settings = (*state.settings).clone();
        settings.dataset_path = dir.path().join("missing.json");
        state.settings = Arc::new(settings);
        let handle = state.handle.clone();

        let response = router(state)
            .oneshot(post_json("/api/reload", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(handle.current().index().len(), 1);
    }
}
