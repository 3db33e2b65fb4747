//! Test utilities for tally-core
//!
//! A mock model server speaking the Ollama, Gemini and OpenAI-compatible
//! wire formats, for exercising the real HTTP backends in tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Json, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::mock::heuristic_reply;

/// API key the mock Gemini endpoint accepts
pub const MOCK_GEMINI_KEY: &str = "test-gemini-key";

#[derive(Clone)]
struct ServerState {
    /// Return 503 from every generate endpoint
    failing: bool,
    hits: Arc<AtomicUsize>,
}

/// Mock model server for testing and development
pub struct MockModelServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockModelServer {
    /// Start a server that answers every generate call
    pub async fn start() -> Self {
        Self::start_with(false).await
    }

    /// Start a server whose generate endpoints all return 503
    pub async fn start_failing() -> Self {
        Self::start_with(true).await
    }

    async fn start_with(failing: bool) -> Self {
        let hits = Arc::new(AtomicUsize::new(0));
        let state = ServerState {
            failing,
            hits: hits.clone(),
        };

        let app = Router::new()
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_ollama_generate))
            .route(
                "/v1beta/models/:model",
                get(handle_gemini_model).post(handle_gemini_generate),
            )
            .route("/v1/models", get(handle_openai_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            hits,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of generate requests received
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockModelServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn unavailable() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "model overloaded").into_response()
}

async fn handle_tags() -> Json<serde_json::Value> {
    Json(json!({ "models": [{ "name": "llama3.2:latest" }] }))
}

#[derive(Debug, Deserialize)]
struct OllamaGenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct OllamaGenerateResponse {
    model: String,
    response: String,
    done: bool,
}

async fn handle_ollama_generate(
    State(state): State<ServerState>,
    Json(request): Json<OllamaGenerateRequest>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if state.failing {
        return unavailable();
    }
    Json(OllamaGenerateResponse {
        model: request.model,
        response: heuristic_reply(&request.prompt),
        done: true,
    })
    .into_response()
}

fn gemini_authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|k| k == MOCK_GEMINI_KEY)
        .unwrap_or(false)
}

async fn handle_gemini_model(Path(model): Path<String>, headers: HeaderMap) -> Response {
    if !gemini_authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    Json(json!({ "name": format!("models/{}", model) })).into_response()
}

async fn handle_gemini_generate(
    State(state): State<ServerState>,
    Path(model_action): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if !model_action.ends_with(":generateContent") {
        return StatusCode::NOT_FOUND.into_response();
    }
    if !gemini_authorized(&headers) {
        return StatusCode::FORBIDDEN.into_response();
    }
    if state.failing {
        return unavailable();
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    Json(json!({
        "candidates": [{
            "content": { "parts": [{ "text": heuristic_reply(prompt) }], "role": "model" },
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

async fn handle_openai_models() -> Json<serde_json::Value> {
    Json(json!({ "object": "list", "data": [{ "id": "mock-model" }] }))
}

async fn handle_chat_completions(
    State(state): State<ServerState>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if state.failing {
        return unavailable();
    }

    let prompt = body["messages"][0]["content"].as_str().unwrap_or_default();
    Json(json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": heuristic_reply(prompt) }
        }]
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AIBackend, GeminiBackend, OllamaBackend, OpenAICompatibleBackend};

    #[tokio::test]
    async fn test_mock_server_health_checks() {
        let server = MockModelServer::start().await;

        assert!(OllamaBackend::new(&server.url(), "llama3.2").health_check().await);
        assert!(
            GeminiBackend::new(&server.url(), "gemini-pro", MOCK_GEMINI_KEY)
                .health_check()
                .await
        );
        assert!(
            !GeminiBackend::new(&server.url(), "gemini-pro", "wrong-key")
                .health_check()
                .await
        );
        assert!(
            OpenAICompatibleBackend::new(&server.url(), "mock-model")
                .health_check()
                .await
        );
    }

    #[tokio::test]
    async fn test_each_backend_gets_fenced_json() {
        let server = MockModelServer::start().await;
        let prompt = "Expense text: coffee 120";

        let ollama = OllamaBackend::new(&server.url(), "llama3.2");
        let gemini = GeminiBackend::new(&server.url(), "gemini-pro", MOCK_GEMINI_KEY);
        let openai = OpenAICompatibleBackend::new(&server.url(), "mock-model");

        for text in [
            ollama.generate(prompt).await.unwrap(),
            gemini.generate(prompt).await.unwrap(),
            openai.generate(prompt).await.unwrap(),
        ] {
            assert!(text.starts_with("```json"));
            assert!(text.contains(r#""price": 120"#));
        }
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_failing_server_returns_backend_error() {
        let server = MockModelServer::start_failing().await;
        let err = OllamaBackend::new(&server.url(), "llama3.2")
            .generate("Expense text: tea 10")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_pipeline_over_http_retries_then_fails() {
        use crate::ai::AIClient;
        use crate::config::ExtractionConfig;
        use crate::extract::{ExtractionPipeline, FailureReason};
        use crate::models::TextRequest;
        use crate::prompts::PromptLibrary;

        let server = MockModelServer::start_failing().await;
        let config = ExtractionConfig {
            retry_backoff: std::time::Duration::from_millis(1),
            ..Default::default()
        };
        let pipeline = ExtractionPipeline::new(
            AIClient::ollama(&server.url(), "llama3.2"),
            config,
            &mut PromptLibrary::embedded_only(),
        )
        .unwrap();

        let request = TextRequest::new("tea 10", None).unwrap();
        let failure = pipeline.extract(&request).await.unwrap_err();
        assert_eq!(failure.reason, FailureReason::BackendUnavailable);
        assert_eq!(server.hits(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_over_gemini_http() {
        use crate::ai::AIClient;
        use crate::config::ExtractionConfig;
        use crate::extract::ExtractionPipeline;
        use crate::models::{Category, TextRequest};
        use crate::prompts::PromptLibrary;

        let server = MockModelServer::start().await;
        let pipeline = ExtractionPipeline::new(
            AIClient::Gemini(GeminiBackend::new(
                &server.url(),
                "gemini-pro",
                MOCK_GEMINI_KEY,
            )),
            ExtractionConfig::default(),
            &mut PromptLibrary::embedded_only(),
        )
        .unwrap();

        let request = TextRequest::new("I spent 20rs on panipuri", None).unwrap();
        let record = pipeline.extract(&request).await.unwrap();
        assert_eq!(record.price, 20.0);
        assert_eq!(record.category, Category::Food);
    }

    #[tokio::test]
    async fn test_ollama_from_env_not_set() {
        std::env::remove_var("OLLAMA_HOST");
        assert!(OllamaBackend::from_env().is_none());
    }
}
