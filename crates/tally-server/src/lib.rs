//! Tally Web Server
//!
//! Axum-based REST API and messaging webhook for the Tally expense tracker.
//!
//! Security features:
//! - Bearer API key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Input validation (pagination limits, blank text rejection)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use tally_core::ai::{AIBackend, AIClient};
use tally_core::chart::SvgBarChart;
use tally_core::config::ExtractionConfig;
use tally_core::db::Database;
use tally_core::extract::ExtractionPipeline;
use tally_core::notify::{notifier_from_env, Notifier};
use tally_core::prompts::PromptLibrary;
use tally_core::service::ExpenseService;

mod handlers;

pub use tally_core::db::MAX_PAGE_LIMIT;

/// Environment variable holding comma-separated API keys
pub const API_KEYS_ENV: &str = "TALLY_API_KEYS";

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Paths reachable without authentication
const OPEN_PATHS: &[&str] = &["/api/health"];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as `Authorization: Bearer <key>`
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    /// Present only when a generative backend is configured
    pub expenses: Option<ExpenseService<Database>>,
    pub notifier: Arc<dyn Notifier>,
    pub chart: SvgBarChart,
}

impl AppState {
    /// Build state with an explicit backend (or none)
    pub fn new(
        db: Database,
        config: ServerConfig,
        ai: Option<AIClient>,
        notifier: Arc<dyn Notifier>,
    ) -> anyhow::Result<Self> {
        let expenses = match ai {
            Some(client) => {
                let pipeline = ExtractionPipeline::new(
                    client,
                    ExtractionConfig::load()?,
                    &mut PromptLibrary::new(),
                )?;
                Some(ExpenseService::new(pipeline, db.clone()))
            }
            None => None,
        };

        Ok(Self {
            db,
            config,
            expenses,
            notifier,
            chart: SvgBarChart,
        })
    }

    /// Build state from environment variables (`AI_BACKEND`, `TALLY_REPLY_WEBHOOK_URL`, ...)
    pub fn from_env(db: Database, config: ServerConfig) -> anyhow::Result<Self> {
        let ai = AIClient::from_env();
        match &ai {
            Some(client) => info!(
                "AI backend configured: {} {} (model: {})",
                client.kind(),
                client.host(),
                client.model()
            ),
            None => warn!(
                "AI backend not configured (set GEMINI_API_KEY or AI_BACKEND); expense extraction disabled"
            ),
        }
        Self::new(db, config, ai, notifier_from_env())
    }

    /// The ingest service, or 503 when no backend is configured
    pub fn expense_service(&self) -> Result<&ExpenseService<Database>, AppError> {
        self.expenses
            .as_ref()
            .ok_or_else(|| AppError::unavailable("No generative backend configured"))
    }
}

/// Authentication middleware - validates bearer API keys
///
/// API keys are compared in constant time. Health checks are always open.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth || OPEN_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Parse a comma-separated list of API keys, dropping blanks
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Create the application router
pub fn create_router(state: Arc<AppState>, static_dir: Option<&str>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Expenses
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::add_expense),
        )
        .route("/expenses/:id", get(handlers::get_expense))
        // Reports
        .route("/reports/by-category", get(handlers::spending_by_category))
        .route("/expense_chart", get(handlers::expense_chart))
        // Messaging webhook
        .route("/webhook/message", post(handlers::receive_message));

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        cors
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(origins)
    };

    // CSP: same-origin scripts, inline styles, data: images for the chart
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        // Routes the original web UI posts to
        .route("/add_expense", post(handlers::add_expense))
        .route("/expense_chart", get(handlers::expense_chart))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!(
            "Authentication required but {} is empty; every protected request will be rejected",
            API_KEYS_ENV
        );
    }

    let state = Arc::new(AppState::from_env(db, config)?);
    check_ai_connection(&state).await;

    let app = create_router(state, static_dir);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(state: &AppState) {
    if let Some(service) = &state.expenses {
        let client = service.pipeline().backend();
        if client.health_check().await {
            info!(
                "AI backend connected: {} (model: {})",
                client.host(),
                client.model()
            );
        } else {
            warn!(
                "AI backend configured but not responding: {} (model: {})",
                client.host(),
                client.model()
            );
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err.into()),
        }
    }
}
