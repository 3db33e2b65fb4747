//! Health check

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;
use tally_core::ai::AIBackend;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Configured backend kind, absent when extraction is disabled
    pub ai_backend: Option<&'static str>,
    pub ai_model: Option<String>,
    pub ai_healthy: bool,
}

/// GET /api/health - Liveness plus generative backend reachability
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let Some(service) = &state.expenses else {
        return Json(HealthResponse {
            status: "ok",
            ai_backend: None,
            ai_model: None,
            ai_healthy: false,
        });
    };

    let client = service.pipeline().backend();
    Json(HealthResponse {
        status: "ok",
        ai_backend: Some(client.kind()),
        ai_model: Some(client.model().to_string()),
        ai_healthy: client.health_check().await,
    })
}
