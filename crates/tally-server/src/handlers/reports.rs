//! Report handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::sender_filter;
use crate::{AppError, AppState};
use tally_core::chart::{ChartOptions, ChartRenderer};
use tally_core::models::SpendingSummary;

/// Optional per-sender scope for reports
#[derive(Debug, Deserialize)]
pub struct SenderQuery {
    pub sender_id: Option<String>,
}

/// GET /api/reports/by-category - Category totals
pub async fn spending_by_category(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SenderQuery>,
) -> Result<Json<SpendingSummary>, AppError> {
    let summary = state
        .db
        .get_spending_summary(sender_filter(&params.sender_id))?;
    Ok(Json(summary))
}

/// GET /api/expense_chart - Bar chart of spending per category
///
/// Also mounted at `GET /expense_chart`.
pub async fn expense_chart(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SenderQuery>,
) -> Result<Response, AppError> {
    let totals = state.db.sum_by_category(sender_filter(&params.sender_id))?;

    if totals.is_empty() {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "success": false,
                "message": "No expense data available",
            })),
        )
            .into_response());
    }

    let chart = state.chart.render(&totals, &ChartOptions::default())?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, chart.content_type),
            (header::CACHE_CONTROL, "no-store"),
        ],
        chart.bytes,
    )
        .into_response())
}
