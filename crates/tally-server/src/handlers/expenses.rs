//! Expense handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::sender_filter;
use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use tally_core::models::{Expense, TextRequest};
use tally_core::service::RecordOutcome;

/// Body for submitting a free-text expense
#[derive(Debug, Deserialize)]
pub struct AddExpenseRequest {
    pub text: String,
    #[serde(default)]
    pub sender_id: Option<String>,
}

/// Query parameters for listing expenses
#[derive(Debug, Deserialize)]
pub struct ExpenseQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub sender_id: Option<String>,
}

fn default_limit() -> i64 {
    50
}

#[derive(Serialize)]
pub struct ExpenseListResponse {
    pub expenses: Vec<Expense>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// POST /api/expenses - Extract an expense from free text and store it
///
/// Also mounted at `POST /add_expense`.
pub async fn add_expense(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddExpenseRequest>,
) -> Result<Response, AppError> {
    let service = state.expense_service()?;
    let request = TextRequest::new(body.text, body.sender_id)
        .map_err(|_| AppError::bad_request("Expense text must not be empty"))?;

    let outcome = service.record(&request).await?;
    Ok(outcome_response(&outcome))
}

/// Render a record outcome as the JSON the web UI expects
pub(crate) fn outcome_response(outcome: &RecordOutcome) -> Response {
    match outcome {
        RecordOutcome::Recorded { id, record } => (
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Expense added!",
                "id": id,
                "data": record,
            })),
        )
            .into_response(),
        RecordOutcome::Rejected(failure) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "success": false,
                "message": "Failed to extract expense data",
                "failure": failure,
            })),
        )
            .into_response(),
    }
}

/// GET /api/expenses - List expenses, newest first
pub async fn list_expenses(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExpenseQuery>,
) -> Result<Json<ExpenseListResponse>, AppError> {
    // Input validation: clamp pagination parameters
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let offset = params.offset.max(0);
    let sender_id = sender_filter(&params.sender_id);

    let expenses = state.db.list_expenses(sender_id, limit, offset)?;
    let total = state.db.count_expenses(sender_id)?;

    Ok(Json(ExpenseListResponse {
        expenses,
        total,
        limit,
        offset,
    }))
}

/// GET /api/expenses/:id - Get a single expense
pub async fn get_expense(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Expense>, AppError> {
    let expense = state
        .db
        .get_expense(id)?
        .ok_or_else(|| AppError::not_found("Expense not found"))?;
    Ok(Json(expense))
}
