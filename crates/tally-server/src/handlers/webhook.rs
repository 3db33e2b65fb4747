//! Messaging webhook
//!
//! A chat provider forwards each inbound message here. The text is recorded
//! under the sender's id and a short reply goes back through the notifier.

use std::sync::Arc;

use axum::{extract::State, response::Response, Json};
use serde::Deserialize;
use tracing::info;

use super::expenses::outcome_response;
use crate::{AppError, AppState};
use tally_core::models::TextRequest;
use tally_core::notify;

#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Sender id as assigned by the messaging provider
    pub from: String,
    pub text: String,
}

/// POST /api/webhook/message - Record an expense sent as a chat message
pub async fn receive_message(
    State(state): State<Arc<AppState>>,
    Json(message): Json<InboundMessage>,
) -> Result<Response, AppError> {
    let service = state.expense_service()?;
    let request = TextRequest::new(message.text, Some(message.from))
        .map_err(|_| AppError::bad_request("Message text must not be empty"))?;

    let outcome = service.record(&request).await?;

    if let Some(sender) = request.sender_id() {
        info!(sender_id = sender, "Dispatching reply");
        notify::dispatch(
            state.notifier.clone(),
            sender.to_string(),
            outcome.reply_text(),
        );
    }

    Ok(outcome_response(&outcome))
}
