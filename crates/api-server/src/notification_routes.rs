use axum::{extract::State, routing::post, Json, Router};
use notification_service::DeliveryId;
use serde::Serialize;

use crate::requests::{ValidJson, WhatsAppRequest};
use crate::{AppError, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub success: bool,
    pub message_id: DeliveryId,
}

pub fn notification_routes() -> Router<AppState> {
    Router::new().route("/api/notifications/whatsapp", post(send_whatsapp))
}

/// Relay one message straight to the gateway.
async fn send_whatsapp(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<WhatsAppRequest>,
) -> Result<Json<SendResponse>, AppError> {
    let message_id = state.dispatcher.gateway().send(&req.to, &req.message).await?;

    tracing::info!("Relayed WhatsApp message {}", message_id);
    Ok(Json(SendResponse {
        success: true,
        message_id,
    }))
}
