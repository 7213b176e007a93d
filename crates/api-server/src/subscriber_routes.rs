//! Subscription API Routes
//!
//! Subscribe, unsubscribe and the admin listing of active subscribers.

use axum::{extract::State, routing::{get, post}, Json, Router};
use fx_core::Subscriber;

use crate::config::WelcomePolicy;
use crate::requests::{phone_key, SubscribeRequest, UnsubscribeRequest, ValidJson};
use crate::{AppError, AppState, SuccessResponse};

pub fn subscriber_routes() -> Router<AppState> {
    Router::new()
        .route("/api/subscribe", post(subscribe))
        .route("/api/unsubscribe", post(unsubscribe))
        .route("/api/subscribers", get(list_subscribers))
}

async fn subscribe(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SubscribeRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let phone = phone_key(&req.phone_number)?;
    let threshold = req
        .notification_threshold
        .ok_or_else(|| AppError::Validation("notificationThreshold is required".into()))?;

    match state.welcome_policy {
        WelcomePolicy::Required => {
            state.dispatcher.welcome(&phone, threshold).await?;
            state.store.upsert_subscriber(&phone, threshold).await?;
        }
        WelcomePolicy::BestEffort => {
            state.store.upsert_subscriber(&phone, threshold).await?;
            if let Err(e) = state.dispatcher.welcome(&phone, threshold).await {
                tracing::warn!("Subscribed {} but welcome message failed: {}", phone, e);
            }
        }
    }

    tracing::info!("Subscribed {} at threshold {:.4}", phone, threshold);
    Ok(Json(SuccessResponse::ok()))
}

async fn unsubscribe(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<UnsubscribeRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    // Numbers that never passed subscribe validation cannot be stored, but
    // unsubscribing them is still a harmless no-op.
    let phone = phone_key(&req.phone_number).unwrap_or_else(|_| req.phone_number.trim().to_string());

    if state.store.deactivate(&phone).await? {
        tracing::info!("Unsubscribed {}", phone);
    } else {
        tracing::debug!("Unsubscribe for unknown or inactive number {}", phone);
    }

    Ok(Json(SuccessResponse::ok()))
}

async fn list_subscribers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscriber>>, AppError> {
    Ok(Json(state.store.list_active().await?))
}
