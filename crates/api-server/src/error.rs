use axum::{
    extract::rejection::PathRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fx_core::FxError;
use notification_service::{DispatchError, GatewayError};
use serde_json::json;
use subscriber_store::StoreError;

/// Errors returned from handlers. Every variant renders as
/// `{"success": false, "error": "..."}`; server-side failures are logged and
/// answered with a generic message.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Upstream(GatewayError),
    Store(StoreError),
    Internal(anyhow::Error),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Upstream(e) => write!(f, "Upstream transport error: {}", e),
            AppError::Store(e) => write!(f, "Store error: {}", e),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl std::error::Error for AppError {}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Store(other),
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(e: GatewayError) -> Self {
        if e.is_invalid_input() {
            AppError::Validation(e.to_string())
        } else {
            AppError::Upstream(e)
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Gateway(e) => e.into(),
            DispatchError::Store(e) => e.into(),
        }
    }
}

impl From<FxError> for AppError {
    fn from(e: FxError) -> Self {
        match e {
            FxError::InvalidPair(_) | FxError::InvalidData(_) => AppError::Validation(e.to_string()),
            FxError::UnknownPair(_) => AppError::NotFound(e.to_string()),
            FxError::SourceError(_) => AppError::Internal(e.into()),
        }
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Upstream(_) | AppError::Store(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Upstream(e) => {
                tracing::error!("Failed to send notification: {}", e);
                "Failed to send notification".to_string()
            }
            AppError::Store(e) => {
                tracing::error!("Subscriber store failure: {}", e);
                "Failed to access subscriber store".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
        };

        (
            self.status(),
            Json(json!({
                "success": false,
                "error": message,
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(StoreError::Validation("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GatewayError::EmptyMessage).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(GatewayError::Transport("timeout".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::from(FxError::UnknownPair("GBP-AUD".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::from(FxError::InvalidData("days".into())).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn test_server_errors_hide_details() {
        let response = AppError::Upstream(GatewayError::Provider {
            status: 401,
            message: "Authenticate: bad token AC123".into(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Failed to send notification");
    }
}
