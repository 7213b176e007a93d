use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Provider-assigned identifier of an accepted message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors from a notification gateway. No variant implies a retry happened.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid destination: {0:?}")]
    InvalidDestination(String),
    #[error("Message text is empty")]
    EmptyMessage,
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Provider rejected message ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// Whether the caller supplied bad input, as opposed to a delivery failure.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            GatewayError::InvalidDestination(_) | GatewayError::EmptyMessage
        )
    }
}

/// Outbound text-message transport. One call is at most one delivery attempt.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryId, GatewayError>;
    fn name(&self) -> &str;
}

/// Normalize a phone-number-like destination to `+<digits>`.
///
/// Spaces, dashes, dots and parentheses are dropped; what remains must be an
/// optional `+` followed by 7 to 15 digits.
pub fn normalize_destination(destination: &str) -> Result<String, GatewayError> {
    let compact: String = destination
        .trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);

    if (7..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(format!("+{}", digits))
    } else {
        Err(GatewayError::InvalidDestination(destination.to_string()))
    }
}

pub(crate) fn validate_text(text: &str) -> Result<(), GatewayError> {
    if text.trim().is_empty() {
        Err(GatewayError::EmptyMessage)
    } else {
        Ok(())
    }
}

/// Gateway used when no provider is configured: validates, logs, and returns
/// a synthetic delivery id.
#[derive(Debug, Default)]
pub struct DryRunGateway;

impl DryRunGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationGateway for DryRunGateway {
    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryId, GatewayError> {
        let to = normalize_destination(destination)?;
        validate_text(text)?;

        let id = DeliveryId(format!("dry-run-{}", uuid::Uuid::new_v4()));
        tracing::info!(to = %to, delivery_id = %id, "Dry-run notification: {}", text);
        Ok(id)
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
