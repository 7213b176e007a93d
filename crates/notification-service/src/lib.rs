mod dispatch;
mod gateway;
mod templates;
mod twilio;

pub use dispatch::{AlertDispatcher, Delivery, DispatchError, DispatchReport, FailedDelivery};
pub use gateway::{normalize_destination, DeliveryId, DryRunGateway, GatewayError, NotificationGateway};
pub use templates::MessageTemplate;
pub use twilio::TwilioWhatsAppGateway;

use std::sync::Arc;

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Configuration for the notification side of the service.
#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_whatsapp_number: Option<String>,
    pub twilio_api_base: String,
    /// Link appended to alert messages.
    pub public_url: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            twilio_account_sid: None,
            twilio_auth_token: None,
            twilio_whatsapp_number: None,
            twilio_api_base: DEFAULT_TWILIO_API_BASE.to_string(),
            public_url: "http://localhost:5173".to_string(),
        }
    }
}

impl NotificationConfig {
    /// Read the `TWILIO_*` and `PUBLIC_URL` keys from `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|s| !s.trim().is_empty());
        let defaults = Self::default();

        Self {
            twilio_account_sid: non_empty("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: non_empty("TWILIO_AUTH_TOKEN"),
            twilio_whatsapp_number: non_empty("TWILIO_WHATSAPP_NUMBER"),
            twilio_api_base: non_empty("TWILIO_API_BASE").unwrap_or(defaults.twilio_api_base),
            public_url: non_empty("PUBLIC_URL").unwrap_or(defaults.public_url),
        }
    }

    pub fn twilio_configured(&self) -> bool {
        self.twilio_account_sid.is_some()
            && self.twilio_auth_token.is_some()
            && self.twilio_whatsapp_number.is_some()
    }
}

/// Pick the gateway for this configuration: Twilio when all credentials are
/// present, otherwise a dry-run gateway that only logs.
pub fn build_gateway(config: &NotificationConfig) -> Arc<dyn NotificationGateway> {
    if config.twilio_configured() {
        match TwilioWhatsAppGateway::new(config) {
            Ok(gateway) => {
                tracing::info!("WhatsApp notifications enabled (Twilio)");
                return Arc::new(gateway);
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Twilio gateway: {}", e);
            }
        }
    } else {
        tracing::warn!(
            "Twilio not configured (set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN, TWILIO_WHATSAPP_NUMBER); notifications will be logged only"
        );
    }

    Arc::new(DryRunGateway::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_uses_dry_run() {
        let gateway = build_gateway(&NotificationConfig::default());
        assert_eq!(gateway.name(), "dry-run");
    }

    #[test]
    fn test_configured_uses_twilio() {
        let config = NotificationConfig {
            twilio_account_sid: Some("AC123".into()),
            twilio_auth_token: Some("secret".into()),
            twilio_whatsapp_number: Some("+14155238886".into()),
            ..NotificationConfig::default()
        };
        assert!(config.twilio_configured());
        assert_eq!(build_gateway(&config).name(), "twilio-whatsapp");
    }

    #[test]
    fn test_from_lookup() {
        let config = NotificationConfig::from_lookup(|key| match key {
            "TWILIO_ACCOUNT_SID" => Some("AC123".into()),
            "TWILIO_AUTH_TOKEN" => Some("secret".into()),
            "TWILIO_WHATSAPP_NUMBER" => Some("  ".into()),
            "PUBLIC_URL" => Some("https://fx.example".into()),
            _ => None,
        });
        assert!(config.twilio_whatsapp_number.is_none());
        assert!(!config.twilio_configured());
        assert_eq!(config.twilio_api_base, DEFAULT_TWILIO_API_BASE);
        assert_eq!(config.public_url, "https://fx.example");
    }

    #[test]
    fn test_partial_credentials_not_configured() {
        let config = NotificationConfig {
            twilio_account_sid: Some("AC123".into()),
            ..NotificationConfig::default()
        };
        assert!(!config.twilio_configured());
    }
}
