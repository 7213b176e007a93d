use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::gateway::{normalize_destination, validate_text, DeliveryId, GatewayError, NotificationGateway};
use crate::NotificationConfig;

/// WhatsApp delivery through the Twilio Messages API.
pub struct TwilioWhatsAppGateway {
    client: Client,
    api_base: String,
    account_sid: String,
    auth_token: String,
    from: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    sid: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    code: Option<i64>,
}

impl TwilioWhatsAppGateway {
    pub fn new(config: &NotificationConfig) -> Result<Self, GatewayError> {
        let account_sid = config
            .twilio_account_sid
            .clone()
            .ok_or_else(|| GatewayError::Config("TWILIO_ACCOUNT_SID not set".into()))?;
        let auth_token = config
            .twilio_auth_token
            .clone()
            .ok_or_else(|| GatewayError::Config("TWILIO_AUTH_TOKEN not set".into()))?;
        let sender = config
            .twilio_whatsapp_number
            .as_deref()
            .ok_or_else(|| GatewayError::Config("TWILIO_WHATSAPP_NUMBER not set".into()))?;

        let sender = sender.strip_prefix("whatsapp:").unwrap_or(sender);
        let from = normalize_destination(sender).map_err(|_| {
            GatewayError::Config(format!("Invalid TWILIO_WHATSAPP_NUMBER: {}", sender))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| GatewayError::Config(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.twilio_api_base.trim_end_matches('/').to_string(),
            account_sid,
            auth_token,
            from,
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base, self.account_sid
        )
    }
}

#[async_trait]
impl NotificationGateway for TwilioWhatsAppGateway {
    async fn send(&self, destination: &str, text: &str) -> Result<DeliveryId, GatewayError> {
        let to = normalize_destination(destination)?;
        validate_text(text)?;

        let from = format!("whatsapp:{}", self.from);
        let to = format!("whatsapp:{}", to);
        let params = [("From", from.as_str()), ("To", to.as_str()), ("Body", text)];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&params)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    message: Some(message),
                    code: Some(code),
                }) => format!("{} (code {})", message, code),
                Ok(ErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                _ => body,
            };
            return Err(GatewayError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessageResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Transport(format!("Malformed provider response: {}", e)))?;

        tracing::debug!("Twilio accepted message {} for {}", parsed.sid, to);
        Ok(DeliveryId(parsed.sid))
    }

    fn name(&self) -> &str {
        "twilio-whatsapp"
    }
}
