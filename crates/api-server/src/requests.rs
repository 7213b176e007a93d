//! Typed request bodies.
//!
//! Handlers take `ValidJson<T>` or `ValidQuery<T>`, which reject a body or
//! query string that does not deserialize and then run `Validate::validate`
//! before the handler sees the value. Both failures come back as 400 in the
//! usual error shape.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use notification_service::normalize_destination;
use rate_source::MAX_HISTORY_DAYS;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::AppError;

pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

pub struct ValidJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection: JsonRejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidJson(value))
    }
}

pub struct ValidQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection: QueryRejection| AppError::Validation(rejection.body_text()))?;
        value.validate()?;
        Ok(ValidQuery(value))
    }
}

/// Storage key for a phone number: digits only, no leading `+`.
pub fn phone_key(phone: &str) -> Result<String, AppError> {
    normalize_destination(phone)
        .map(|p| p.trim_start_matches('+').to_string())
        .map_err(|_| AppError::Validation(format!("Invalid phone number: {:?}", phone)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(default)]
    pub phone_number: String,
    pub notification_threshold: Option<f64>,
}

impl Validate for SubscribeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.phone_number.trim().is_empty() {
            return Err(AppError::Validation("phoneNumber is required".into()));
        }
        phone_key(&self.phone_number)?;
        match self.notification_threshold {
            None => Err(AppError::Validation("notificationThreshold is required".into())),
            Some(t) if !t.is_finite() || t <= 0.0 => Err(AppError::Validation(
                "notificationThreshold must be a positive number".into(),
            )),
            Some(_) => Ok(()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsubscribeRequest {
    #[serde(default)]
    pub phone_number: String,
}

impl Validate for UnsubscribeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.phone_number.trim().is_empty() {
            return Err(AppError::Validation("phoneNumber is required".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct WhatsAppRequest {
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

impl Validate for WhatsAppRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.to.trim().is_empty() || self.message.trim().is_empty() {
            return Err(AppError::Validation("Missing required parameters".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub days: Option<u32>,
}

impl HistoryQuery {
    pub const DEFAULT_DAYS: u32 = 30;

    pub fn days(&self) -> u32 {
        self.days.unwrap_or(Self::DEFAULT_DAYS)
    }
}

impl Validate for HistoryQuery {
    fn validate(&self) -> Result<(), AppError> {
        let days = self.days();
        if days == 0 || days > MAX_HISTORY_DAYS {
            return Err(AppError::Validation(format!(
                "days must be between 1 and {}",
                MAX_HISTORY_DAYS
            )));
        }
        Ok(())
    }
}
