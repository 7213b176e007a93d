//! Who gets told about a new high.
//!
//! A recipient qualifies when it is active and the new rate is at or above its
//! threshold. Each qualifying recipient gets exactly one gateway call per
//! event; failures are reported back, never retried.

use fx_core::{NewHigh, Subscriber};
use serde::Serialize;
use std::sync::Arc;
use subscriber_store::{StoreError, SubscriberStore};

use crate::gateway::{DeliveryId, GatewayError, NotificationGateway};
use crate::templates::MessageTemplate;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Delivery {
    pub phone_number: String,
    pub delivery_id: DeliveryId,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedDelivery {
    pub phone_number: String,
    pub error: String,
}

/// Outcome of fanning one event out to the active subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub pair: String,
    pub rate: f64,
    pub delivered: Vec<Delivery>,
    pub skipped: usize,
    pub failed: Vec<FailedDelivery>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }
}

#[derive(Clone)]
pub struct AlertDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    store: SubscriberStore,
    public_url: String,
}

impl AlertDispatcher {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        store: SubscriberStore,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            store,
            public_url: public_url.into(),
        }
    }

    pub fn gateway(&self) -> &Arc<dyn NotificationGateway> {
        &self.gateway
    }

    pub fn should_notify(recipient: &Subscriber, rate: f64) -> bool {
        recipient.is_active() && rate >= recipient.notification_threshold
    }

    /// Notify one recipient. `Ok(None)` when the recipient does not qualify.
    pub async fn dispatch_to(
        &self,
        event: &NewHigh,
        recipient: &Subscriber,
    ) -> Result<Option<DeliveryId>, DispatchError> {
        if !Self::should_notify(recipient, event.rate) {
            return Ok(None);
        }

        let message = MessageTemplate::new_high(event, &self.public_url);
        let id = self.gateway.send(&recipient.phone_number, &message).await?;
        Ok(Some(id))
    }

    /// Notify every qualifying active subscriber. Only a store failure aborts
    /// the run; per-recipient send failures are collected in the report.
    pub async fn dispatch(&self, event: &NewHigh) -> Result<DispatchReport, DispatchError> {
        let recipients = self.store.list_active().await?;

        let mut report = DispatchReport {
            pair: event.pair.to_string(),
            rate: event.rate,
            delivered: Vec::new(),
            skipped: 0,
            failed: Vec::new(),
        };

        for recipient in &recipients {
            match self.dispatch_to(event, recipient).await {
                Ok(Some(delivery_id)) => report.delivered.push(Delivery {
                    phone_number: recipient.phone_number.clone(),
                    delivery_id,
                }),
                Ok(None) => report.skipped += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to notify {} via {}: {}",
                        recipient.phone_number,
                        self.gateway.name(),
                        e
                    );
                    report.failed.push(FailedDelivery {
                        phone_number: recipient.phone_number.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "{} at {:.4}: {} notified, {} below threshold, {} failed",
            report.pair,
            report.rate,
            report.delivered.len(),
            report.skipped,
            report.failed.len()
        );

        Ok(report)
    }

    pub async fn welcome(&self, phone: &str, threshold: f64) -> Result<DeliveryId, GatewayError> {
        let message = MessageTemplate::welcome(threshold, &self.public_url);
        self.gateway.send(phone, &message).await
    }
}
