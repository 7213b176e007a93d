use fx_core::Subscriber;

use crate::db::SubscriberDb;
use crate::error::{Result, StoreError};

/// Subscriber records, one row per phone number. Rows are never deleted;
/// unsubscribing only clears the `subscribed` flag.
#[derive(Clone)]
pub struct SubscriberStore {
    db: SubscriberDb,
}

impl SubscriberStore {
    pub fn new(db: SubscriberDb) -> Self {
        Self { db }
    }

    /// Open the database at `database_url` and wrap it in a store.
    pub async fn open(database_url: &str) -> Result<Self> {
        Ok(Self::new(SubscriberDb::new(database_url).await?))
    }

    pub async fn close(&self) {
        self.db.close().await;
        tracing::info!("Subscriber database closed");
    }

    /// Insert or replace the record for `phone`, marking it active and
    /// refreshing its creation timestamp.
    pub async fn upsert_subscriber(&self, phone: &str, threshold: f64) -> Result<Subscriber> {
        let phone = validate_phone(phone)?;
        validate_threshold(threshold)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let subscriber = sqlx::query_as::<_, Subscriber>(
            r#"
            INSERT INTO subscribers (phone_number, notification_threshold, subscribed, created_at)
            VALUES (?, ?, 1, ?)
            ON CONFLICT(phone_number) DO UPDATE SET
                notification_threshold = excluded.notification_threshold,
                subscribed = 1,
                created_at = excluded.created_at
            RETURNING phone_number, notification_threshold, subscribed, created_at
            "#,
        )
        .bind(phone)
        .bind(threshold)
        .bind(&created_at)
        .fetch_one(self.db.pool())
        .await?;

        tracing::debug!("Upserted subscriber {} (threshold {:.4})", phone, threshold);
        Ok(subscriber)
    }

    /// Mark `phone` inactive. Returns whether a record was changed; an unknown
    /// number is not an error.
    pub async fn deactivate(&self, phone: &str) -> Result<bool> {
        let phone = validate_phone(phone)?;

        let result = sqlx::query(
            "UPDATE subscribers SET subscribed = 0 WHERE phone_number = ? AND subscribed = 1",
        )
        .bind(phone)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All active subscribers in insertion order.
    pub async fn list_active(&self) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT phone_number, notification_threshold, subscribed, created_at
            FROM subscribers
            WHERE subscribed = 1
            ORDER BY rowid
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(subscribers)
    }

    /// Every subscriber, active or not, in insertion order.
    pub async fn list_all(&self) -> Result<Vec<Subscriber>> {
        let subscribers = sqlx::query_as::<_, Subscriber>(
            r#"
            SELECT phone_number, notification_threshold, subscribed, created_at
            FROM subscribers
            ORDER BY rowid
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(subscribers)
    }

    pub async fn get(&self, phone: &str) -> Result<Option<Subscriber>> {
        let phone = validate_phone(phone)?;

        let subscriber = sqlx::query_as::<_, Subscriber>(
            "SELECT phone_number, notification_threshold, subscribed, created_at FROM subscribers WHERE phone_number = ?",
        )
        .bind(phone)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(subscriber)
    }

    pub async fn count_active(&self) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM subscribers WHERE subscribed = 1")
                .fetch_one(self.db.pool())
                .await?;

        Ok(count)
    }
}

fn validate_phone(phone: &str) -> Result<&str> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(StoreError::Validation("phone number must not be empty".into()));
    }
    Ok(phone)
}

fn validate_threshold(threshold: f64) -> Result<()> {
    if !threshold.is_finite() || threshold <= 0.0 {
        return Err(StoreError::Validation(format!(
            "notification threshold must be a positive number, got {}",
            threshold
        )));
    }
    Ok(())
}
