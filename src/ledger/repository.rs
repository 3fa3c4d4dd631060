use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{Payment, UserInfo};
use crate::error::{AppResult, DeliveryError};

/// Ledger contract the pipeline is built against
///
/// Every access is a self-contained statement; no transaction is held
/// across a fetch or transmit await.
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// All payments with status = completed and no linked content,
    /// oldest request first so nothing is starved behind newer arrivals.
    async fn list_completed_undelivered(&self) -> AppResult<Vec<Payment>>;

    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<Payment>>;

    /// Atomically link content and flip completed → delivered.
    ///
    /// Compare-and-set: fails with DeliveryError::WriteBack if the
    /// payment is no longer in the completed-and-unlinked state, so a
    /// racing second attempt cannot double-confirm.
    async fn mark_delivered(&self, payment_id: &str, content_id: Uuid) -> AppResult<()>;

    async fn get_user_info(&self, user_id: i64) -> AppResult<Option<UserInfo>>;
}

/// Postgres-backed ledger - the source of truth for payment state
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Janitor write: expire pending payments past the configured horizon
    pub async fn expire_overdue_pending(&self, expiry_hours: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::hours(expiry_hours);
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'expired'
            WHERE status = 'pending' AND requested_at < $1
            "#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PaymentLedger for PaymentRepository {
    async fn list_completed_undelivered(&self) -> AppResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, amount, currency, status, content_id,
                   requested_at, completed_at
            FROM payments
            WHERE status = 'completed' AND content_id IS NULL
            ORDER BY requested_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<Payment>> {
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            SELECT payment_id, user_id, amount, currency, status, content_id,
                   requested_at, completed_at
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn mark_delivered(&self, payment_id: &str, content_id: Uuid) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET content_id = $2, status = 'delivered'
            WHERE payment_id = $1 AND status = 'completed' AND content_id IS NULL
            "#,
        )
        .bind(payment_id)
        .bind(content_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DeliveryError::WriteBack {
                payment_id: payment_id.to_string(),
                message: "payment no longer in completed-and-unlinked state".to_string(),
            }
            .into());
        }

        info!(payment_id, %content_id, "payment marked delivered");
        Ok(())
    }

    async fn get_user_info(&self, user_id: i64) -> AppResult<Option<UserInfo>> {
        let user = sqlx::query_as::<_, UserInfo>(
            r#"
            SELECT user_id, username, first_name, last_name
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
