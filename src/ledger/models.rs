use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Payment lifecycle status
///
/// pending → completed happens externally (payment-provider callback),
/// completed → delivered only through the delivery executor, and
/// pending → expired through the janitor task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Delivered,
    Expired,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Delivered => "delivered",
            PaymentStatus::Expired => "expired",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment entity - one purchase and its fulfillment state
///
/// INVARIANT: content_id is non-null iff status = delivered. The only
/// writer of that pair is PaymentLedger::mark_delivered.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: String,
    pub user_id: i64,
    /// Minor units (cents)
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub content_id: Option<Uuid>,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Eligible for delivery: paid for but not yet fulfilled
    pub fn is_deliverable(&self) -> bool {
        self.status == PaymentStatus::Completed && self.content_id.is_none()
    }
}

/// User entity, read-only from this service
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserInfo {
    pub user_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserInfo {
    /// Display handle for operator notifications
    pub fn display_name(&self) -> String {
        match &self.username {
            Some(name) if !name.is_empty() => format!("@{}", name),
            _ => format!("User {}", self.user_id),
        }
    }
}
