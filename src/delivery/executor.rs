use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::catalog::ContentCatalog;
use crate::error::{AppResult, DeliveryError};
use crate::ledger::{PaymentLedger, PaymentStatus};
use crate::store::RemoteStore;
use crate::transport::MessageTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeStatus {
    Success,
    Failed,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Success => "success",
            OutcomeStatus::Failed => "error",
        }
    }
}

/// Per-item batch result, aggregated by the scheduler and exportable;
/// not durable state.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryOutcome {
    pub payment_id: String,
    pub user_id: i64,
    pub content_id: Option<Uuid>,
    pub content_name: Option<String>,
    pub status: OutcomeStatus,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn success(payment_id: String, user_id: i64, content_id: Uuid, name: String) -> Self {
        Self {
            payment_id,
            user_id,
            content_id: Some(content_id),
            content_name: Some(name),
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    pub fn failed(payment_id: String, user_id: i64, error: String) -> Self {
        Self {
            payment_id,
            user_id,
            content_id: None,
            content_name: None,
            status: OutcomeStatus::Failed,
            error: Some(error),
        }
    }
}

/// Performs the side-effecting delivery sequence. The only component
/// allowed to move a payment to `delivered`.
pub struct DeliveryExecutor {
    ledger: Arc<dyn PaymentLedger>,
    catalog: Arc<dyn ContentCatalog>,
    store: Arc<dyn RemoteStore>,
    transport: Arc<dyn MessageTransport>,
    operator_id: i64,
}

impl DeliveryExecutor {
    pub fn new(
        ledger: Arc<dyn PaymentLedger>,
        catalog: Arc<dyn ContentCatalog>,
        store: Arc<dyn RemoteStore>,
        transport: Arc<dyn MessageTransport>,
        operator_id: i64,
    ) -> Self {
        Self {
            ledger,
            catalog,
            store,
            transport,
            operator_id,
        }
    }

    /// Fetch, transmit, write back, then best-effort notify.
    ///
    /// Failure policy per step:
    /// - preconditions: fail fast, zero side effects
    /// - fetch / transmit: fatal to this item, no ledger mutation, the
    ///   payment stays `completed` and retries on the next cycle
    /// - write-back: the content was already sent; surfaced as
    ///   DeliveryError::WriteBack at error severity since a retry will
    ///   resend
    /// - notification: never affects the returned result
    pub async fn deliver(&self, payment_id: &str, content_id: Uuid) -> AppResult<()> {
        let payment = self
            .ledger
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| DeliveryError::PaymentNotFound(payment_id.to_string()))?;

        if payment.status != PaymentStatus::Completed {
            return Err(DeliveryError::PaymentNotCompleted {
                payment_id: payment_id.to_string(),
                status: payment.status,
            }
            .into());
        }

        let item = self
            .catalog
            .lookup_by_id(content_id)
            .await?
            .ok_or(DeliveryError::ContentNotFound(content_id))?;

        // Step 1: fetch the full asset before anything is sent, so the
        // user never receives a partial artifact.
        let data = self
            .store
            .fetch(&item.remote_file_ref)
            .await
            .map_err(|e| DeliveryError::Fetch {
                remote_ref: item.remote_file_ref.clone(),
                message: e.to_string(),
            })?;

        // Step 2: transmit
        let caption = format!("Here is your requested content: *{}*", item.name);
        let filename = format!("{}.{}", item.name, item.media_kind);
        self.transport
            .send_content(payment.user_id, data, item.media_kind, &caption, &filename)
            .await
            .map_err(|e| DeliveryError::Transmit {
                user_id: payment.user_id,
                message: e.to_string(),
            })?;

        // Step 3: write-back, only after the send is confirmed
        if let Err(e) = self.ledger.mark_delivered(payment_id, content_id).await {
            error!(
                payment_id,
                %content_id,
                error = %e,
                "content transmitted but ledger write-back failed; retry will resend"
            );
            return Err(DeliveryError::WriteBack {
                payment_id: payment_id.to_string(),
                message: e.to_string(),
            }
            .into());
        }

        info!(
            payment_id,
            user_id = payment.user_id,
            content = %item.name,
            "delivery completed"
        );

        // Step 4: best-effort operator notification
        let username = match self.ledger.get_user_info(payment.user_id).await {
            Ok(Some(user)) => user.display_name(),
            _ => format!("User {}", payment.user_id),
        };
        let text = format!(
            "✅ Automatically delivered '{}' to {} (Payment: {})",
            item.name, username, payment_id
        );
        if let Err(e) = self.transport.notify(self.operator_id, &text).await {
            warn!(payment_id, error = %e, "could not send operator notification");
        }

        Ok(())
    }
}
