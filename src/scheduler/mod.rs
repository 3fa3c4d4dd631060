//! Fulfillment scheduler: the long-running control loop that discovers
//! completed-but-undelivered payments and feeds them through matcher
//! and executor, one item at a time.
//!
//! One scheduler instance per ledger: nothing at the application layer
//! locks pending payments, so two concurrent instances could pick the
//! same payment and double-deliver.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::delivery::{DeliveryExecutor, DeliveryOutcome};
use crate::error::AppResult;
use crate::ledger::{Payment, PaymentLedger};
use crate::matcher::Matcher;
use crate::report;

/// Ceiling for exponential backoff
const MAX_BACKOFF_SECS: f64 = 3600.0;

/// Cooldown after a loop-level error in fixed mode
const FIXED_COOLDOWN: Duration = Duration::from_secs(60);

/// How the loop waits after a loop-level (uncaught) error. Item-level
/// delivery failures are expected and never escalate to backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffMode {
    Fixed,
    Exponential,
}

impl BackoffMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fixed" => Some(BackoffMode::Fixed),
            "exponential" => Some(BackoffMode::Exponential),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BackoffMode::Fixed => "fixed",
            BackoffMode::Exponential => "exponential",
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Wait between cycles
    pub poll_interval: Duration,
    pub backoff: BackoffMode,
    /// When set, each non-empty batch writes a results file here
    pub export_dir: Option<PathBuf>,
}

/// Fulfillment scheduler - coordinates the poll / process / sleep loop
pub struct FulfillmentScheduler {
    config: SchedulerConfig,
    ledger: Arc<dyn PaymentLedger>,
    matcher: Matcher,
    executor: Arc<DeliveryExecutor>,
    processed_total: u64,
    error_total: u64,
}

impl FulfillmentScheduler {
    pub fn new(
        config: SchedulerConfig,
        ledger: Arc<dyn PaymentLedger>,
        matcher: Matcher,
        executor: Arc<DeliveryExecutor>,
    ) -> Self {
        Self {
            config,
            ledger,
            matcher,
            executor,
            processed_total: 0,
            error_total: 0,
        }
    }

    /// Run the loop in the background until the token is cancelled
    pub fn start(self, ct: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(ct))
    }

    /// Main loop. Cancellation is observed at the top of each cycle,
    /// between batch items and during every sleep; the in-flight item
    /// always finishes.
    pub async fn run(mut self, ct: CancellationToken) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            backoff = self.config.backoff.as_str(),
            "fulfillment scheduler started"
        );

        let mut retry_count: u32 = 0;

        loop {
            if ct.is_cancelled() {
                break;
            }

            match self.run_cycle(&ct).await {
                Ok((success, errors)) => {
                    // item-level failures are handled work, not loop errors
                    retry_count = 0;
                    self.processed_total += u64::from(success);
                    self.error_total += u64::from(errors);
                    info!(
                        total_processed = self.processed_total,
                        total_errors = self.error_total,
                        "next check in {} seconds",
                        self.config.poll_interval.as_secs()
                    );
                    if sleep_or_cancelled(&ct, self.config.poll_interval).await {
                        break;
                    }
                }
                Err(e) => {
                    error!(error = %e, retry_count, "unexpected error in fulfillment cycle");
                    let wait = match self.config.backoff {
                        BackoffMode::Fixed => FIXED_COOLDOWN,
                        BackoffMode::Exponential => {
                            let delay = backoff_delay(retry_count);
                            retry_count += 1;
                            delay
                        }
                    };
                    info!("waiting {:.0} seconds before retry", wait.as_secs_f64());
                    if sleep_or_cancelled(&ct, wait).await {
                        break;
                    }
                }
            }
        }

        info!("fulfillment scheduler stopped");
    }

    /// One fulfillment cycle: read the pending set (oldest request
    /// first) and process it sequentially. One item's failure never
    /// stops iteration over the rest.
    async fn run_cycle(&self, ct: &CancellationToken) -> AppResult<(u32, u32)> {
        let pending = self.ledger.list_completed_undelivered().await?;

        if pending.is_empty() {
            info!("no pending deliveries found");
            return Ok((0, 0));
        }

        info!(count = pending.len(), "found pending deliveries");

        let mut outcomes = Vec::with_capacity(pending.len());
        let mut success = 0u32;
        let mut errors = 0u32;

        for payment in &pending {
            if ct.is_cancelled() {
                info!("shutdown requested, leaving remaining items for the next run");
                break;
            }

            let outcome = self.process_item(payment).await;
            match outcome.error {
                None => success += 1,
                Some(_) => errors += 1,
            }
            outcomes.push(outcome);
        }

        info!(success, errors, "cycle processed");

        if let Some(dir) = &self.config.export_dir {
            if !outcomes.is_empty() {
                match report::write_report(dir, &outcomes) {
                    Ok(path) => info!(path = %path.display(), "batch results exported"),
                    Err(e) => warn!(error = %e, "could not export batch results"),
                }
            }
        }

        Ok((success, errors))
    }

    async fn process_item(&self, payment: &Payment) -> DeliveryOutcome {
        info!(
            payment_id = %payment.payment_id,
            user_id = payment.user_id,
            "processing payment"
        );

        let item = match self.matcher.select(payment, None).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                warn!(
                    payment_id = %payment.payment_id,
                    strategy = self.matcher.strategy().as_str(),
                    "could not determine content to deliver"
                );
                return DeliveryOutcome::failed(
                    payment.payment_id.clone(),
                    payment.user_id,
                    "Could not determine content to deliver".to_string(),
                );
            }
            Err(e) => {
                warn!(payment_id = %payment.payment_id, error = %e, "matcher failed");
                return DeliveryOutcome::failed(
                    payment.payment_id.clone(),
                    payment.user_id,
                    e.to_string(),
                );
            }
        };

        match self
            .executor
            .deliver(&payment.payment_id, item.content_id)
            .await
        {
            Ok(()) => DeliveryOutcome::success(
                payment.payment_id.clone(),
                payment.user_id,
                item.content_id,
                item.name,
            ),
            Err(e) => {
                warn!(payment_id = %payment.payment_id, error = %e, "delivery failed");
                DeliveryOutcome::failed(payment.payment_id.clone(), payment.user_id, e.to_string())
            }
        }
    }
}

/// Sleep that returns true when interrupted by cancellation
async fn sleep_or_cancelled(ct: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = ct.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

/// Backoff base for the nth consecutive loop-level error:
/// min(60 * 2^n, 3600) seconds.
pub fn base_backoff_secs(retry_count: u32) -> f64 {
    (60.0 * 2f64.powi(retry_count.min(16) as i32)).min(MAX_BACKOFF_SECS)
}

/// Base backoff with ± 10% jitter applied
pub fn backoff_delay(retry_count: u32) -> Duration {
    let base = base_backoff_secs(retry_count);
    let jitter = base * 0.1;
    let wait = base + rand::rng().random_range(-jitter..=jitter);
    Duration::from_secs_f64(wait.max(0.0))
}
