use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::catalog::{ContentCatalog, ContentItem};
use crate::error::AppResult;
use crate::ledger::Payment;

/// Minimum keyword score for a match to be accepted
pub const ACCEPT_THRESHOLD: f64 = 40.0;

/// Catalog snapshot size taken at decision time
const SNAPSHOT_LIMIT: i64 = 1000;

/// Named content-selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStrategy {
    Recent,
    Keyword,
    Popular,
    RoundRobin,
}

impl MatchStrategy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "recent" => Some(MatchStrategy::Recent),
            "keyword" => Some(MatchStrategy::Keyword),
            "popular" => Some(MatchStrategy::Popular),
            "round-robin" | "roundrobin" => Some(MatchStrategy::RoundRobin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::Recent => "recent",
            MatchStrategy::Keyword => "keyword",
            MatchStrategy::Popular => "popular",
            MatchStrategy::RoundRobin => "round-robin",
        }
    }

    /// The strategy actually executed. popular and round-robin have no
    /// delivery-history ranking behind them and resolve to recent; the
    /// degradation is announced once at bootstrap, never silently here.
    pub fn effective(&self) -> MatchStrategy {
        match self {
            MatchStrategy::Popular | MatchStrategy::RoundRobin => MatchStrategy::Recent,
            other => *other,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.effective() != *self
    }

    /// True when the strategy can only match against a free-text hint.
    /// The payment ledger carries no hint column, so the batch loop has
    /// none to pass and every item is a no-match.
    pub fn requires_hint(&self) -> bool {
        self.effective() == MatchStrategy::Keyword
    }
}

/// Scored candidate, not persisted
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub content_id: Uuid,
    pub name: String,
    pub score: f64,
}

/// Decides which content item a payment gets.
///
/// Pure modulo the catalog snapshot taken per call: no state is mutated
/// and repeated calls over the same snapshot return the same item.
pub struct Matcher {
    catalog: Arc<dyn ContentCatalog>,
    strategy: MatchStrategy,
}

impl Matcher {
    pub fn new(catalog: Arc<dyn ContentCatalog>, strategy: MatchStrategy) -> Self {
        Self { catalog, strategy }
    }

    pub fn strategy(&self) -> MatchStrategy {
        self.strategy
    }

    /// Exactly one item or a definitive no-match; never partial.
    ///
    /// Under the keyword strategy a payment without a hint is a
    /// no-match: the ledger schema carries no request text to score.
    pub async fn select(
        &self,
        payment: &Payment,
        hint: Option<&str>,
    ) -> AppResult<Option<ContentItem>> {
        let snapshot = self.catalog.list_recent(SNAPSHOT_LIMIT).await?;

        let selected = match self.strategy.effective() {
            MatchStrategy::Keyword => match hint {
                Some(h) => select_keyword(&snapshot, h).and_then(|result| {
                    debug!(
                        payment_id = %payment.payment_id,
                        hint = h,
                        name = %result.name,
                        score = result.score,
                        "keyword match accepted"
                    );
                    snapshot
                        .iter()
                        .find(|i| i.content_id == result.content_id)
                        .cloned()
                }),
                None => {
                    debug!(payment_id = %payment.payment_id, "no hint for keyword strategy");
                    None
                }
            },
            _ => select_recent(&snapshot),
        };

        Ok(selected)
    }
}

/// Most recently uploaded item; equal timestamps break toward the
/// lexicographically smaller content_id so the choice is a total order.
pub fn select_recent(items: &[ContentItem]) -> Option<ContentItem> {
    items
        .iter()
        .max_by(|a, b| {
            a.uploaded_at
                .cmp(&b.uploaded_at)
                .then_with(|| b.content_id.cmp(&a.content_id))
        })
        .cloned()
}

/// Keyword score of a free-text hint against an item name, in [0, 100]:
/// 100 for case-insensitive equality, 80 when every hint token is a
/// substring of the name, else (matched / total) * 60.
pub fn score_hint(hint: &str, name: &str) -> f64 {
    let hint_lower = hint.to_lowercase();
    let name_lower = name.to_lowercase();

    if hint_lower == name_lower {
        return 100.0;
    }

    let tokens: Vec<&str> = hint_lower.split_whitespace().collect();
    if tokens.is_empty() {
        return 0.0;
    }

    let matched = tokens
        .iter()
        .filter(|token| name_lower.contains(**token))
        .count();

    if matched == tokens.len() {
        80.0
    } else {
        (matched as f64 / tokens.len() as f64) * 60.0
    }
}

/// Highest-scoring item at or above the acceptance threshold. Ties keep
/// the first-seen item in catalog order (strictly-greater comparison).
pub fn select_keyword(items: &[ContentItem], hint: &str) -> Option<MatchResult> {
    let mut best: Option<(&ContentItem, f64)> = None;

    for item in items {
        let score = score_hint(hint, &item.name);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((item, score));
        }
    }

    match best {
        Some((item, score)) if score >= ACCEPT_THRESHOLD => Some(MatchResult {
            content_id: item.content_id,
            name: item.name.clone(),
            score,
        }),
        _ => None,
    }
}
