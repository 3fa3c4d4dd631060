//! In-memory fakes for the collaborator traits, shared by the executor
//! and scheduler tests. The ledger fake mirrors the compare-and-set
//! predicate of the SQL mark_delivered.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::catalog::{ContentCatalog, ContentItem, MediaKind};
use crate::error::{AppError, AppResult, CatalogError, DeliveryError};
use crate::ledger::{Payment, PaymentLedger, PaymentStatus, UserInfo};
use crate::store::RemoteStore;
use crate::transport::MessageTransport;

pub fn payment(payment_id: &str, user_id: i64, status: PaymentStatus) -> Payment {
    payment_at(payment_id, user_id, status, Utc::now())
}

pub fn payment_at(
    payment_id: &str,
    user_id: i64,
    status: PaymentStatus,
    requested_at: DateTime<Utc>,
) -> Payment {
    Payment {
        payment_id: payment_id.to_string(),
        user_id,
        amount: 1500,
        currency: "USD".to_string(),
        status,
        content_id: None,
        requested_at,
        completed_at: None,
    }
}

pub fn content(name: &str, hour: u32) -> ContentItem {
    ContentItem {
        content_id: Uuid::new_v4(),
        name: name.to_string(),
        remote_file_ref: format!("ref-{}", name),
        media_kind: MediaKind::Document,
        uploaded_at: Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap(),
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    payments: Mutex<HashMap<String, Payment>>,
    users: Mutex<HashMap<i64, UserInfo>>,
    fail_next_mark: AtomicBool,
    fail_next_list: AtomicBool,
}

impl MemoryLedger {
    pub fn insert(&self, payment: Payment) {
        self.payments
            .lock()
            .unwrap()
            .insert(payment.payment_id.clone(), payment);
    }

    pub fn insert_user(&self, user: UserInfo) {
        self.users.lock().unwrap().insert(user.user_id, user);
    }

    pub fn get(&self, payment_id: &str) -> Payment {
        self.payments
            .lock()
            .unwrap()
            .get(payment_id)
            .cloned()
            .expect("payment present")
    }

    pub fn fail_next_mark(&self) {
        self.fail_next_mark.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_list(&self) {
        self.fail_next_list.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentLedger for MemoryLedger {
    async fn list_completed_undelivered(&self) -> AppResult<Vec<Payment>> {
        if self.fail_next_list.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("ledger unavailable".to_string()));
        }
        let mut pending: Vec<Payment> = self
            .payments
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.is_deliverable())
            .cloned()
            .collect();
        pending.sort_by(|a, b| a.requested_at.cmp(&b.requested_at));
        Ok(pending)
    }

    async fn get_payment(&self, payment_id: &str) -> AppResult<Option<Payment>> {
        Ok(self.payments.lock().unwrap().get(payment_id).cloned())
    }

    async fn mark_delivered(&self, payment_id: &str, content_id: Uuid) -> AppResult<()> {
        if self.fail_next_mark.swap(false, Ordering::SeqCst) {
            return Err(AppError::Internal("ledger unavailable".to_string()));
        }
        let mut payments = self.payments.lock().unwrap();
        match payments.get_mut(payment_id) {
            Some(p) if p.is_deliverable() => {
                p.status = PaymentStatus::Delivered;
                p.content_id = Some(content_id);
                Ok(())
            }
            _ => Err(DeliveryError::WriteBack {
                payment_id: payment_id.to_string(),
                message: "payment no longer in completed-and-unlinked state".to_string(),
            }
            .into()),
        }
    }

    async fn get_user_info(&self, user_id: i64) -> AppResult<Option<UserInfo>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }
}

#[derive(Default)]
pub struct MemoryCatalog {
    items: Mutex<Vec<ContentItem>>,
}

impl MemoryCatalog {
    pub fn insert(&self, item: ContentItem) {
        self.items.lock().unwrap().push(item);
    }
}

#[async_trait]
impl ContentCatalog for MemoryCatalog {
    async fn lookup_by_exact_name(&self, name: &str) -> AppResult<Option<ContentItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn lookup_by_id(&self, content_id: Uuid) -> AppResult<Option<ContentItem>> {
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.content_id == content_id)
            .cloned())
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<ContentItem>> {
        let mut items = self.items.lock().unwrap().clone();
        items.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn search(&self, term: &str, limit: i64) -> AppResult<Vec<ContentItem>> {
        let term = term.to_lowercase();
        let mut items: Vec<ContentItem> = self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.name.to_lowercase().contains(&term))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        items.truncate(limit as usize);
        Ok(items)
    }

    async fn create(&self, name: &str, remote_ref: &str, kind: MediaKind) -> AppResult<Uuid> {
        let mut items = self.items.lock().unwrap();
        if items.iter().any(|i| i.name.eq_ignore_ascii_case(name)) {
            return Err(CatalogError::NameTaken(name.to_string()).into());
        }
        let content_id = Uuid::new_v4();
        items.push(ContentItem {
            content_id,
            name: name.to_string(),
            remote_file_ref: remote_ref.to_string(),
            media_kind: kind,
            uploaded_at: Utc::now(),
        });
        Ok(content_id)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    fetches: AtomicUsize,
    fail_next: AtomicBool,
}

impl MemoryStore {
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch(&self, _remote_ref: &str) -> AppResult<Bytes> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(AppError::Store("remote store unavailable".to_string()));
        }
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from_static(b"asset-bytes"))
    }
}

#[derive(Default)]
pub struct MemoryTransport {
    sent: Mutex<Vec<(i64, String)>>,
    notifications: Mutex<Vec<(i64, String)>>,
    fail_next_send: AtomicBool,
    fail_next_notify: AtomicBool,
}

impl MemoryTransport {
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn notify_count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }

    pub fn last_notification(&self) -> Option<String> {
        self.notifications
            .lock()
            .unwrap()
            .last()
            .map(|(_, text)| text.clone())
    }

    pub fn fail_next_send(&self) {
        self.fail_next_send.store(true, Ordering::SeqCst);
    }

    pub fn fail_next_notify(&self) {
        self.fail_next_notify.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send_content(
        &self,
        user_id: i64,
        _data: Bytes,
        _kind: MediaKind,
        _caption: &str,
        filename: &str,
    ) -> AppResult<()> {
        if self.fail_next_send.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transport("transport unavailable".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((user_id, filename.to_string()));
        Ok(())
    }

    async fn notify(&self, operator_id: i64, text: &str) -> AppResult<()> {
        if self.fail_next_notify.swap(false, Ordering::SeqCst) {
            return Err(AppError::Transport("transport unavailable".to_string()));
        }
        self.notifications
            .lock()
            .unwrap()
            .push((operator_id, text.to_string()));
        Ok(())
    }
}
