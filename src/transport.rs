use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde_json::json;
use tracing::debug;

use crate::catalog::MediaKind;
use crate::error::{AppError, AppResult};

/// Messaging transport boundary: deliver asset bytes to a user and send
/// plain-text operator notifications.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send the asset to the user; media kind picks the transport
    /// method, not the semantics.
    async fn send_content(
        &self,
        user_id: i64,
        data: Bytes,
        kind: MediaKind,
        caption: &str,
        filename: &str,
    ) -> AppResult<()>;

    /// Best-effort operator message; callers treat failures as
    /// non-fatal.
    async fn notify(&self, operator_id: i64, text: &str) -> AppResult<()>;
}

/// Bot-API transport: multipart file upload per chat, JSON for text
pub struct BotApiTransport {
    client: reqwest::Client,
    api_url: String,
}

impl BotApiTransport {
    pub fn new(api_url: String, token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/{}", self.api_url, method)
    }
}

#[async_trait]
impl MessageTransport for BotApiTransport {
    async fn send_content(
        &self,
        user_id: i64,
        data: Bytes,
        kind: MediaKind,
        caption: &str,
        filename: &str,
    ) -> AppResult<()> {
        let (method, field) = match kind {
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Document => ("sendDocument", "document"),
        };

        let part = Part::bytes(data.to_vec()).file_name(filename.to_string());
        let form = Form::new()
            .text("chat_id", user_id.to_string())
            .text("caption", caption.to_string())
            .text("parse_mode", "Markdown")
            .part(field.to_string(), part);

        let response = self
            .client
            .post(self.endpoint(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("{} failed: {}", method, e)))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "{} to user {} returned {}",
                method,
                user_id,
                response.status()
            )));
        }

        debug!(user_id, method, filename, "content transmitted");
        Ok(())
    }

    async fn notify(&self, operator_id: i64, text: &str) -> AppResult<()> {
        let response = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&json!({ "chat_id": operator_id, "text": text }))
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("sendMessage failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "sendMessage returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
