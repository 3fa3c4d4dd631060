use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use tracing::debug;

use crate::error::{AppError, AppResult};

/// Remote file store boundary: resolve a catalog remote_file_ref to the
/// asset bytes. Chunking and progress are implementation detail, not
/// part of the contract.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch(&self, remote_ref: &str) -> AppResult<Bytes>;
}

/// HTTP-backed remote store client
pub struct HttpRemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemoteStore {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, remote_ref: &str) -> AppResult<Bytes> {
        let url = format!("{}/{}", self.base_url, remote_ref);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::Store(format!(
                "fetch {} returned {}",
                remote_ref,
                response.status()
            )));
        }

        let total = response.content_length();
        let mut stream = response.bytes_stream();
        let mut buf = BytesMut::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            buf.extend_from_slice(&chunk);
            if let Some(total) = total {
                debug!(
                    remote_ref,
                    progress = format!("{}%", buf.len() as u64 * 100 / total.max(1)),
                    "download progress"
                );
            }
        }

        debug!(remote_ref, bytes = buf.len(), "download complete");
        Ok(buf.freeze())
    }
}
