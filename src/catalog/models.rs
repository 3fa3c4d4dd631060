use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, Type};
use std::fmt;
use uuid::Uuid;

/// Media kind of a deliverable asset; picks the transport method only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "media_kind", rename_all = "lowercase")]
pub enum MediaKind {
    Document,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Document => "document",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "document" => Some(MediaKind::Document),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Content item - catalog metadata for one deliverable asset
///
/// `name` is unique case-insensitively; `remote_file_ref` identifies the
/// asset in the remote file store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentItem {
    pub content_id: Uuid,
    pub name: String,
    pub remote_file_ref: String,
    pub media_kind: MediaKind,
    pub uploaded_at: DateTime<Utc>,
}
