use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::models::{ContentItem, MediaKind};
use crate::error::{AppResult, CatalogError};

/// Catalog contract - read side used by the matcher and executor,
/// create used by the content-import path.
///
/// Lookups return None / an empty Vec for absent rows; callers decide
/// whether absence is an error at their own boundary.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Case-insensitive exact name match
    async fn lookup_by_exact_name(&self, name: &str) -> AppResult<Option<ContentItem>>;

    async fn lookup_by_id(&self, content_id: Uuid) -> AppResult<Option<ContentItem>>;

    /// Most recently uploaded first
    async fn list_recent(&self, limit: i64) -> AppResult<Vec<ContentItem>>;

    /// Case-insensitive substring filter, most recent first
    async fn search(&self, term: &str, limit: i64) -> AppResult<Vec<ContentItem>>;

    /// Register a new asset; fails with CatalogError::NameTaken when the
    /// name (case-insensitively) already exists.
    async fn create(&self, name: &str, remote_ref: &str, kind: MediaKind) -> AppResult<Uuid>;
}

/// Postgres-backed content catalog
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentCatalog for CatalogRepository {
    async fn lookup_by_exact_name(&self, name: &str) -> AppResult<Option<ContentItem>> {
        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT content_id, name, remote_file_ref, media_kind, uploaded_at
            FROM content_library
            WHERE LOWER(name) = LOWER($1)
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(CatalogError::Database)?;

        Ok(item)
    }

    async fn lookup_by_id(&self, content_id: Uuid) -> AppResult<Option<ContentItem>> {
        let item = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT content_id, name, remote_file_ref, media_kind, uploaded_at
            FROM content_library
            WHERE content_id = $1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(CatalogError::Database)?;

        Ok(item)
    }

    async fn list_recent(&self, limit: i64) -> AppResult<Vec<ContentItem>> {
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT content_id, name, remote_file_ref, media_kind, uploaded_at
            FROM content_library
            ORDER BY uploaded_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(CatalogError::Database)?;

        Ok(items)
    }

    async fn search(&self, term: &str, limit: i64) -> AppResult<Vec<ContentItem>> {
        let pattern = format!("%{}%", term);
        let items = sqlx::query_as::<_, ContentItem>(
            r#"
            SELECT content_id, name, remote_file_ref, media_kind, uploaded_at
            FROM content_library
            WHERE LOWER(name) LIKE LOWER($1)
            ORDER BY uploaded_at DESC
            LIMIT $2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(CatalogError::Database)?;

        Ok(items)
    }

    async fn create(&self, name: &str, remote_ref: &str, kind: MediaKind) -> AppResult<Uuid> {
        let content_id = Uuid::new_v4();

        let result = sqlx::query(
            r#"
            INSERT INTO content_library (content_id, name, remote_file_ref, media_kind)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(content_id)
        .bind(name)
        .bind(remote_ref)
        .bind(kind)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(%content_id, name, "content added to library");
                Ok(content_id)
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(CatalogError::NameTaken(name.to_string()).into())
            }
            Err(e) => Err(CatalogError::Database(e).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::testutil::{content, MemoryCatalog};
    use crate::error::AppError;

    #[tokio::test]
    async fn created_item_round_trips_by_id_and_name() {
        let catalog = MemoryCatalog::default();
        let id = catalog
            .create("Movie B", "ref-movie-b", MediaKind::Video)
            .await
            .unwrap();

        let by_id = catalog.lookup_by_id(id).await.unwrap().unwrap();
        assert_eq!(by_id.content_id, id);
        assert_eq!(by_id.name, "Movie B");
        assert_eq!(by_id.remote_file_ref, "ref-movie-b");
        assert_eq!(by_id.media_kind, MediaKind::Video);

        // name lookup is case-insensitive and returns the same row
        let by_name = catalog
            .lookup_by_exact_name("movie b")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.content_id, by_id.content_id);
        assert_eq!(by_name.name, by_id.name);
        assert_eq!(by_name.remote_file_ref, by_id.remote_file_ref);
        assert_eq!(by_name.media_kind, by_id.media_kind);
        assert_eq!(by_name.uploaded_at, by_id.uploaded_at);
    }

    #[tokio::test]
    async fn absent_rows_come_back_as_none() {
        let catalog = MemoryCatalog::default();
        assert!(catalog.lookup_by_id(Uuid::new_v4()).await.unwrap().is_none());
        assert!(catalog
            .lookup_by_exact_name("Movie B")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected_case_insensitively() {
        let catalog = MemoryCatalog::default();
        catalog
            .create("Movie B", "ref-1", MediaKind::Document)
            .await
            .unwrap();

        let err = catalog
            .create("MOVIE B", "ref-2", MediaKind::Document)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Catalog(CatalogError::NameTaken(_))
        ));

        // the original row is untouched
        let kept = catalog
            .lookup_by_exact_name("Movie B")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kept.remote_file_ref, "ref-1");
    }

    #[tokio::test]
    async fn search_filters_substring_most_recent_first() {
        let catalog = MemoryCatalog::default();
        catalog.insert(content("Movie A", 9));
        catalog.insert(content("Movie B", 10));
        catalog.insert(content("Series One", 11));

        let hits = catalog.search("movie", 10).await.unwrap();
        let names: Vec<&str> = hits.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Movie B", "Movie A"]);

        // limit truncates after ordering
        let capped = catalog.search("movie", 1).await.unwrap();
        assert_eq!(capped[0].name, "Movie B");

        assert!(catalog.search("audiobook", 10).await.unwrap().is_empty());
    }
}
