pub mod models;
pub mod repository;

pub use models::{ContentItem, MediaKind};
pub use repository::{CatalogRepository, ContentCatalog};
