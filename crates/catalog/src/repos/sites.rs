//! Site repository.

use crate::error::CatalogResult;
use crate::models::SiteRow;
use async_trait::async_trait;

/// Repository for site operations.
#[async_trait]
pub trait SiteRepo: Send + Sync {
    /// Create a new active site.
    async fn create_site(&self, name: &str) -> CatalogResult<SiteRow>;

    /// Get a site by ID.
    async fn get_site(&self, site_id: i64) -> CatalogResult<Option<SiteRow>>;

    /// List all sites ordered by ID.
    async fn list_sites(&self) -> CatalogResult<Vec<SiteRow>>;
}
