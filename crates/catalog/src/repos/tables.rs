//! Logical table registry.

use crate::error::CatalogResult;
use crate::models::TableRow;
use async_trait::async_trait;
use tabula_core::{NormalizedColumn, SiteScope};

/// Repository binding sites to physical tables.
///
/// A physical table is tracked by at most one logical table row. Creating
/// and deleting a logical table touch the physical table and the registry
/// in one transaction.
#[async_trait]
pub trait TableRepo: Send + Sync {
    /// Resolve a table reference within a scope.
    ///
    /// The shared scope matches the physical name case-insensitively across
    /// every site; a site scope requires both the owner and an exact match.
    async fn find_table(&self, scope: SiteScope, table_ref: &str)
    -> CatalogResult<Option<TableRow>>;

    /// Get a logical table by its exact physical name, regardless of site.
    async fn get_table(&self, table_id: &str) -> CatalogResult<Option<TableRow>>;

    /// Provision a new physical table with a fresh identifier and register it.
    ///
    /// The table always starts with the engine-owned `id` primary key
    /// followed by `columns` in order.
    async fn create_table(
        &self,
        site_id: i64,
        display_name: &str,
        columns: &[NormalizedColumn],
    ) -> CatalogResult<TableRow>;

    /// Register an existing, untracked physical table under a site.
    async fn associate_table(&self, site_id: i64, physical_name: &str) -> CatalogResult<TableRow>;

    /// Change the display name of a logical table.
    async fn rename_table(&self, table_id: &str, display_name: &str) -> CatalogResult<()>;

    /// Remove a logical table and drop its physical table.
    ///
    /// Reserved names are refused before anything is touched.
    async fn delete_table(&self, table_id: &str) -> CatalogResult<TableRow>;

    /// List a site's logical tables ordered by creation.
    async fn list_tables(&self, site_id: i64) -> CatalogResult<Vec<TableRow>>;

    /// List every physical table in the database, excluding backend internals.
    async fn list_physical_tables(&self) -> CatalogResult<Vec<String>>;

    /// List physical tables that are neither reserved nor tracked by any site.
    async fn list_unassociated_tables(&self) -> CatalogResult<Vec<String>>;
}
