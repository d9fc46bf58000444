//! Physical schema introspection and alteration.

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use tabula_core::{PhysicalColumn, SchemaOp};

/// Repository for physical table structure.
#[async_trait]
pub trait SchemaRepo: Send + Sync {
    /// Introspect a physical table's columns in table order.
    ///
    /// Returns `NotFound` when the table does not exist.
    async fn describe_table(&self, table_id: &str) -> CatalogResult<Vec<PhysicalColumn>>;

    /// Apply one schema operation as an independent unit of work.
    async fn apply_schema_op(&self, table_id: &str, op: &SchemaOp) -> CatalogResult<()>;
}

/// Apply operations in order, stopping at the first failure.
///
/// Operations already applied stay applied. A failure after at least one
/// success is reported as [`CatalogError::PartialFailure`] naming both the
/// failed operation and the ones that went through.
pub async fn apply_schema_ops<S>(
    store: &S,
    table_id: &str,
    ops: &[SchemaOp],
) -> CatalogResult<Vec<SchemaOp>>
where
    S: SchemaRepo + ?Sized,
{
    let mut applied = Vec::with_capacity(ops.len());
    for op in ops {
        if let Err(source) = store.apply_schema_op(table_id, op).await {
            tracing::warn!(
                table_id = %table_id,
                op = %op,
                applied = applied.len(),
                error = %source,
                "Schema operation failed"
            );
            if applied.is_empty() {
                return Err(source);
            }
            return Err(CatalogError::PartialFailure {
                failed: op.clone(),
                applied,
                source: Box::new(source),
            });
        }
        tracing::debug!(table_id = %table_id, op = %op, "Applied schema operation");
        applied.push(op.clone());
    }
    Ok(applied)
}

/// Refuse operations that address the engine-owned key column.
pub(crate) fn ensure_not_id(op: &SchemaOp) -> CatalogResult<()> {
    if op.field().eq_ignore_ascii_case(tabula_core::ID_COLUMN) {
        return Err(CatalogError::Forbidden(
            "the id column cannot be altered".to_string(),
        ));
    }
    Ok(())
}
