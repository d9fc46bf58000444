//! Catalog store trait and the SQLite implementation.

use crate::error::CatalogResult;
use crate::repos::{RecordRepo, SchemaRepo, SiteRepo, TableRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Combined catalog store trait.
#[async_trait]
pub trait CatalogStore: SiteRepo + TableRepo + SchemaRepo + RecordRepo + Send + Sync {
    /// Create the catalog tables and seed the shared site.
    async fn migrate(&self) -> CatalogResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> CatalogResult<()>;
}

/// SQLite-based catalog store.
///
/// Site tables live in the same database file as the catalog tables.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database and run migrations.
    pub async fn new(path: impl AsRef<Path>) -> CatalogResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // A single connection serializes DDL and avoids "database is locked".
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl CatalogStore for SqliteStore {
    async fn migrate(&self) -> CatalogResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod sqlite_impl {
    use super::*;
    use crate::error::CatalogError;
    use crate::models::{Record, SiteRow, TableRow};
    use crate::repos::schema::ensure_not_id;
    use crate::sql::{
        BoundField, bind_fields, checked_reported_type, column_definition, create_table_sql,
        float_value, map_unique_violation, quote_ident, untracked_tables, validate_identifier,
    };
    use serde_json::Value;
    use sqlx::query::Query;
    use sqlx::sqlite::{SqliteArguments, SqliteRow};
    use sqlx::{Column, FromRow, Row, TypeInfo, ValueRef};
    use tabula_core::{
        CellValue, ID_COLUMN, NormalizedColumn, PhysicalColumn, SchemaOp, SiteScope,
        generate_table_id, is_reserved_table,
    };
    use time::OffsetDateTime;

    const ID_DEFINITION: &str = "INTEGER PRIMARY KEY AUTOINCREMENT";

    /// One row of `pragma_table_info`.
    #[derive(Debug, Clone, FromRow)]
    struct ColumnInfo {
        name: String,
        #[sqlx(rename = "type")]
        ty: String,
        notnull: i64,
        dflt_value: Option<String>,
        pk: i64,
    }

    impl ColumnInfo {
        fn to_physical(&self) -> PhysicalColumn {
            PhysicalColumn {
                field: self.name.clone(),
                sql_type: self.ty.clone(),
                nullable: self.notnull == 0 && self.pk == 0,
                primary_key: self.pk > 0,
            }
        }
    }

    /// How a table rebuild changes the column list.
    #[derive(Clone, Copy)]
    enum Rebuild<'a> {
        Append(&'a NormalizedColumn),
        Replace(&'a NormalizedColumn),
    }

    fn bind_cell<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: &CellValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            CellValue::Null => query.bind(None::<String>),
            CellValue::Bool(b) => query.bind(*b),
            CellValue::Int(i) => query.bind(*i),
            CellValue::Float(f) => query.bind(*f),
            CellValue::Text(s) => query.bind(s.clone()),
        }
    }

    /// Decode a row using each value's storage class.
    fn sqlite_record(row: &SqliteRow) -> CatalogResult<Record> {
        let mut record = Record::new();
        for column in row.columns() {
            let index = column.ordinal();
            let (is_null, type_name) = {
                let raw = row.try_get_raw(index)?;
                (raw.is_null(), raw.type_info().name().to_string())
            };
            let value = if is_null {
                Value::Null
            } else {
                match type_name.as_str() {
                    "INTEGER" => Value::from(row.try_get_unchecked::<i64, _>(index)?),
                    "REAL" => float_value(row.try_get_unchecked::<f64, _>(index)?),
                    "BLOB" => {
                        let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                        Value::String(String::from_utf8_lossy(&bytes).into_owned())
                    }
                    _ => Value::String(row.try_get_unchecked::<String, _>(index)?),
                }
            };
            record.insert(column.name().to_string(), value);
        }
        Ok(record)
    }

    impl SqliteStore {
        async fn table_info(&self, table_id: &str) -> CatalogResult<Vec<ColumnInfo>> {
            validate_identifier(table_id)?;
            let columns = sqlx::query_as::<_, ColumnInfo>(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
            )
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;
            if columns.is_empty() {
                return Err(CatalogError::NotFound(format!("table {table_id}")));
            }
            Ok(columns)
        }

        async fn has_autoincrement(&self, table_id: &str) -> CatalogResult<bool> {
            let sql: Option<String> = sqlx::query_scalar(
                "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(sql.is_some_and(|sql| sql.to_ascii_uppercase().contains("AUTOINCREMENT")))
        }

        /// Recreate a table with a changed column list and copy its rows.
        ///
        /// SQLite cannot change a column's type or nullability in place, nor
        /// add a NOT NULL column without a default. The whole rebuild runs in
        /// one transaction, so a failed copy leaves the table untouched.
        async fn rebuild_table(&self, table_id: &str, change: Rebuild<'_>) -> CatalogResult<()> {
            let live = self.table_info(table_id).await?;
            let autoincrement = self.has_autoincrement(table_id).await?;

            let pk_columns: Vec<&ColumnInfo> = {
                let mut pk: Vec<&ColumnInfo> = live.iter().filter(|c| c.pk > 0).collect();
                pk.sort_by_key(|c| c.pk);
                pk
            };
            let inline_pk = pk_columns.len() == 1;

            let mut definitions = Vec::with_capacity(live.len() + 1);
            let mut copied = Vec::with_capacity(live.len());

            for column in &live {
                let replacement = match change {
                    Rebuild::Replace(target) if target.name.eq_ignore_ascii_case(&column.name) => {
                        Some(target)
                    }
                    _ => None,
                };

                let definition = match replacement {
                    Some(target) => column_definition(&NormalizedColumn {
                        name: column.name.clone(),
                        ..target.clone()
                    }),
                    None => {
                        let mut def = format!(
                            "{} {}",
                            quote_ident(&column.name),
                            checked_reported_type(&column.ty)?
                        );
                        if inline_pk && column.pk > 0 {
                            def.push_str(" PRIMARY KEY");
                            if autoincrement {
                                def.push_str(" AUTOINCREMENT");
                            }
                        }
                        if column.notnull != 0 {
                            def.push_str(" NOT NULL");
                        }
                        if let Some(default) = &column.dflt_value {
                            def.push_str(" DEFAULT ");
                            def.push_str(default);
                        }
                        def
                    }
                };
                definitions.push(definition);
                copied.push(quote_ident(&column.name));
            }

            match change {
                Rebuild::Append(column) => definitions.push(column_definition(column)),
                Rebuild::Replace(target) => {
                    if !live.iter().any(|c| c.name.eq_ignore_ascii_case(&target.name)) {
                        return Err(CatalogError::NotFound(format!(
                            "column {} in table {table_id}",
                            target.name
                        )));
                    }
                }
            }

            if pk_columns.len() > 1 {
                let keys: Vec<String> = pk_columns.iter().map(|c| quote_ident(&c.name)).collect();
                definitions.push(format!("PRIMARY KEY ({})", keys.join(", ")));
            }

            let shadow_name = format!("_tabula_rebuild_{}", generate_table_id());
            let shadow = quote_ident(&shadow_name);
            let target = quote_ident(table_id);
            let copied = copied.join(", ");

            let mut tx = self.pool.begin().await?;
            sqlx::query(&format!("CREATE TABLE {shadow} ({})", definitions.join(", ")))
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!(
                "INSERT INTO {shadow} ({copied}) SELECT {copied} FROM {target}"
            ))
            .execute(&mut *tx)
            .await?;
            if autoincrement {
                // Dropping the table discards its sequence; ids must never be reused.
                sqlx::query("DELETE FROM sqlite_sequence WHERE name = ?")
                    .bind(&shadow_name)
                    .execute(&mut *tx)
                    .await?;
                sqlx::query(
                    "INSERT INTO sqlite_sequence (name, seq) SELECT ?, seq FROM sqlite_sequence WHERE name = ?",
                )
                .bind(&shadow_name)
                .bind(table_id)
                .execute(&mut *tx)
                .await?;
            }
            sqlx::query(&format!("DROP TABLE {target}"))
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!("ALTER TABLE {shadow} RENAME TO {target}"))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            Ok(())
        }

        async fn bound_fields(
            &self,
            table_id: &str,
            fields: &Record,
        ) -> CatalogResult<Vec<BoundField>> {
            let columns: Vec<PhysicalColumn> = self
                .table_info(table_id)
                .await?
                .iter()
                .map(ColumnInfo::to_physical)
                .collect();
            bind_fields(&columns, fields)
        }

        /// Run a row query against a site table.
        ///
        /// Site table statements are never cached: a cached `SELECT *` keeps
        /// its old column list after the table is altered.
        async fn fetch_records(&self, sql: &str, bind: Option<i64>) -> CatalogResult<Vec<Record>> {
            let mut query = sqlx::query(sql).persistent(false);
            if let Some(value) = bind {
                query = query.bind(value);
            }
            let rows = query.fetch_all(&self.pool).await?;
            rows.iter().map(sqlite_record).collect()
        }
    }

    #[async_trait]
    impl SiteRepo for SqliteStore {
        async fn create_site(&self, name: &str) -> CatalogResult<SiteRow> {
            let row = sqlx::query_as::<_, SiteRow>(
                "INSERT INTO sites (name, active, created_at) VALUES (?, 1, ?) RETURNING *",
            )
            .bind(name)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await?;
            Ok(row)
        }

        async fn get_site(&self, site_id: i64) -> CatalogResult<Option<SiteRow>> {
            let row = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites WHERE id = ?")
                .bind(site_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn list_sites(&self) -> CatalogResult<Vec<SiteRow>> {
            let rows = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
            Ok(rows)
        }
    }

    #[async_trait]
    impl TableRepo for SqliteStore {
        async fn find_table(
            &self,
            scope: SiteScope,
            table_ref: &str,
        ) -> CatalogResult<Option<TableRow>> {
            let row = match scope {
                SiteScope::Shared => {
                    sqlx::query_as::<_, TableRow>(
                        "SELECT * FROM site_tables WHERE LOWER(table_id) = LOWER(?) ORDER BY id LIMIT 1",
                    )
                    .bind(table_ref)
                    .fetch_optional(&self.pool)
                    .await?
                }
                SiteScope::Site(site_id) => {
                    sqlx::query_as::<_, TableRow>(
                        "SELECT * FROM site_tables WHERE site_id = ? AND table_id = ?",
                    )
                    .bind(site_id)
                    .bind(table_ref)
                    .fetch_optional(&self.pool)
                    .await?
                }
            };
            Ok(row)
        }

        async fn get_table(&self, table_id: &str) -> CatalogResult<Option<TableRow>> {
            let row = sqlx::query_as::<_, TableRow>("SELECT * FROM site_tables WHERE table_id = ?")
                .bind(table_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn create_table(
            &self,
            site_id: i64,
            display_name: &str,
            columns: &[NormalizedColumn],
        ) -> CatalogResult<TableRow> {
            let table_id = generate_table_id();
            let ddl = create_table_sql(&table_id, ID_DEFINITION, columns);

            let mut tx = self.pool.begin().await?;
            sqlx::query(&ddl).execute(&mut *tx).await?;
            let row = sqlx::query_as::<_, TableRow>(
                "INSERT INTO site_tables (site_id, table_name, table_id, created_at) VALUES (?, ?, ?, ?) RETURNING *",
            )
            .bind(site_id)
            .bind(display_name)
            .bind(&table_id)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_unique_violation(e, || format!("table {table_id}")))?;
            tx.commit().await?;

            Ok(row)
        }

        async fn associate_table(
            &self,
            site_id: i64,
            physical_name: &str,
        ) -> CatalogResult<TableRow> {
            validate_identifier(physical_name)?;
            if is_reserved_table(physical_name) {
                return Err(CatalogError::Forbidden(format!(
                    "table {physical_name} is reserved"
                )));
            }

            let physical = self.list_physical_tables().await?;
            let Some(name) = physical.into_iter().find(|t| t.eq_ignore_ascii_case(physical_name))
            else {
                return Err(CatalogError::NotFound(format!("table {physical_name}")));
            };

            let tracked: Option<i64> =
                sqlx::query_scalar("SELECT id FROM site_tables WHERE LOWER(table_id) = LOWER(?)")
                    .bind(&name)
                    .fetch_optional(&self.pool)
                    .await?;
            if tracked.is_some() {
                return Err(CatalogError::AlreadyExists(format!(
                    "table {name} is already associated"
                )));
            }

            let row = sqlx::query_as::<_, TableRow>(
                "INSERT INTO site_tables (site_id, table_name, table_id, created_at) VALUES (?, ?, ?, ?) RETURNING *",
            )
            .bind(site_id)
            .bind(&name)
            .bind(&name)
            .bind(OffsetDateTime::now_utc())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                map_unique_violation(e, || format!("table {name} is already associated"))
            })?;
            Ok(row)
        }

        async fn rename_table(&self, table_id: &str, display_name: &str) -> CatalogResult<()> {
            let result = sqlx::query("UPDATE site_tables SET table_name = ? WHERE table_id = ?")
                .bind(display_name)
                .bind(table_id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(CatalogError::NotFound(format!("table {table_id}")));
            }
            Ok(())
        }

        async fn delete_table(&self, table_id: &str) -> CatalogResult<TableRow> {
            if is_reserved_table(table_id) {
                return Err(CatalogError::Forbidden(format!("table {table_id} is reserved")));
            }
            validate_identifier(table_id)?;

            let row = self
                .get_table(table_id)
                .await?
                .ok_or_else(|| CatalogError::NotFound(format!("table {table_id}")))?;

            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM site_tables WHERE id = ?")
                .bind(row.id)
                .execute(&mut *tx)
                .await?;
            sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table_id)))
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            Ok(row)
        }

        async fn list_tables(&self, site_id: i64) -> CatalogResult<Vec<TableRow>> {
            let rows = sqlx::query_as::<_, TableRow>(
                "SELECT * FROM site_tables WHERE site_id = ? ORDER BY id",
            )
            .bind(site_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn list_physical_tables(&self) -> CatalogResult<Vec<String>> {
            let names: Vec<String> = sqlx::query_scalar(
                r"SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\_%' ESCAPE '\' ORDER BY name",
            )
            .fetch_all(&self.pool)
            .await?;
            Ok(names)
        }

        async fn list_unassociated_tables(&self) -> CatalogResult<Vec<String>> {
            let physical = self.list_physical_tables().await?;
            let tracked: Vec<String> = sqlx::query_scalar("SELECT table_id FROM site_tables")
                .fetch_all(&self.pool)
                .await?;
            Ok(untracked_tables(physical, &tracked, true))
        }
    }

    #[async_trait]
    impl SchemaRepo for SqliteStore {
        async fn describe_table(&self, table_id: &str) -> CatalogResult<Vec<PhysicalColumn>> {
            Ok(self
                .table_info(table_id)
                .await?
                .iter()
                .map(ColumnInfo::to_physical)
                .collect())
        }

        async fn apply_schema_op(&self, table_id: &str, op: &SchemaOp) -> CatalogResult<()> {
            ensure_not_id(op)?;
            validate_identifier(table_id)?;
            let target = quote_ident(table_id);

            match op {
                SchemaOp::Add { column } if column.nullable => {
                    sqlx::query(&format!(
                        "ALTER TABLE {target} ADD COLUMN {}",
                        column_definition(column)
                    ))
                    .execute(&self.pool)
                    .await?;
                }
                SchemaOp::Add { column } => {
                    self.rebuild_table(table_id, Rebuild::Append(column)).await?;
                }
                SchemaOp::Modify { column } => {
                    self.rebuild_table(table_id, Rebuild::Replace(column)).await?;
                }
                SchemaOp::Drop { field } => {
                    sqlx::query(&format!(
                        "ALTER TABLE {target} DROP COLUMN {}",
                        quote_ident(field)
                    ))
                    .execute(&self.pool)
                    .await?;
                }
            }
            Ok(())
        }
    }

    #[async_trait]
    impl RecordRepo for SqliteStore {
        async fn list_records(&self, table_id: &str) -> CatalogResult<Vec<Record>> {
            validate_identifier(table_id)?;
            self.fetch_records(&format!("SELECT * FROM {}", quote_ident(table_id)), None)
                .await
        }

        async fn latest_records(&self, table_id: &str, limit: u32) -> CatalogResult<Vec<Record>> {
            validate_identifier(table_id)?;
            self.fetch_records(
                &format!(
                    "SELECT * FROM {} ORDER BY {} DESC LIMIT ?",
                    quote_ident(table_id),
                    quote_ident(ID_COLUMN)
                ),
                Some(i64::from(limit)),
            )
            .await
        }

        async fn get_record(&self, table_id: &str, id: i64) -> CatalogResult<Option<Record>> {
            validate_identifier(table_id)?;
            let mut records = self
                .fetch_records(
                    &format!(
                        "SELECT * FROM {} WHERE {} = ?",
                        quote_ident(table_id),
                        quote_ident(ID_COLUMN)
                    ),
                    Some(id),
                )
                .await?;
            Ok(records.pop())
        }

        async fn insert_record(&self, table_id: &str, fields: &Record) -> CatalogResult<i64> {
            let bound = self.bound_fields(table_id, fields).await?;
            let target = quote_ident(table_id);

            let sql = if bound.is_empty() {
                format!("INSERT INTO {target} DEFAULT VALUES")
            } else {
                let names: Vec<String> = bound.iter().map(|f| quote_ident(&f.field)).collect();
                let placeholders = vec!["?"; bound.len()].join(", ");
                format!(
                    "INSERT INTO {target} ({}) VALUES ({placeholders})",
                    names.join(", ")
                )
            };

            let mut query = sqlx::query(&sql).persistent(false);
            for field in &bound {
                query = bind_cell(query, &field.value);
            }
            let result = query.execute(&self.pool).await?;
            Ok(result.last_insert_rowid())
        }

        async fn update_record(
            &self,
            table_id: &str,
            id: i64,
            fields: &Record,
        ) -> CatalogResult<u64> {
            let bound = self.bound_fields(table_id, fields).await?;
            if bound.is_empty() {
                return Err(tabula_core::Error::InvalidValue {
                    field: ID_COLUMN.to_string(),
                    reason: "no fields to update".to_string(),
                }
                .into());
            }

            let assignments: Vec<String> = bound
                .iter()
                .map(|f| format!("{} = ?", quote_ident(&f.field)))
                .collect();
            let sql = format!(
                "UPDATE {} SET {} WHERE {} = ?",
                quote_ident(table_id),
                assignments.join(", "),
                quote_ident(ID_COLUMN)
            );

            let mut query = sqlx::query(&sql).persistent(false);
            for field in &bound {
                query = bind_cell(query, &field.value);
            }
            let result = query.bind(id).execute(&self.pool).await?;
            Ok(result.rows_affected())
        }

        async fn delete_record(&self, table_id: &str, id: i64) -> CatalogResult<u64> {
            validate_identifier(table_id)?;
            let result = sqlx::query(&format!(
                "DELETE FROM {} WHERE {} = ?",
                quote_ident(table_id),
                quote_ident(ID_COLUMN)
            ))
            .persistent(false)
            .bind(id)
            .execute(&self.pool)
            .await?;
            Ok(result.rows_affected())
        }
    }
}

/// SQL schema for SQLite.
const SCHEMA_SQL: &str = r#"
-- Sites (tenant/project scopes)
CREATE TABLE IF NOT EXISTS sites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);
INSERT OR IGNORE INTO sites (id, name, active, created_at)
VALUES (1, 'shared', 1, CURRENT_TIMESTAMP);

-- Logical tables: display name plus the physical table they bind to
CREATE TABLE IF NOT EXISTS site_tables (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    site_id INTEGER NOT NULL REFERENCES sites(id) ON DELETE CASCADE,
    table_name TEXT NOT NULL,
    table_id TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_site_tables_site ON site_tables(site_id);
"#;
