//! PostgreSQL-based catalog store implementation.

use crate::error::{CatalogError, CatalogResult};
use crate::models::{Record, SiteRow, TableRow};
use crate::repos::schema::ensure_not_id;
use crate::repos::{RecordRepo, SchemaRepo, SiteRepo, TableRepo};
use crate::sql::{
    BoundField, bind_fields, checked_reported_type, column_definition, create_table_sql,
    map_unique_violation, quote_ident, untracked_tables, validate_identifier,
};
use crate::store::CatalogStore;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::query::Query;
use sqlx::{FromRow, Pool, Postgres};
use std::str::FromStr;
use tabula_core::config::PgSslMode;
use tabula_core::{
    CellValue, ID_COLUMN, NormalizedColumn, PhysicalColumn, SchemaOp, SiteScope,
    generate_table_id, is_reserved_table,
};

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

const ID_DEFINITION: &str = "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY";

const DESCRIBE_SQL: &str = r#"
SELECT a.attname::text AS field,
       format_type(a.atttypid, a.atttypmod) AS sql_type,
       NOT a.attnotnull AS nullable,
       EXISTS (
           SELECT 1 FROM pg_index i
           WHERE i.indrelid = a.attrelid AND i.indisprimary AND a.attnum = ANY(i.indkey)
       ) AS primary_key
FROM pg_attribute a
WHERE a.attrelid = to_regclass(quote_ident($1::text))
  AND a.attnum > 0
  AND NOT a.attisdropped
ORDER BY a.attnum
"#;

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct PgColumnInfo {
    field: String,
    sql_type: String,
    nullable: bool,
    primary_key: bool,
}

impl From<PgColumnInfo> for PhysicalColumn {
    fn from(info: PgColumnInfo) -> Self {
        PhysicalColumn {
            field: info.field,
            sql_type: info.sql_type,
            nullable: info.nullable,
            primary_key: info.primary_key,
        }
    }
}

fn bind_cell<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &CellValue,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        CellValue::Null => query.bind(None::<String>),
        CellValue::Bool(b) => query.bind(*b),
        CellValue::Int(i) => query.bind(*i),
        CellValue::Float(f) => query.bind(*f),
        CellValue::Text(s) => query.bind(s.clone()),
    }
}

/// Placeholder wrapped in a cast to the column type.
///
/// Values are bound with their Rust-side type (text, int8, float8, bool); the
/// explicit cast lets PostgreSQL coerce them into the declared column type.
fn cast_placeholder(index: usize, field: &BoundField) -> CatalogResult<String> {
    Ok(format!(
        "CAST(${index} AS {})",
        checked_reported_type(&field.sql_type)?
    ))
}

/// PostgreSQL-based catalog store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> CatalogResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// Lets the password come from the environment instead of a URL.
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> CatalogResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL with individual parameters"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> CatalogResult<Self> {
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    async fn bound_fields(
        &self,
        table_id: &str,
        fields: &Record,
    ) -> CatalogResult<Vec<BoundField>> {
        let columns = self.describe_table(table_id).await?;
        bind_fields(&columns, fields)
    }

    /// Fetch rows as JSON objects. Statements are not cached because site
    /// tables change shape under DDL.
    async fn fetch_records(&self, sql: &str, bind: Option<i64>) -> CatalogResult<Vec<Record>> {
        let mut query = sqlx::query_scalar::<_, Value>(sql).persistent(false);
        if let Some(value) = bind {
            query = query.bind(value);
        }
        let values = query.fetch_all(&self.pool).await?;
        values
            .into_iter()
            .map(|value| match value {
                Value::Object(record) => Ok(record),
                other => Err(CatalogError::Internal(format!(
                    "expected a JSON object row, got {other}"
                ))),
            })
            .collect()
    }
}

#[async_trait]
impl CatalogStore for PostgresStore {
    async fn migrate(&self) -> CatalogResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared statement.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> CatalogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl SiteRepo for PostgresStore {
    async fn create_site(&self, name: &str) -> CatalogResult<SiteRow> {
        let row = sqlx::query_as::<_, SiteRow>(
            "INSERT INTO sites (name, active) VALUES ($1, TRUE) RETURNING *",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_site(&self, site_id: i64) -> CatalogResult<Option<SiteRow>> {
        let row = sqlx::query_as::<_, SiteRow>("SELECT * FROM sites WHERE id = $1")
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
impl TableRepo for PostgresStore {
    async fn find_table(
        &self,
        scope: SiteScope,
        table_ref: &str,
    ) -> CatalogResult<Option<TableRow>> {
        let row = match scope {
            SiteScope::Shared => {
                sqlx::query_as::<_, TableRow>(
                    "SELECT * FROM site_tables WHERE LOWER(table_id) = LOWER($1) ORDER BY id LIMIT 1",
                )
                .bind(table_ref)
                .fetch_optional(&self.pool)
                .await?
            }
            SiteScope::Site(site_id) => {
                sqlx::query_as::<_, TableRow>(
                    "SELECT * FROM site_tables WHERE site_id = $1 AND table_id = $2",
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
        let row = sqlx::query_as::<_, TableRow>("SELECT * FROM site_tables WHERE table_id = $1")
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
            "INSERT INTO site_tables (site_id, table_name, table_id) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(site_id)
        .bind(display_name)
        .bind(&table_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, || format!("table {table_id}")))?;
        tx.commit().await?;

        Ok(row)
    }

    async fn associate_table(&self, site_id: i64, physical_name: &str) -> CatalogResult<TableRow> {
        validate_identifier(physical_name)?;
        if is_reserved_table(physical_name) {
            return Err(CatalogError::Forbidden(format!(
                "table {physical_name} is reserved"
            )));
        }

        let physical = self.list_physical_tables().await?;
        if !physical.iter().any(|t| t == physical_name) {
            return Err(CatalogError::NotFound(format!("table {physical_name}")));
        }
        if self.get_table(physical_name).await?.is_some() {
            return Err(CatalogError::AlreadyExists(format!(
                "table {physical_name} is already associated"
            )));
        }

        let row = sqlx::query_as::<_, TableRow>(
            "INSERT INTO site_tables (site_id, table_name, table_id) VALUES ($1, $2, $2) RETURNING *",
        )
        .bind(site_id)
        .bind(physical_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_unique_violation(e, || format!("table {physical_name} is already associated"))
        })?;
        Ok(row)
    }

    async fn rename_table(&self, table_id: &str, display_name: &str) -> CatalogResult<()> {
        let result = sqlx::query("UPDATE site_tables SET table_name = $1 WHERE table_id = $2")
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
        sqlx::query("DELETE FROM site_tables WHERE id = $1")
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
        let rows =
            sqlx::query_as::<_, TableRow>("SELECT * FROM site_tables WHERE site_id = $1 ORDER BY id")
                .bind(site_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows)
    }

    async fn list_physical_tables(&self) -> CatalogResult<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT tablename::text FROM pg_catalog.pg_tables WHERE schemaname = current_schema() ORDER BY tablename",
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
        Ok(untracked_tables(physical, &tracked, false))
    }
}

#[async_trait]
impl SchemaRepo for PostgresStore {
    async fn describe_table(&self, table_id: &str) -> CatalogResult<Vec<PhysicalColumn>> {
        validate_identifier(table_id)?;
        let columns = sqlx::query_as::<_, PgColumnInfo>(DESCRIBE_SQL)
            .bind(table_id)
            .fetch_all(&self.pool)
            .await?;
        if columns.is_empty() {
            return Err(CatalogError::NotFound(format!("table {table_id}")));
        }
        Ok(columns.into_iter().map(PhysicalColumn::from).collect())
    }

    async fn apply_schema_op(&self, table_id: &str, op: &SchemaOp) -> CatalogResult<()> {
        ensure_not_id(op)?;
        validate_identifier(table_id)?;
        let target = quote_ident(table_id);

        let statement = match op {
            SchemaOp::Add { column } => {
                format!("ALTER TABLE {target} ADD COLUMN {}", column_definition(column))
            }
            SchemaOp::Modify { column } => {
                let name = quote_ident(&column.name);
                let ty = &column.sql_type;
                let nullability = if column.nullable {
                    "DROP NOT NULL"
                } else {
                    "SET NOT NULL"
                };
                format!(
                    "ALTER TABLE {target} ALTER COLUMN {name} TYPE {ty} USING {name}::{ty}, \
                     ALTER COLUMN {name} {nullability}"
                )
            }
            SchemaOp::Drop { field } => {
                format!("ALTER TABLE {target} DROP COLUMN {}", quote_ident(field))
            }
        };

        sqlx::query(&statement)
            .persistent(false)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RecordRepo for PostgresStore {
    async fn list_records(&self, table_id: &str) -> CatalogResult<Vec<Record>> {
        validate_identifier(table_id)?;
        self.fetch_records(
            &format!("SELECT to_jsonb(t) FROM {} AS t", quote_ident(table_id)),
            None,
        )
        .await
    }

    async fn latest_records(&self, table_id: &str, limit: u32) -> CatalogResult<Vec<Record>> {
        validate_identifier(table_id)?;
        self.fetch_records(
            &format!(
                "SELECT to_jsonb(t) FROM {} AS t ORDER BY t.{} DESC LIMIT $1",
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
                    "SELECT to_jsonb(t) FROM {} AS t WHERE t.{} = $1",
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
        let returning = format!("RETURNING CAST({} AS BIGINT)", quote_ident(ID_COLUMN));

        let sql = if bound.is_empty() {
            format!("INSERT INTO {target} DEFAULT VALUES {returning}")
        } else {
            let names: Vec<String> = bound.iter().map(|f| quote_ident(&f.field)).collect();
            let placeholders = bound
                .iter()
                .enumerate()
                .map(|(i, field)| cast_placeholder(i + 1, field))
                .collect::<CatalogResult<Vec<_>>>()?;
            format!(
                "INSERT INTO {target} ({}) VALUES ({}) {returning}",
                names.join(", "),
                placeholders.join(", ")
            )
        };

        let mut query = sqlx::query(&sql).persistent(false);
        for field in &bound {
            query = bind_cell(query, &field.value);
        }
        let row = query.fetch_one(&self.pool).await?;
        let id: i64 = sqlx::Row::try_get(&row, 0)?;
        Ok(id)
    }

    async fn update_record(&self, table_id: &str, id: i64, fields: &Record) -> CatalogResult<u64> {
        let bound = self.bound_fields(table_id, fields).await?;
        if bound.is_empty() {
            return Err(tabula_core::Error::InvalidValue {
                field: ID_COLUMN.to_string(),
                reason: "no fields to update".to_string(),
            }
            .into());
        }

        let assignments = bound
            .iter()
            .enumerate()
            .map(|(i, field)| {
                Ok(format!(
                    "{} = {}",
                    quote_ident(&field.field),
                    cast_placeholder(i + 1, field)?
                ))
            })
            .collect::<CatalogResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            quote_ident(table_id),
            assignments.join(", "),
            quote_ident(ID_COLUMN),
            bound.len() + 1
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
            "DELETE FROM {} WHERE {} = $1",
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
