//! Reading the observed schema.
//!
//! [`MySqlIntrospector`] reads `information_schema` for the connection's
//! current database and builds the same neutral model the declaration
//! loader produces, so the two can be diffed directly.

use std::future::Future;

use sqlx::mysql::MySqlPool;
use tracing::debug;

use schemasync_core::{Column, Index, LogicalType, Schema, Table};

use crate::error::{Result, SyncError};

/// Source of the observed schema.
pub trait Introspector {
    /// Returns a normalized snapshot of the schema as it currently exists.
    fn observed_schema(&self) -> impl Future<Output = Result<Schema>> + Send;
}

/// A fixed snapshot, e.g. one loaded from a file.
impl Introspector for Schema {
    fn observed_schema(&self) -> impl Future<Output = Result<Schema>> + Send {
        std::future::ready(Ok(self.clone().normalize()))
    }
}

/// One row of `information_schema.COLUMNS`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogColumn {
    pub table_name: String,
    pub column_name: String,
    /// Bare type name, e.g. `varchar`.
    pub data_type: String,
    /// Full type, e.g. `int unsigned` or `tinyint(1)`.
    pub column_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
    pub extra: String,
    pub column_comment: String,
    pub character_maximum_length: Option<u64>,
}

/// One row of `information_schema.STATISTICS`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogIndexColumn {
    pub table_name: String,
    pub index_name: String,
    /// `None` for functional key parts.
    pub column_name: Option<String>,
    pub non_unique: i64,
}

// String columns are cast to CHAR: several information_schema columns are
// reported as binary strings by MySQL 8.
const TABLES_QUERY: &str = "\
SELECT CAST(TABLE_NAME AS CHAR) AS table_name \
FROM information_schema.TABLES \
WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
ORDER BY TABLE_NAME";

const COLUMNS_QUERY: &str = "\
SELECT CAST(c.TABLE_NAME AS CHAR) AS table_name, \
CAST(c.COLUMN_NAME AS CHAR) AS column_name, \
CAST(c.DATA_TYPE AS CHAR) AS data_type, \
CAST(c.COLUMN_TYPE AS CHAR) AS column_type, \
CAST(c.IS_NULLABLE AS CHAR) AS is_nullable, \
CAST(c.COLUMN_DEFAULT AS CHAR) AS column_default, \
CAST(c.EXTRA AS CHAR) AS extra, \
CAST(c.COLUMN_COMMENT AS CHAR) AS column_comment, \
CAST(c.CHARACTER_MAXIMUM_LENGTH AS UNSIGNED) AS character_maximum_length \
FROM information_schema.COLUMNS c \
JOIN information_schema.TABLES t \
ON t.TABLE_SCHEMA = c.TABLE_SCHEMA AND t.TABLE_NAME = c.TABLE_NAME \
WHERE c.TABLE_SCHEMA = ? AND t.TABLE_TYPE = 'BASE TABLE' \
ORDER BY c.TABLE_NAME, c.ORDINAL_POSITION";

const INDEXES_QUERY: &str = "\
SELECT CAST(s.TABLE_NAME AS CHAR) AS table_name, \
CAST(s.INDEX_NAME AS CHAR) AS index_name, \
CAST(s.COLUMN_NAME AS CHAR) AS column_name, \
CAST(s.NON_UNIQUE AS SIGNED) AS non_unique \
FROM information_schema.STATISTICS s \
JOIN information_schema.TABLES t \
ON t.TABLE_SCHEMA = s.TABLE_SCHEMA AND t.TABLE_NAME = s.TABLE_NAME \
WHERE s.TABLE_SCHEMA = ? AND t.TABLE_TYPE = 'BASE TABLE' \
ORDER BY s.TABLE_NAME, s.INDEX_NAME, s.SEQ_IN_INDEX";

/// Introspects a MySQL database through `information_schema`.
#[derive(Debug, Clone)]
pub struct MySqlIntrospector {
    pool: MySqlPool,
}

impl MySqlIntrospector {
    /// Creates an introspector for the pool's current database.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Returns the name of the connection's current database.
    pub async fn current_database(&self) -> Result<String> {
        let name: Option<String> = sqlx::query_scalar("SELECT CAST(DATABASE() AS CHAR)")
            .fetch_one(&self.pool)
            .await
            .map_err(|source| SyncError::Introspection {
                context: "reading the current database",
                source,
            })?;
        name.ok_or(SyncError::NoDatabaseSelected)
    }

    async fn tables(&self, database: &str) -> Result<Vec<String>> {
        sqlx::query_scalar(TABLES_QUERY)
            .bind(database)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| SyncError::Introspection {
                context: "listing tables",
                source,
            })
    }

    async fn columns(&self, database: &str) -> Result<Vec<CatalogColumn>> {
        sqlx::query_as(COLUMNS_QUERY)
            .bind(database)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| SyncError::Introspection {
                context: "reading columns",
                source,
            })
    }

    async fn indexes(&self, database: &str) -> Result<Vec<CatalogIndexColumn>> {
        sqlx::query_as(INDEXES_QUERY)
            .bind(database)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| SyncError::Introspection {
                context: "reading indexes",
                source,
            })
    }
}

impl Introspector for MySqlIntrospector {
    async fn observed_schema(&self) -> Result<Schema> {
        let database = self.current_database().await?;
        let tables = self.tables(&database).await?;
        let columns = self.columns(&database).await?;
        let indexes = self.indexes(&database).await?;

        debug!(
            database = %database,
            tables = tables.len(),
            columns = columns.len(),
            index_columns = indexes.len(),
            "Read catalog"
        );

        Ok(build_snapshot(tables, columns, indexes))
    }
}

/// Maps a catalog type to a logical type.
///
/// `data_type` is the bare name (`int`), `column_type` the full one
/// (`int unsigned`, `tinyint(1)`). Only types the dialect renders back
/// identically get a logical type; anything else (`char(10)`, `tinytext`,
/// `timestamp`, `decimal(10,2)`) is kept verbatim as
/// [`LogicalType::Other`] so it never compares equal to a declared type.
pub fn logical_type_from_catalog(data_type: &str, column_type: &str) -> LogicalType {
    let data_type = data_type.to_ascii_lowercase();
    let column_type = column_type.to_ascii_lowercase();
    let unsigned = column_type.contains("unsigned");

    match data_type.as_str() {
        "tinyint" if column_type.starts_with("tinyint(1)") => LogicalType::Bool,
        "bool" | "boolean" => LogicalType::Bool,
        "tinyint" if unsigned => LogicalType::UInt8,
        "tinyint" => LogicalType::Int8,
        "smallint" if unsigned => LogicalType::UInt16,
        "smallint" => LogicalType::Int16,
        "int" | "integer" | "mediumint" if unsigned => LogicalType::UInt32,
        "int" | "integer" | "mediumint" => LogicalType::Int32,
        "bigint" if unsigned => LogicalType::UInt64,
        "bigint" => LogicalType::Int64,
        "float" => LogicalType::Float32,
        "double" | "real" => LogicalType::Float64,
        "varchar" | "text" | "mediumtext" | "longtext" => LogicalType::String,
        "datetime" if !column_type.contains('(') => LogicalType::DateTime,
        _ => LogicalType::Other(column_type),
    }
}

/// Normalizes a catalog default. MariaDB reports `NULL` as a literal and
/// quotes string defaults; MySQL does neither.
fn catalog_default(raw: Option<String>) -> Option<String> {
    let raw = raw?;
    if raw.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Some(inner) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
        return Some(inner.replace("''", "'"));
    }
    Some(raw)
}

/// Converts one catalog column into a model column.
pub fn column_from_catalog(row: CatalogColumn) -> Column {
    let nullable = row.is_nullable.eq_ignore_ascii_case("YES");
    let mut logical_type = logical_type_from_catalog(&row.data_type, &row.column_type);
    if nullable {
        logical_type = logical_type.into_nullable();
    }

    let mut column = Column::new(row.column_name, logical_type).nullable(nullable);
    if column.logical_type.is_string() {
        column.size = row.character_maximum_length.unwrap_or(0);
    }
    column.default = catalog_default(row.column_default);
    column.auto_increment = row.extra.to_ascii_lowercase().contains("auto_increment");
    column.comment = Some(row.column_comment).filter(|c| !c.is_empty());
    column
}

/// Assembles a normalized snapshot from catalog rows.
///
/// Rows are expected in catalog order: columns by ordinal position and index
/// columns by sequence within their index.
pub fn build_snapshot(
    tables: Vec<String>,
    columns: Vec<CatalogColumn>,
    indexes: Vec<CatalogIndexColumn>,
) -> Schema {
    let mut schema = Schema::new();
    for name in tables {
        schema.insert(Table::new(name));
    }

    for row in columns {
        if let Some(table) = schema.tables.get_mut(&row.table_name) {
            table.columns.push(column_from_catalog(row));
        }
    }

    for row in indexes {
        let Some(column) = row.column_name else {
            debug!(
                table = %row.table_name,
                index = %row.index_name,
                "Skipping expression key part"
            );
            continue;
        };
        let Some(table) = schema.tables.get_mut(&row.table_name) else {
            continue;
        };
        match table.indexes.iter_mut().find(|i| i.name == row.index_name) {
            Some(index) => index.columns.push(column),
            None => {
                let mut index = Index::new(row.index_name, [column]);
                if row.non_unique == 0 {
                    index = index.unique();
                }
                table.indexes.push(index);
            }
        }
    }

    schema.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_column(
        table: &str,
        name: &str,
        data_type: &str,
        column_type: &str,
    ) -> CatalogColumn {
        CatalogColumn {
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            column_type: column_type.to_string(),
            is_nullable: "NO".to_string(),
            column_default: None,
            extra: String::new(),
            column_comment: String::new(),
            character_maximum_length: None,
        }
    }

    fn index_column(table: &str, index: &str, column: &str, unique: bool) -> CatalogIndexColumn {
        CatalogIndexColumn {
            table_name: table.to_string(),
            index_name: index.to_string(),
            column_name: Some(column.to_string()),
            non_unique: i64::from(!unique),
        }
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(logical_type_from_catalog("tinyint", "tinyint(1)"), LogicalType::Bool);
        assert_eq!(logical_type_from_catalog("tinyint", "tinyint"), LogicalType::Int8);
        assert_eq!(
            logical_type_from_catalog("int", "int unsigned"),
            LogicalType::UInt32
        );
        assert_eq!(
            logical_type_from_catalog("BIGINT", "bigint(20) unsigned"),
            LogicalType::UInt64
        );
        assert_eq!(logical_type_from_catalog("double", "double"), LogicalType::Float64);
        assert_eq!(logical_type_from_catalog("text", "text"), LogicalType::String);
        assert_eq!(
            logical_type_from_catalog("datetime", "datetime"),
            LogicalType::DateTime
        );
        assert_eq!(
            logical_type_from_catalog("timestamp", "timestamp"),
            LogicalType::Other("timestamp".to_string())
        );
        assert_eq!(
            logical_type_from_catalog("char", "char(10)"),
            LogicalType::Other("char(10)".to_string())
        );
        assert_eq!(
            logical_type_from_catalog("tinytext", "tinytext"),
            LogicalType::Other("tinytext".to_string())
        );
        assert_eq!(
            logical_type_from_catalog("datetime", "datetime(3)"),
            LogicalType::Other("datetime(3)".to_string())
        );
        assert_eq!(
            logical_type_from_catalog("decimal", "decimal(10,2)"),
            LogicalType::Other("decimal(10,2)".to_string())
        );
    }

    #[test]
    fn test_catalog_default() {
        assert_eq!(catalog_default(None), None);
        assert_eq!(catalog_default(Some("NULL".to_string())), None);
        assert_eq!(catalog_default(Some("guest".to_string())), Some("guest".to_string()));
        assert_eq!(
            catalog_default(Some("'it''s'".to_string())),
            Some("it's".to_string())
        );
        assert_eq!(catalog_default(Some("0".to_string())), Some("0".to_string()));
    }

    #[test]
    fn test_column_from_catalog() {
        let mut row = catalog_column("user", "nickname", "varchar", "varchar(40)");
        row.is_nullable = "YES".to_string();
        row.character_maximum_length = Some(40);
        row.column_comment = "display name".to_string();

        let column = column_from_catalog(row);
        assert_eq!(column.logical_type, LogicalType::String.into_nullable());
        assert_eq!(column.nullable, Some(true));
        assert_eq!(column.size, 40);
        assert_eq!(column.comment.as_deref(), Some("display name"));

        let mut row = catalog_column("user", "id", "bigint", "bigint");
        row.extra = "auto_increment".to_string();
        row.character_maximum_length = None;
        let column = column_from_catalog(row);
        assert!(column.auto_increment);
        assert_eq!(column.size, 0);
        assert_eq!(column.comment, None);
    }

    #[test]
    fn test_build_snapshot_folds_keys() {
        let mut email = catalog_column("user", "email", "varchar", "varchar(120)");
        email.character_maximum_length = Some(120);

        let schema = build_snapshot(
            vec!["empty".to_string(), "user".to_string()],
            vec![
                catalog_column("user", "id", "bigint", "bigint"),
                email,
                catalog_column("user", "org_id", "int", "int"),
            ],
            vec![
                index_column("user", "PRIMARY", "id", true),
                index_column("user", "email", "email", true),
                index_column("user", "org_email_idx", "org_id", false),
                index_column("user", "org_email_idx", "email", false),
            ],
        );

        assert_eq!(schema.table_names().collect::<Vec<_>>(), vec!["empty", "user"]);
        assert!(schema.get("empty").unwrap().columns.is_empty());

        let user = schema.get("user").unwrap();
        assert!(user.get_column("id").unwrap().primary_key);
        assert!(user.get_column("email").unwrap().unique);
        assert_eq!(
            user.indexes,
            vec![Index::new("org_email_idx", ["org_id", "email"])]
        );
    }

    #[test]
    fn test_build_snapshot_keeps_composite_primary() {
        let schema = build_snapshot(
            vec!["membership".to_string()],
            vec![
                catalog_column("membership", "user_id", "bigint", "bigint"),
                catalog_column("membership", "group_id", "bigint", "bigint"),
            ],
            vec![
                index_column("membership", "PRIMARY", "user_id", true),
                index_column("membership", "PRIMARY", "group_id", true),
            ],
        );

        let membership = schema.get("membership").unwrap();
        assert_eq!(
            membership.indexes,
            vec![Index::primary(["user_id", "group_id"])]
        );
        assert!(membership.columns.iter().all(|c| !c.primary_key));
    }

    #[test]
    fn test_build_snapshot_skips_expression_parts() {
        let mut expression = index_column("t", "lower_name_idx", "name", false);
        expression.column_name = None;

        let schema = build_snapshot(
            vec!["t".to_string()],
            vec![catalog_column("t", "name", "varchar", "varchar(10)")],
            vec![expression],
        );
        assert!(schema.get("t").unwrap().indexes.is_empty());
    }

    #[test]
    fn test_drifted_column_types_are_modified() {
        use schemasync_core::{MySqlDialect, diff};

        let mut created_at = catalog_column("event", "created_at", "timestamp", "timestamp");
        created_at.column_default = Some("CURRENT_TIMESTAMP".to_string());
        let mut code = catalog_column("event", "code", "char", "char(10)");
        code.character_maximum_length = Some(10);
        let observed = build_snapshot(vec!["event".to_string()], vec![created_at, code], vec![]);

        let desired = Schema::new()
            .table(
                Table::new("event")
                    .column(Column::new("created_at", "datetime").default("CURRENT_TIMESTAMP"))
                    .column(Column::new("code", "string").size(10)),
            )
            .normalize();

        assert_eq!(
            diff(&MySqlDialect, &desired, &observed),
            vec![
                "ALTER TABLE `event` \
                 MODIFY `created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP, \
                 MODIFY `code` VARCHAR(10) NOT NULL"
            ]
        );
    }

    #[tokio::test]
    async fn test_schema_is_its_own_introspector() {
        let snapshot = Schema::new().table(
            Table::new("t").column(Column::new("id", "int64").primary_key()),
        );
        let observed = snapshot.observed_schema().await.unwrap();
        assert_eq!(observed, snapshot.normalize());
    }
}
