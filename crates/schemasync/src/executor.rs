//! Statement execution and the sync orchestrator.
//!
//! [`SchemaSync`] introspects the observed schema, diffs it against the
//! desired one and applies the resulting statements inside a single
//! transaction.
//!
//! MySQL commits DDL implicitly, so a failure halfway through a batch there
//! leaves the earlier statements applied even though the transaction is
//! rolled back. Engines with transactional DDL (SQLite, PostgreSQL) undo the
//! whole batch.

use sqlx::{Database, Executor, Pool};
use tracing::{debug, info, warn};

use schemasync_core::{Dialect, Schema, SchemaDiffer};

use crate::error::{Result, SyncError};
use crate::introspect::Introspector;

/// Executes statements in order inside one transaction.
///
/// On the first failure the transaction is rolled back and
/// [`SyncError::Apply`] reports the failing statement. An empty batch
/// touches nothing.
pub async fn apply_statements<DB>(pool: &Pool<DB>, statements: &[String]) -> Result<()>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
{
    if statements.is_empty() {
        debug!("No statements to apply");
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    for (i, sql) in statements.iter().enumerate() {
        debug!(position = i + 1, sql = %sql, "Executing SQL");

        if let Err(source) = (&mut *tx).execute(sql.as_str()).await {
            warn!(
                position = i + 1,
                sql = %sql,
                error = %source,
                "Statement failed, rolling back"
            );
            if let Err(e) = tx.rollback().await {
                warn!(error = %e, "Rollback failed");
            }
            return Err(SyncError::Apply {
                position: i + 1,
                statement: sql.clone(),
                source,
            });
        }
    }

    tx.commit().await?;
    info!(count = statements.len(), "Applied statements");
    Ok(())
}

/// Options controlling a sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncOptions {
    /// Compute statements without executing them.
    pub dry_run: bool,
}

impl SyncOptions {
    /// Creates default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables dry-run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }
}

/// Brings a database in line with a desired schema.
pub struct SchemaSync<DB: Database, I: Introspector, D: Dialect> {
    pool: Pool<DB>,
    introspector: I,
    dialect: D,
    options: SyncOptions,
}

impl<DB, I, D> SchemaSync<DB, I, D>
where
    DB: Database,
    for<'c> &'c mut DB::Connection: Executor<'c, Database = DB>,
    I: Introspector,
    D: Dialect,
{
    /// Creates a sync runner. Statements run on `pool`; the observed schema
    /// comes from `introspector`.
    pub fn new(pool: Pool<DB>, introspector: I, dialect: D) -> Self {
        Self {
            pool,
            introspector,
            dialect,
            options: SyncOptions::default(),
        }
    }

    /// Replaces the options.
    #[must_use]
    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Returns the statements needed to reach `desired`, without applying
    /// them.
    pub async fn diff(&self, desired: &Schema) -> Result<Vec<String>> {
        let observed = self.introspector.observed_schema().await?;
        let statements = SchemaDiffer::new(&self.dialect).diff(desired, &observed);
        info!(
            dialect = self.dialect.name(),
            statements = statements.len(),
            "Computed schema diff"
        );
        Ok(statements)
    }

    /// Computes and applies the statements needed to reach `desired`.
    ///
    /// Returns the statements, applied or not. In dry-run mode nothing is
    /// executed.
    ///
    /// All statements run in one transaction, but MySQL commits every DDL
    /// statement implicitly and MyISAM tables are not transactional. When a
    /// statement fails there, the ones before it stay applied; rollback is
    /// only complete on engines with transactional DDL.
    ///
    /// Keys are changed through index clauses only: a `MODIFY` never
    /// restates `PRIMARY KEY` or `UNIQUE`, so modifying a keyed column
    /// neither duplicates its unique index nor redefines the primary key.
    pub async fn sync(&self, desired: &Schema) -> Result<Vec<String>> {
        let statements = self.diff(desired).await?;

        if self.options.dry_run {
            info!(statements = statements.len(), "Dry run, not applying");
            return Ok(statements);
        }

        apply_statements(&self.pool, &statements).await?;
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemasync_core::{Column, MySqlDialect, Table};
    use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    async fn table_exists(pool: &SqlitePool, name: &str) -> bool {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        )
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();
        count > 0
    }

    fn users_table() -> Table {
        Table::new("users")
            .column(Column::new("id", "int64").primary_key())
            .column(Column::new("name", "string").size(50))
    }

    #[tokio::test]
    async fn test_apply_statements() {
        let pool = memory_pool().await;
        let statements = vec![
            "CREATE TABLE a (id INTEGER)".to_string(),
            "CREATE TABLE b (id INTEGER)".to_string(),
        ];

        apply_statements(&pool, &statements).await.unwrap();

        assert!(table_exists(&pool, "a").await);
        assert!(table_exists(&pool, "b").await);
    }

    #[tokio::test]
    async fn test_apply_empty_batch() {
        let pool = memory_pool().await;
        apply_statements(&pool, &[]).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_batch() {
        let pool = memory_pool().await;
        let statements = vec![
            "CREATE TABLE a (id INTEGER)".to_string(),
            "CREATE TABLE broken (".to_string(),
            "CREATE TABLE c (id INTEGER)".to_string(),
        ];

        let err = apply_statements(&pool, &statements).await.unwrap_err();

        match err {
            SyncError::Apply {
                position,
                statement,
                ..
            } => {
                assert_eq!(position, 2);
                assert_eq!(statement, "CREATE TABLE broken (");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!table_exists(&pool, "a").await);
        assert!(!table_exists(&pool, "c").await);
    }

    #[tokio::test]
    async fn test_sync_creates_missing_table() {
        let pool = memory_pool().await;
        let desired = Schema::new().table(users_table()).normalize();
        let sync = SchemaSync::new(pool.clone(), Schema::new(), MySqlDialect);

        let statements = sync.sync(&desired).await.unwrap();

        assert_eq!(statements.len(), 1);
        assert!(statements[0].starts_with("CREATE TABLE `users`"));
        assert!(table_exists(&pool, "users").await);
    }

    #[tokio::test]
    async fn test_sync_in_sync_is_a_no_op() {
        let pool = memory_pool().await;
        let desired = Schema::new().table(users_table()).normalize();
        let sync = SchemaSync::new(pool, desired.clone(), MySqlDialect);

        assert!(sync.sync(&desired).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_apply() {
        let pool = memory_pool().await;
        let desired = Schema::new().table(users_table()).normalize();
        let sync = SchemaSync::new(pool.clone(), Schema::new(), MySqlDialect)
            .with_options(SyncOptions::new().dry_run(true));

        let statements = sync.sync(&desired).await.unwrap();

        assert_eq!(statements.len(), 1);
        assert!(!table_exists(&pool, "users").await);
    }

    #[tokio::test]
    async fn test_sync_drops_removed_table() {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE legacy (id INTEGER)")
            .execute(&pool)
            .await
            .unwrap();
        let observed =
            Schema::new().table(Table::new("legacy").column(Column::new("id", "int64")));
        let sync = SchemaSync::new(pool.clone(), observed, MySqlDialect);

        let statements = sync.sync(&Schema::new()).await.unwrap();

        assert_eq!(statements, vec!["DROP TABLE `legacy`"]);
        assert!(!table_exists(&pool, "legacy").await);
    }

    #[tokio::test]
    async fn test_failing_sync_rolls_back_earlier_statements() {
        let pool = memory_pool().await;
        // `AUTO_INCREMENT` is not SQLite syntax, so the second CREATE fails.
        let desired = Schema::new()
            .table(users_table())
            .table(
                Table::new("zz_events").column(Column::new("id", "int64").auto_increment()),
            )
            .normalize();
        let sync = SchemaSync::new(pool.clone(), Schema::new(), MySqlDialect);

        let err = sync.sync(&desired).await.unwrap_err();

        assert!(matches!(err, SyncError::Apply { position: 2, .. }));
        assert!(!table_exists(&pool, "users").await);
    }
}
