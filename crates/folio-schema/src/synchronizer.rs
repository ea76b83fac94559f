//! Schema synchronizer.
//!
//! Rebuilds a table so it has exactly the columns of a [`TargetSchema`],
//! carrying over the data of every column that exists both before and after.
//! The whole rebuild runs in one transaction: it either fully happens or the
//! original table is left untouched.

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::dialect::SchemaDialect;
use crate::error::{Result, SyncError, SyncStep};
use crate::plan::{PlannedStatement, RebuildPlan};
use crate::schema::{validate_identifier, TargetSchema};
use crate::store::{SchemaStore, StoreError, StoreTransaction};

/// Derives the scratch table name for a table.
pub type ScratchNamer = fn(&str) -> String;

/// Default scratch name: `<table>_temp_<unix microseconds>`.
#[must_use]
pub fn timestamped_scratch_name(table: &str) -> String {
    format!("{table}_temp_{}", Utc::now().timestamp_micros())
}

/// Outcome of a successful synchronization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Synchronized table.
    pub table: String,
    /// Scratch table used for the rebuild (no longer exists).
    pub scratch: String,
    /// Column changes that were applied.
    pub plan: RebuildPlan,
    /// Rows copied from the old table.
    pub rows_copied: u64,
}

impl SyncReport {
    /// Returns whether the table did not exist before.
    #[must_use]
    pub fn created(&self) -> bool {
        !self.plan.table_existed
    }
}

/// What a synchronization would do, computed without changing anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPreview {
    /// Table to synchronize.
    pub table: String,
    /// Scratch name the statements use.
    pub scratch: String,
    /// Column changes.
    pub plan: RebuildPlan,
    /// Statements in execution order.
    pub statements: Vec<PlannedStatement>,
}

/// Synchronizes tables against target schemas.
///
/// Meant to run once per table at startup, before anything else reads or
/// writes the table. Two synchronizers must not work on the same table at
/// the same time.
pub struct SchemaSynchronizer<S: SchemaStore, D: SchemaDialect> {
    store: S,
    dialect: D,
    scratch_namer: ScratchNamer,
}

impl<S: SchemaStore, D: SchemaDialect> SchemaSynchronizer<S, D> {
    /// Creates a new synchronizer.
    #[must_use]
    pub fn new(store: S, dialect: D) -> Self {
        Self {
            store,
            dialect,
            scratch_namer: timestamped_scratch_name,
        }
    }

    /// Replaces the scratch name derivation.
    #[must_use]
    pub fn with_scratch_namer(mut self, namer: ScratchNamer) -> Self {
        self.scratch_namer = namer;
        self
    }

    /// Returns the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the dialect.
    #[must_use]
    pub fn dialect(&self) -> &D {
        &self.dialect
    }

    /// Validates the inputs and derives the scratch name.
    fn prepare(&self, table: &str, schema: &TargetSchema) -> Result<String> {
        validate_identifier(table).map_err(|v| SyncError::invalid(table, v))?;
        schema.validate().map_err(|v| SyncError::invalid(table, v))?;

        let scratch = (self.scratch_namer)(table);
        validate_identifier(&scratch).map_err(|v| SyncError::invalid(table, v))?;
        if scratch == table {
            return Err(SyncError::IntegrityConflict {
                table: table.to_string(),
                scratch,
            });
        }
        Ok(scratch)
    }

    /// Makes `table` match `schema` exactly, preserving the data of common columns.
    ///
    /// The table is always rebuilt, even if it already has the target shape.
    /// On failure the transaction is rolled back and the original table, if
    /// any, is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidSchema`] before touching the store when the
    /// input is invalid, [`SyncError::IntegrityConflict`] when the scratch name
    /// is taken, and [`SyncError::Connection`] or [`SyncError::Statement`]
    /// when the store fails.
    pub async fn synchronize(&self, table: &str, schema: &TargetSchema) -> Result<SyncReport> {
        let scratch = self.prepare(table, schema)?;

        info!(
            table = %table,
            scratch = %scratch,
            dialect = self.dialect.name(),
            "Synchronizing table schema"
        );

        match self.run(table, &scratch, schema).await {
            Ok(report) => {
                info!(
                    table = %table,
                    created = report.created(),
                    preserved = ?report.plan.preserved,
                    added = ?report.plan.added,
                    dropped = ?report.plan.dropped,
                    rows_copied = report.rows_copied,
                    "Table schema synchronized"
                );
                Ok(report)
            }
            Err(err) => {
                error!(table = %table, error = %err, "Schema synchronization failed");
                Err(err)
            }
        }
    }

    /// Opens the transaction, rebuilds and commits, rolling back on failure.
    async fn run(&self, table: &str, scratch: &str, schema: &TargetSchema) -> Result<SyncReport> {
        let mut tx = self
            .store
            .begin()
            .await
            .map_err(|e| SyncError::from_store(table, SyncStep::Begin, e))?;

        match self.rebuild(&mut tx, table, scratch, schema).await {
            Ok(report) => {
                tx.commit()
                    .await
                    .map_err(|e| SyncError::from_store(table, SyncStep::Commit, e))?;
                Ok(report)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        table = %table,
                        error = %rollback_err,
                        "Rollback after failed synchronization also failed"
                    );
                } else {
                    debug!(table = %table, "Rolled back");
                }
                Err(err)
            }
        }
    }

    async fn rebuild(
        &self,
        tx: &mut S::Transaction,
        table: &str,
        scratch: &str,
        schema: &TargetSchema,
    ) -> Result<SyncReport> {
        let inspect = |e| SyncError::from_store(table, SyncStep::InspectCatalog, e);

        if tx.object_exists(scratch).await.map_err(inspect)? {
            return Err(SyncError::IntegrityConflict {
                table: table.to_string(),
                scratch: scratch.to_string(),
            });
        }

        let create = self.dialect.create_table_sql(scratch, schema);
        execute(tx, table, SyncStep::CreateScratch, &create).await?;

        let existing = if tx.table_exists(table).await.map_err(inspect)? {
            Some(tx.column_names(table).await.map_err(inspect)?)
        } else {
            None
        };

        let plan = RebuildPlan::compute(schema, existing.as_deref());
        debug!(table = %table, plan = ?plan, "Computed rebuild plan");

        let mut rows_copied = 0;
        for statement in plan.migration_statements(&self.dialect, table, scratch) {
            let affected = execute(tx, table, statement.step, &statement.sql).await?;
            if statement.step == SyncStep::CopyRows {
                rows_copied = affected;
            }
        }

        let violations = tx
            .foreign_key_violations()
            .await
            .map_err(|e| SyncError::from_store(table, SyncStep::CheckForeignKeys, e))?;
        if violations > 0 {
            return Err(SyncError::from_store(
                table,
                SyncStep::CheckForeignKeys,
                StoreError::statement(
                    "PRAGMA foreign_key_check",
                    format!("{violations} rows reference missing parent rows"),
                ),
            ));
        }

        Ok(SyncReport {
            table: table.to_string(),
            scratch: scratch.to_string(),
            plan,
            rows_copied,
        })
    }

    /// Computes what [`synchronize`](Self::synchronize) would do, without
    /// opening a transaction or executing anything.
    ///
    /// # Errors
    ///
    /// Fails on invalid input or when the catalog cannot be read.
    pub async fn preview(&self, table: &str, schema: &TargetSchema) -> Result<SyncPreview> {
        let scratch = self.prepare(table, schema)?;

        let existing = self
            .store
            .table_columns(table)
            .await
            .map_err(|e| SyncError::from_store(table, SyncStep::InspectCatalog, e))?;

        let plan = RebuildPlan::compute(schema, existing.as_deref());
        let statements = plan.statements(&self.dialect, table, &scratch, schema);

        Ok(SyncPreview {
            table: table.to_string(),
            scratch,
            plan,
            statements,
        })
    }
}

async fn execute<T: StoreTransaction>(
    tx: &mut T,
    table: &str,
    step: SyncStep,
    sql: &str,
) -> Result<u64> {
    debug!(sql = %sql, "Executing SQL");
    tx.execute(sql)
        .await
        .map_err(|e| SyncError::from_store(table, step, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::SqliteDialect;
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::{Arc, Mutex};

    /// What the recording store saw.
    #[derive(Debug, Default)]
    struct Journal {
        statements: Vec<String>,
        committed: bool,
        rolled_back: bool,
    }

    /// Store double: answers catalog questions from a fixed table map,
    /// records statements and fails the first statement starting with
    /// `fail_on`.
    #[derive(Clone, Default)]
    struct RecordingStore {
        tables: BTreeMap<String, Vec<String>>,
        indexes: BTreeSet<String>,
        fail_on: Option<&'static str>,
        fk_violations: u64,
        commit_fails: bool,
        unreachable: bool,
        journal: Arc<Mutex<Journal>>,
    }

    impl RecordingStore {
        fn with_table(mut self, name: &str, columns: &[&str]) -> Self {
            self.tables.insert(
                name.to_string(),
                columns.iter().map(|c| (*c).to_string()).collect(),
            );
            self
        }

        fn with_index(mut self, name: &str) -> Self {
            self.indexes.insert(name.to_string());
            self
        }

        fn failing_on(mut self, prefix: &'static str) -> Self {
            self.fail_on = Some(prefix);
            self
        }

        fn statements(&self) -> Vec<String> {
            self.journal.lock().unwrap().statements.clone()
        }

        fn committed(&self) -> bool {
            self.journal.lock().unwrap().committed
        }

        fn rolled_back(&self) -> bool {
            self.journal.lock().unwrap().rolled_back
        }
    }

    struct RecordingTransaction {
        store: RecordingStore,
    }

    impl SchemaStore for RecordingStore {
        type Transaction = RecordingTransaction;

        async fn begin(&self) -> std::result::Result<RecordingTransaction, StoreError> {
            if self.unreachable {
                return Err(StoreError::connection("connection refused"));
            }
            Ok(RecordingTransaction {
                store: self.clone(),
            })
        }

        async fn table_columns(
            &self,
            table: &str,
        ) -> std::result::Result<Option<Vec<String>>, StoreError> {
            Ok(self.tables.get(table).cloned())
        }
    }

    impl StoreTransaction for RecordingTransaction {
        async fn execute(&mut self, sql: &str) -> std::result::Result<u64, StoreError> {
            self.store
                .journal
                .lock()
                .unwrap()
                .statements
                .push(sql.to_string());
            match self.store.fail_on {
                Some(prefix) if sql.starts_with(prefix) => {
                    Err(StoreError::statement(sql, "injected failure"))
                }
                _ => Ok(1),
            }
        }

        async fn table_exists(&mut self, table: &str) -> std::result::Result<bool, StoreError> {
            Ok(self.store.tables.contains_key(table))
        }

        async fn object_exists(&mut self, name: &str) -> std::result::Result<bool, StoreError> {
            Ok(self.store.tables.contains_key(name) || self.store.indexes.contains(name))
        }

        async fn column_names(
            &mut self,
            table: &str,
        ) -> std::result::Result<Vec<String>, StoreError> {
            Ok(self.store.tables.get(table).cloned().unwrap_or_default())
        }

        async fn foreign_key_violations(&mut self) -> std::result::Result<u64, StoreError> {
            Ok(self.store.fk_violations)
        }

        async fn commit(self) -> std::result::Result<(), StoreError> {
            if self.store.commit_fails {
                return Err(StoreError::statement("COMMIT", "database is locked"));
            }
            self.store.journal.lock().unwrap().committed = true;
            Ok(())
        }

        async fn rollback(self) -> std::result::Result<(), StoreError> {
            self.store.journal.lock().unwrap().rolled_back = true;
            Ok(())
        }
    }

    fn fixed_scratch(table: &str) -> String {
        format!("{table}_scratch")
    }

    fn synchronizer(store: RecordingStore) -> SchemaSynchronizer<RecordingStore, SqliteDialect> {
        SchemaSynchronizer::new(store, SqliteDialect::new()).with_scratch_namer(fixed_scratch)
    }

    fn posts_schema() -> TargetSchema {
        TargetSchema::new()
            .column("id", "INTEGER PRIMARY KEY")
            .column("slug", "TEXT")
            .column("title", "TEXT")
            .column("tags", "TEXT")
    }

    #[test]
    fn test_timestamped_scratch_name() {
        let name = timestamped_scratch_name("posts");
        assert!(name.starts_with("posts_temp_"));
        assert!(validate_identifier(&name).is_ok());
    }

    #[tokio::test]
    async fn test_statement_order_for_existing_table() {
        let store = RecordingStore::default().with_table("posts", &["id", "slug", "title"]);
        let sync = synchronizer(store.clone());

        let report = sync.synchronize("posts", &posts_schema()).await.unwrap();

        let statements = store.statements();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TABLE \"posts_scratch\""));
        assert_eq!(
            statements[1],
            "INSERT INTO \"posts_scratch\" (\"id\", \"slug\", \"title\") \
             SELECT \"id\", \"slug\", \"title\" FROM \"posts\""
        );
        assert_eq!(statements[2], "DROP TABLE \"posts\"");
        assert_eq!(statements[3], "ALTER TABLE \"posts_scratch\" RENAME TO \"posts\"");
        assert!(store.committed());
        assert!(!store.rolled_back());

        assert!(!report.created());
        assert_eq!(report.plan.added, vec!["tags".to_string()]);
        assert_eq!(report.rows_copied, 1);
    }

    #[tokio::test]
    async fn test_missing_table_is_created_without_copy_or_drop() {
        let store = RecordingStore::default();
        let report = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap();

        let statements = store.statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[0].starts_with("CREATE TABLE"));
        assert!(statements[1].starts_with("ALTER TABLE"));
        assert!(report.created());
        assert_eq!(report.rows_copied, 0);
    }

    #[tokio::test]
    async fn test_copy_failure_rolls_back() {
        let store = RecordingStore::default()
            .with_table("posts", &["id", "title"])
            .failing_on("INSERT INTO");

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::Statement { step: SyncStep::CopyRows, ref table, .. } if table == "posts"
        ));
        assert!(store.rolled_back());
        assert!(!store.committed());
        // Nothing after the failed copy was attempted.
        assert_eq!(store.statements().len(), 2);
    }

    #[tokio::test]
    async fn test_rename_failure_rolls_back() {
        let store = RecordingStore::default()
            .with_table("posts", &["id"])
            .failing_on("ALTER TABLE");

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(SyncStep::RenameScratch));
        assert!(store.rolled_back());
    }

    #[tokio::test]
    async fn test_unreachable_store() {
        let store = RecordingStore {
            unreachable: true,
            ..RecordingStore::default()
        };

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Connection { .. }));
        assert!(store.statements().is_empty());
    }

    #[tokio::test]
    async fn test_scratch_collision() {
        let store = RecordingStore::default()
            .with_table("posts", &["id"])
            .with_table("posts_scratch", &["x"]);

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SyncError::IntegrityConflict { ref scratch, .. } if scratch == "posts_scratch"
        ));
        assert!(store.statements().is_empty());
        assert!(store.rolled_back());
    }

    #[tokio::test]
    async fn test_scratch_name_taken_by_index() {
        let store = RecordingStore::default()
            .with_table("posts", &["id"])
            .with_index("posts_scratch");

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::IntegrityConflict { .. }));
        assert!(store.statements().is_empty());
    }

    #[tokio::test]
    async fn test_dangling_foreign_keys_roll_back() {
        let store = RecordingStore {
            fk_violations: 2,
            ..RecordingStore::default()
        }
        .with_table("posts", &["id"]);

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(SyncStep::CheckForeignKeys));
        assert!(err.to_string().contains("2 rows"));
        assert!(store.rolled_back());
        assert!(!store.committed());
    }

    #[tokio::test]
    async fn test_commit_failure_is_reported() {
        let store = RecordingStore {
            commit_fails: true,
            ..RecordingStore::default()
        }
        .with_table("posts", &["id"]);

        let err = synchronizer(store.clone())
            .synchronize("posts", &posts_schema())
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(SyncStep::Commit));
        assert_eq!(err.table(), "posts");
        assert!(!store.committed());
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_store() {
        let store = RecordingStore::default();
        let sync = synchronizer(store.clone());

        let err = sync
            .synchronize("posts; DROP TABLE users", &posts_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidSchema { .. }));

        let err = sync.synchronize("posts", &TargetSchema::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::InvalidSchema { .. }));

        assert!(store.statements().is_empty());
        assert!(!store.rolled_back());
    }

    #[tokio::test]
    async fn test_preview_executes_nothing() {
        let store = RecordingStore::default().with_table("posts", &["id", "legacy"]);
        let preview = synchronizer(store.clone())
            .preview("posts", &posts_schema())
            .await
            .unwrap();

        assert_eq!(preview.scratch, "posts_scratch");
        assert_eq!(preview.plan.dropped, vec!["legacy".to_string()]);
        assert_eq!(preview.statements.len(), 4);
        assert!(store.statements().is_empty());
        assert!(!store.committed());
    }
}
