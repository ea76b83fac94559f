//! Rebuild planning.
//!
//! Compares a target schema with the columns a table currently has and lays
//! out the statements that turn one into the other. Nothing here touches the
//! store.

use crate::dialect::SchemaDialect;
use crate::error::SyncStep;
use crate::schema::TargetSchema;

/// A statement together with the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStatement {
    /// Step the statement implements.
    pub step: SyncStep,
    /// SQL text.
    pub sql: String,
}

impl PlannedStatement {
    fn new(step: SyncStep, sql: String) -> Self {
        Self { step, sql }
    }
}

/// How a table's columns change during a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildPlan {
    /// Whether the table existed before the rebuild.
    pub table_existed: bool,
    /// Columns present before and after, in target order. Their data is copied.
    pub preserved: Vec<String>,
    /// Target columns the table did not have, in target order.
    pub added: Vec<String>,
    /// Existing columns absent from the target, in their existing order.
    /// Their data is discarded.
    pub dropped: Vec<String>,
}

impl RebuildPlan {
    /// Computes the plan. `existing` is `None` when the table does not exist.
    #[must_use]
    pub fn compute(schema: &TargetSchema, existing: Option<&[String]>) -> Self {
        let Some(existing) = existing else {
            return Self {
                table_existed: false,
                preserved: Vec::new(),
                added: schema.column_names().map(str::to_string).collect(),
                dropped: Vec::new(),
            };
        };

        let (preserved, added) = schema
            .column_names()
            .map(str::to_string)
            .partition(|name| existing.contains(name));

        let dropped = existing
            .iter()
            .filter(|name| !schema.contains(name))
            .cloned()
            .collect();

        Self {
            table_existed: true,
            preserved,
            added,
            dropped,
        }
    }

    /// Returns whether rows will be copied from the old table.
    #[must_use]
    pub fn copies_rows(&self) -> bool {
        self.table_existed && !self.preserved.is_empty()
    }

    /// Statements that run after the scratch table has been created: copy
    /// (when there are preserved columns), drop (when the table existed) and
    /// rename.
    pub fn migration_statements<D: SchemaDialect + ?Sized>(
        &self,
        dialect: &D,
        table: &str,
        scratch: &str,
    ) -> Vec<PlannedStatement> {
        let mut statements = Vec::with_capacity(3);

        if self.copies_rows() {
            statements.push(PlannedStatement::new(
                SyncStep::CopyRows,
                dialect.copy_rows_sql(table, scratch, &self.preserved),
            ));
        }

        if self.table_existed {
            statements.push(PlannedStatement::new(
                SyncStep::DropOriginal,
                dialect.drop_table_sql(table),
            ));
        }

        statements.push(PlannedStatement::new(
            SyncStep::RenameScratch,
            dialect.rename_table_sql(scratch, table),
        ));

        statements
    }

    /// Every statement of the rebuild, starting with the scratch table creation.
    pub fn statements<D: SchemaDialect + ?Sized>(
        &self,
        dialect: &D,
        table: &str,
        scratch: &str,
        schema: &TargetSchema,
    ) -> Vec<PlannedStatement> {
        let mut statements = vec![PlannedStatement::new(
            SyncStep::CreateScratch,
            dialect.create_table_sql(scratch, schema),
        )];
        statements.extend(self.migration_statements(dialect, table, scratch));
        statements
    }
}
