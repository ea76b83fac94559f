//! Database dialect implementations.
//!
//! A dialect renders the statements of a table rebuild. Identifiers reaching
//! a dialect have already been validated; they are quoted regardless.

mod sqlite;

pub use sqlite::SqliteDialect;

use crate::schema::{ColumnDefinition, TargetSchema};

/// Trait for database-specific SQL generation.
pub trait SchemaDialect: Send + Sync {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Generates `CREATE TABLE` for `table` with the columns of `schema`, in order.
    fn create_table_sql(&self, table: &str, schema: &TargetSchema) -> String;

    /// Generates the statement copying `columns` from `from` into `to`.
    fn copy_rows_sql(&self, from: &str, to: &str, columns: &[String]) -> String;

    /// Generates `DROP TABLE`.
    fn drop_table_sql(&self, table: &str) -> String;

    /// Generates the statement renaming `old_name` to `new_name`.
    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String;

    /// Generates a column definition: quoted name followed by the raw type clause.
    fn column_definition(&self, column: &ColumnDefinition) -> String {
        let name = self.quote_identifier(&column.name);
        let clause = column.type_clause.trim();
        if clause.is_empty() {
            name
        } else {
            format!("{name} {clause}")
        }
    }

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Quotes and joins a list of column names.
    fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
