//! SQLite dialect.
//!
//! SQLite cannot alter a column in place, so every synchronization uses the
//! table recreation strategy: create a new table, copy data, drop the old
//! table, rename the new table. All four statements are transactional in
//! SQLite.

use crate::schema::TargetSchema;

use super::SchemaDialect;

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SchemaDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn create_table_sql(&self, table: &str, schema: &TargetSchema) -> String {
        let col_defs: Vec<String> = schema
            .columns()
            .iter()
            .map(|c| self.column_definition(c))
            .collect();

        format!(
            "CREATE TABLE {} (\n  {}\n)",
            self.quote_identifier(table),
            col_defs.join(",\n  ")
        )
    }

    fn copy_rows_sql(&self, from: &str, to: &str, columns: &[String]) -> String {
        let list = self.column_list(columns);
        format!(
            "INSERT INTO {} ({list}) SELECT {list} FROM {}",
            self.quote_identifier(to),
            self.quote_identifier(from)
        )
    }

    fn drop_table_sql(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote_identifier(table))
    }

    fn rename_table_sql(&self, old_name: &str, new_name: &str) -> String {
        format!(
            "ALTER TABLE {} RENAME TO {}",
            self.quote_identifier(old_name),
            self.quote_identifier(new_name)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDefinition;

    fn dialect() -> SqliteDialect {
        SqliteDialect::new()
    }

    #[test]
    fn test_create_table_keeps_column_order_and_clauses() {
        let schema = TargetSchema::new()
            .column("id", "INTEGER PRIMARY KEY")
            .column("slug", "TEXT UNIQUE NOT NULL")
            .column("featured", "INTEGER DEFAULT 0");

        let sql = dialect().create_table_sql("posts_temp_1", &schema);
        assert_eq!(
            sql,
            "CREATE TABLE \"posts_temp_1\" (\n  \"id\" INTEGER PRIMARY KEY,\n  \
             \"slug\" TEXT UNIQUE NOT NULL,\n  \"featured\" INTEGER DEFAULT 0\n)"
        );
    }

    #[test]
    fn test_column_without_type_clause() {
        let column = ColumnDefinition::new("anything", "  ");
        assert_eq!(dialect().column_definition(&column), "\"anything\"");
    }

    #[test]
    fn test_copy_rows() {
        let sql = dialect().copy_rows_sql(
            "posts",
            "posts_temp_1",
            &["id".to_string(), "title".to_string()],
        );
        assert_eq!(
            sql,
            "INSERT INTO \"posts_temp_1\" (\"id\", \"title\") SELECT \"id\", \"title\" FROM \"posts\""
        );
    }

    #[test]
    fn test_drop_table() {
        assert_eq!(dialect().drop_table_sql("posts"), "DROP TABLE \"posts\"");
    }

    #[test]
    fn test_rename_table() {
        assert_eq!(
            dialect().rename_table_sql("posts_temp_1", "posts"),
            "ALTER TABLE \"posts_temp_1\" RENAME TO \"posts\""
        );
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(dialect().quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
