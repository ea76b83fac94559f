//! Schema files for `folio sync --schema`.

use std::path::Path;

use anyhow::Context;
use folio_schema::TargetSchema;
use serde::Deserialize;

/// A table and the columns it should end up with.
///
/// ```json
/// { "table": "posts", "columns": [{ "name": "id", "type": "INTEGER PRIMARY KEY" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchemaFile {
    pub table: String,
    pub columns: TargetSchema,
}

impl SchemaFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read schema file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid schema file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_schema_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "table": "bookmarks",
                "columns": [
                    {{ "name": "id", "type": "INTEGER PRIMARY KEY" }},
                    {{ "name": "url", "type": "TEXT NOT NULL" }}
                ]
            }}"#
        )
        .unwrap();

        let schema = SchemaFile::load(file.path()).unwrap();
        assert_eq!(schema.table, "bookmarks");
        assert_eq!(
            schema.columns.column_names().collect::<Vec<_>>(),
            vec!["id", "url"]
        );
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = SchemaFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "table": "posts" }}"#).unwrap();
        assert!(SchemaFile::load(file.path()).is_err());
    }
}
