//! Target schema representation.
//!
//! A [`TargetSchema`] is the ordered list of columns a table must end up with
//! after synchronization. Column order is significant: it is the physical
//! column order of the rebuilt table.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is a valid regex")
});

/// Returns whether `clause` has a statement separator or comment opener
/// outside of quoted text.
///
/// String literals (`'...'`) and quoted identifiers (`"..."`, `` `...` ``,
/// `[...]`) are skipped, so `DEFAULT ';'` is accepted.
fn escapes_column_definition(clause: &str) -> bool {
    let mut chars = clause.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                // A doubled quote inside a literal reopens it on the next pass.
                for inner in chars.by_ref() {
                    if inner == close {
                        break;
                    }
                }
            }
            ';' => return true,
            '-' if chars.peek() == Some(&'-') => return true,
            '/' if chars.peek() == Some(&'*') => return true,
            _ => {}
        }
    }
    false
}

/// A precondition a table name or target schema failed to meet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaViolation {
    /// The table name is empty.
    #[error("table name is empty")]
    EmptyTableName,

    /// An identifier contains characters outside `[A-Za-z0-9_]` or starts with a digit.
    #[error("'{0}' is not a valid SQL identifier")]
    InvalidIdentifier(String),

    /// The target schema has no columns.
    #[error("target schema has no columns")]
    EmptySchema,

    /// Two columns share a name.
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),

    /// A type clause contains a statement separator or comment marker
    /// outside of quoted text.
    #[error("type clause '{clause}' of column '{column}' contains forbidden SQL")]
    UnsafeTypeClause {
        /// Column the clause belongs to.
        column: String,
        /// The offending clause.
        clause: String,
    },
}

/// Checks that `name` is a plain SQL identifier.
///
/// Identifiers are interpolated into SQL text, so only ASCII letters, digits
/// and underscores are accepted, and the first character may not be a digit.
///
/// # Errors
///
/// Returns [`SchemaViolation::EmptyTableName`] or
/// [`SchemaViolation::InvalidIdentifier`].
pub fn validate_identifier(name: &str) -> Result<(), SchemaViolation> {
    if name.is_empty() {
        return Err(SchemaViolation::EmptyTableName);
    }
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(SchemaViolation::InvalidIdentifier(name.to_string()))
    }
}

/// A single desired column: its name and raw type clause.
///
/// The type clause may carry constraints, e.g. `INTEGER PRIMARY KEY`,
/// `TEXT UNIQUE NOT NULL` or `INTEGER DEFAULT 0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    /// Column name.
    pub name: String,
    /// Type clause, including any constraints.
    #[serde(rename = "type")]
    pub type_clause: String,
}

impl ColumnDefinition {
    /// Creates a new column definition.
    #[must_use]
    pub fn new(name: impl Into<String>, type_clause: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_clause: type_clause.into(),
        }
    }

    fn validate(&self) -> Result<(), SchemaViolation> {
        if self.name.is_empty() {
            return Err(SchemaViolation::InvalidIdentifier(String::new()));
        }
        validate_identifier(&self.name)?;

        if escapes_column_definition(&self.type_clause) {
            return Err(SchemaViolation::UnsafeTypeClause {
                column: self.name.clone(),
                clause: self.type_clause.clone(),
            });
        }
        Ok(())
    }
}

/// Ordered set of columns a table must have after synchronization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSchema {
    columns: Vec<ColumnDefinition>,
}

impl TargetSchema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column.
    #[must_use]
    pub fn column(mut self, name: impl Into<String>, type_clause: impl Into<String>) -> Self {
        self.columns.push(ColumnDefinition::new(name, type_clause));
        self
    }

    /// Returns the columns in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    /// Returns the column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Gets a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Returns whether a column with this name is declared.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns whether no columns are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Checks every column name and type clause, and rejects empty schemas
    /// and duplicate names.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaViolation`] found.
    pub fn validate(&self) -> Result<(), SchemaViolation> {
        if self.columns.is_empty() {
            return Err(SchemaViolation::EmptySchema);
        }

        for (idx, column) in self.columns.iter().enumerate() {
            column.validate()?;
            if self.columns[..idx].iter().any(|c| c.name == column.name) {
                return Err(SchemaViolation::DuplicateColumn(column.name.clone()));
            }
        }
        Ok(())
    }
}

impl From<Vec<ColumnDefinition>> for TargetSchema {
    fn from(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }
}

impl FromIterator<ColumnDefinition> for TargetSchema {
    fn from_iter<I: IntoIterator<Item = ColumnDefinition>>(iter: I) -> Self {
        Self {
            columns: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a TargetSchema {
    type Item = &'a ColumnDefinition;
    type IntoIter = std::slice::Iter<'a, ColumnDefinition>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
