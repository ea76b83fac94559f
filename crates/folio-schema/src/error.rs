//! Error types for schema synchronization.

use std::fmt;

use crate::schema::SchemaViolation;
use crate::store::StoreError;

/// The step of a synchronization run an error happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncStep {
    /// Opening the write transaction.
    Begin,
    /// Creating the scratch table with the target schema.
    CreateScratch,
    /// Reading the catalog (table existence, column names).
    InspectCatalog,
    /// Copying the preserved columns into the scratch table.
    CopyRows,
    /// Dropping the original table.
    DropOriginal,
    /// Renaming the scratch table to the target name.
    RenameScratch,
    /// Checking that no foreign key points at a missing row.
    CheckForeignKeys,
    /// Committing the transaction.
    Commit,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Begin => "beginning the transaction",
            Self::CreateScratch => "creating the scratch table",
            Self::InspectCatalog => "inspecting the catalog",
            Self::CopyRows => "copying preserved rows",
            Self::DropOriginal => "dropping the original table",
            Self::RenameScratch => "renaming the scratch table",
            Self::CheckForeignKeys => "checking foreign keys",
            Self::Commit => "committing",
        })
    }
}

/// Errors that can occur while synchronizing a table.
///
/// Every variant names the table being synchronized. Whenever a transaction
/// was open, it has been rolled back before the error is returned.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The table name or target schema failed validation. The store was not touched.
    #[error("Invalid target schema for table '{table}': {violation}")]
    InvalidSchema {
        /// Table being synchronized.
        table: String,
        /// What was wrong.
        violation: SchemaViolation,
    },

    /// The relational store could not be reached.
    #[error("Relational store unreachable while synchronizing '{table}': {source}")]
    Connection {
        /// Table being synchronized.
        table: String,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// A statement was rejected (malformed SQL, constraint violation, ...).
    #[error("Synchronizing '{table}' failed while {step}: {source}")]
    Statement {
        /// Table being synchronized.
        table: String,
        /// Step that failed.
        step: SyncStep,
        /// Underlying store error.
        #[source]
        source: StoreError,
    },

    /// The derived scratch table name is already taken.
    #[error("Scratch table '{scratch}' for '{table}' collides with an existing table")]
    IntegrityConflict {
        /// Table being synchronized.
        table: String,
        /// The colliding scratch name.
        scratch: String,
    },
}

impl SyncError {
    /// Classifies a store error raised during `step`.
    pub(crate) fn from_store(table: &str, step: SyncStep, source: StoreError) -> Self {
        if source.is_connection() {
            Self::Connection {
                table: table.to_string(),
                source,
            }
        } else {
            Self::Statement {
                table: table.to_string(),
                step,
                source,
            }
        }
    }

    pub(crate) fn invalid(table: &str, violation: SchemaViolation) -> Self {
        Self::InvalidSchema {
            table: table.to_string(),
            violation,
        }
    }

    /// Returns the table that was being synchronized.
    #[must_use]
    pub fn table(&self) -> &str {
        match self {
            Self::InvalidSchema { table, .. }
            | Self::Connection { table, .. }
            | Self::Statement { table, .. }
            | Self::IntegrityConflict { table, .. } => table,
        }
    }

    /// Returns the failing step for statement errors.
    #[must_use]
    pub fn step(&self) -> Option<SyncStep> {
        match self {
            Self::Statement { step, .. } => Some(*step),
            _ => None,
        }
    }
}

/// Result type for synchronization.
pub type Result<T> = std::result::Result<T, SyncError>;
