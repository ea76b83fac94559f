//! Relational store capabilities used by the synchronizer.
//!
//! The synchronizer never owns a connection. It is handed a [`SchemaStore`],
//! which opens [`StoreTransaction`]s and answers catalog questions, so other
//! backends (or test doubles) can stand in for SQLite.

mod sqlite;

pub use sqlite::{SqliteStore, SqliteTransaction};

/// Boxed error source carried by [`StoreError`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors reported by a relational store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached or the connection broke.
    #[error("store unreachable: {source}")]
    Connection {
        /// Driver error.
        #[source]
        source: BoxError,
    },

    /// The store rejected a statement.
    #[error("statement `{sql}` failed: {source}")]
    Statement {
        /// The statement text.
        sql: String,
        /// Driver error.
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    /// Creates a connection error.
    #[must_use]
    pub fn connection(source: impl Into<BoxError>) -> Self {
        Self::Connection {
            source: source.into(),
        }
    }

    /// Creates a statement error for `sql`.
    #[must_use]
    pub fn statement(sql: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Statement {
            sql: sql.into(),
            source: source.into(),
        }
    }

    /// Returns whether this is a connection error.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

/// A transactional relational store.
#[allow(async_fn_in_trait)]
pub trait SchemaStore {
    /// Transaction handle type.
    type Transaction: StoreTransaction;

    /// Opens a write transaction, holding the write lock from the start.
    ///
    /// Foreign key actions must not fire inside the transaction: dropping a
    /// referenced table may neither cascade into nor be blocked by the tables
    /// referencing it.
    async fn begin(&self) -> Result<Self::Transaction, StoreError>;

    /// Returns the ordered column names of `table`, or `None` if it does not
    /// exist. Runs outside any transaction.
    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, StoreError>;
}

/// An open transaction.
///
/// Dropping a transaction without committing it must roll it back.
#[allow(async_fn_in_trait)]
pub trait StoreTransaction {
    /// Executes a statement and returns the number of rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64, StoreError>;

    /// Returns whether a table called `table` exists.
    async fn table_exists(&mut self, table: &str) -> Result<bool, StoreError>;

    /// Returns whether any schema object (table, index, view, trigger) is
    /// called `name`.
    async fn object_exists(&mut self, name: &str) -> Result<bool, StoreError>;

    /// Returns the column names of `table` in column order.
    async fn column_names(&mut self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Counts rows that violate a foreign key constraint the store enforces
    /// outside this transaction. Zero when enforcement is off.
    async fn foreign_key_violations(&mut self) -> Result<u64, StoreError>;

    /// Commits the transaction. If the commit fails, the transaction is rolled back.
    async fn commit(self) -> Result<(), StoreError>;

    /// Rolls the transaction back.
    async fn rollback(self) -> Result<(), StoreError>;
}
