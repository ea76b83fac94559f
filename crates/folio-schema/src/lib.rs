//! Data-preserving schema synchronization.
//!
//! `folio-schema` makes a table match a declared list of columns at startup.
//! Instead of versioned migration files, the application states the columns
//! it wants and the synchronizer rebuilds the table to match:
//!
//! 1. create a scratch table with the target columns,
//! 2. copy every column the old and new table share,
//! 3. drop the old table,
//! 4. rename the scratch table,
//!
//! all inside a single transaction.
//!
//! # Architecture
//!
//! - **Schema** - [`TargetSchema`] and identifier validation
//! - **Plan** - Diffs existing columns against the target and lays out statements
//! - **Dialect** - Database-specific SQL generation
//! - **Store** - Transaction and catalog capabilities ([`SqliteStore`] for `sqlx`)
//! - **Synchronizer** - Runs the rebuild and rolls back on any failure
//!
//! # Example
//!
//! ```rust,ignore
//! use folio_schema::prelude::*;
//!
//! let schema = TargetSchema::new()
//!     .column("id", "INTEGER PRIMARY KEY")
//!     .column("slug", "TEXT UNIQUE NOT NULL")
//!     .column("featured", "INTEGER DEFAULT 0");
//!
//! let synchronizer = SchemaSynchronizer::new(SqliteStore::new(pool), SqliteDialect::new());
//! let report = synchronizer.synchronize("posts", &schema).await?;
//! ```

pub mod dialect;
pub mod error;
pub mod plan;
pub mod schema;
pub mod store;
pub mod synchronizer;

pub use dialect::{SchemaDialect, SqliteDialect};
pub use error::{Result, SyncError, SyncStep};
pub use plan::{PlannedStatement, RebuildPlan};
pub use schema::{validate_identifier, ColumnDefinition, SchemaViolation, TargetSchema};
pub use store::{SchemaStore, SqliteStore, StoreError, StoreTransaction};
pub use synchronizer::{SchemaSynchronizer, SyncPreview, SyncReport};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::dialect::{SchemaDialect, SqliteDialect};
    pub use crate::error::{Result, SyncError, SyncStep};
    pub use crate::schema::{ColumnDefinition, TargetSchema};
    pub use crate::store::{SchemaStore, SqliteStore, StoreTransaction};
    pub use crate::synchronizer::{SchemaSynchronizer, SyncPreview, SyncReport};
}
