//! SQLite store backed by a `sqlx` pool.
//!
//! A rebuild transaction runs on a connection taken out of the pool with
//! foreign key enforcement switched off, following SQLite's procedure for
//! altering a table: `PRAGMA foreign_keys = OFF`, `BEGIN IMMEDIATE`, the
//! rebuild, `PRAGMA foreign_key_check`, `COMMIT`, then the pragma restored.
//! The pragma is a no-op inside a transaction, which is why the transaction
//! is driven with plain statements rather than `Pool::begin`.

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool};
use tracing::warn;

use super::{SchemaStore, StoreError, StoreTransaction};

const TABLE_EXISTS_SQL: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";

const OBJECT_EXISTS_SQL: &str = "SELECT COUNT(*) FROM sqlite_master WHERE name = ?1 COLLATE NOCASE";

const COLUMN_NAMES_SQL: &str = "SELECT name FROM pragma_table_info(?1) ORDER BY cid";

const FOREIGN_KEY_CHECK_SQL: &str = "SELECT COUNT(*) FROM pragma_foreign_key_check";

/// Maps a driver error, separating connectivity failures from rejected statements.
fn classify(sql: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => StoreError::connection(err),
        other => StoreError::statement(sql, other),
    }
}

async fn run(conn: &mut PoolConnection<Sqlite>, sql: &str) -> Result<u64, StoreError> {
    let result = sqlx::query(sql)
        .execute(&mut **conn)
        .await
        .map_err(|e| classify(sql, e))?;
    Ok(result.rows_affected())
}

/// [`SchemaStore`] over a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Creates a store using `pool`.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl SchemaStore for SqliteStore {
    type Transaction = SqliteTransaction;

    async fn begin(&self) -> Result<SqliteTransaction, StoreError> {
        let mut conn = self.pool.acquire().await.map_err(StoreError::connection)?;

        let enforced: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| classify("PRAGMA foreign_keys", e))?;
        let foreign_keys = enforced != 0;

        if foreign_keys {
            run(&mut conn, "PRAGMA foreign_keys = OFF").await?;
        }

        let mut tx = SqliteTransaction {
            conn,
            foreign_keys,
            open: false,
        };
        if let Err(err) = run(&mut tx.conn, "BEGIN IMMEDIATE").await {
            tx.restore_foreign_keys().await;
            return Err(err);
        }
        tx.open = true;
        Ok(tx)
    }

    async fn table_columns(&self, table: &str) -> Result<Option<Vec<String>>, StoreError> {
        let count: i64 = sqlx::query_scalar(TABLE_EXISTS_SQL)
            .bind(table)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(TABLE_EXISTS_SQL, e))?;
        if count == 0 {
            return Ok(None);
        }

        let columns: Vec<String> = sqlx::query_scalar(COLUMN_NAMES_SQL)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| classify(COLUMN_NAMES_SQL, e))?;
        Ok(Some(columns))
    }
}

/// Open SQLite rebuild transaction.
///
/// Dropped while open, the connection is closed instead of returned to the
/// pool; SQLite discards the uncommitted transaction and no connection with
/// foreign keys switched off is handed out again.
pub struct SqliteTransaction {
    conn: PoolConnection<Sqlite>,
    foreign_keys: bool,
    open: bool,
}

impl SqliteTransaction {
    /// Switches foreign key enforcement back on if it was on before.
    /// A connection that cannot be restored is closed on release.
    async fn restore_foreign_keys(&mut self) {
        if !self.foreign_keys {
            return;
        }
        if let Err(err) = run(&mut self.conn, "PRAGMA foreign_keys = ON").await {
            warn!(error = %err, "Could not restore foreign key enforcement, closing connection");
            self.conn.close_on_drop();
        }
    }

    async fn count(&mut self, sql: &str, name: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar(sql)
            .bind(name)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| classify(sql, e))
    }
}

impl Drop for SqliteTransaction {
    fn drop(&mut self) {
        if self.open {
            self.conn.close_on_drop();
        }
    }
}

impl StoreTransaction for SqliteTransaction {
    async fn execute(&mut self, sql: &str) -> Result<u64, StoreError> {
        run(&mut self.conn, sql).await
    }

    async fn table_exists(&mut self, table: &str) -> Result<bool, StoreError> {
        Ok(self.count(TABLE_EXISTS_SQL, table).await? > 0)
    }

    async fn object_exists(&mut self, name: &str) -> Result<bool, StoreError> {
        Ok(self.count(OBJECT_EXISTS_SQL, name).await? > 0)
    }

    async fn column_names(&mut self, table: &str) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar(COLUMN_NAMES_SQL)
            .bind(table)
            .fetch_all(&mut *self.conn)
            .await
            .map_err(|e| classify(COLUMN_NAMES_SQL, e))
    }

    async fn foreign_key_violations(&mut self) -> Result<u64, StoreError> {
        if !self.foreign_keys {
            return Ok(0);
        }
        let count: i64 = sqlx::query_scalar(FOREIGN_KEY_CHECK_SQL)
            .fetch_one(&mut *self.conn)
            .await
            .map_err(|e| classify(FOREIGN_KEY_CHECK_SQL, e))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if let Err(err) = run(&mut self.conn, "COMMIT").await {
            // A failed COMMIT can leave the transaction open.
            if run(&mut self.conn, "ROLLBACK").await.is_err() {
                return Err(err);
            }
            self.open = false;
            self.restore_foreign_keys().await;
            return Err(err);
        }
        self.open = false;
        self.restore_foreign_keys().await;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        run(&mut self.conn, "ROLLBACK").await?;
        self.open = false;
        self.restore_foreign_keys().await;
        Ok(())
    }
}
