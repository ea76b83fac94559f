//! Error types for post storage.

use thiserror::Error;

/// Post storage errors.
#[derive(Debug, Error)]
pub enum PostError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The `posts` table could not be synchronized at startup.
    #[error(transparent)]
    Schema(#[from] folio_schema::SyncError),

    /// No post has this id.
    #[error("post {0} not found")]
    NotFound(i64),

    /// A post kind outside `intro`, `tool`, `note`, `link`.
    #[error("unknown post kind: {0}")]
    UnknownKind(String),

    /// A stored row could not be turned into a post.
    #[error("malformed row for post {id}: {reason}")]
    MalformedRow {
        /// Id of the offending row.
        id: i64,
        /// What was wrong with it.
        reason: String,
    },

    /// Tags could not be encoded or decoded.
    #[error("tags encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for post operations.
pub type Result<T> = std::result::Result<T, PostError>;
