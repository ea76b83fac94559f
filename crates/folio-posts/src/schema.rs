//! Declared shape of the `posts` table.

use folio_schema::TargetSchema;

/// Name of the posts table.
pub const POSTS_TABLE: &str = "posts";

/// Columns the `posts` table is synchronized to at startup.
#[must_use]
pub fn posts_schema() -> TargetSchema {
    TargetSchema::new()
        .column("id", "INTEGER PRIMARY KEY")
        .column("slug", "TEXT UNIQUE NOT NULL")
        .column("type", "TEXT NOT NULL")
        .column("title", "TEXT NOT NULL")
        .column("description", "TEXT")
        .column("tags", "TEXT")
        .column("featured", "INTEGER DEFAULT 0")
        .column("date", "TEXT")
        .column("content", "TEXT")
        .column("status", "TEXT")
        .column("url", "TEXT")
        .column("tool_name", "TEXT")
}
