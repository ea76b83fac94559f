//! Post repository.
//!
//! A [`PostRepository`] can only be obtained through [`PostRepository::open`],
//! which synchronizes the `posts` table first. Nothing reads or writes posts
//! before the table has its declared shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use folio_schema::{SchemaSynchronizer, SqliteDialect, SqliteStore, SyncReport};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};

use crate::error::{PostError, Result};
use crate::filter::PostFilter;
use crate::post::{format_date, parse_date, NewPost, Post, PostKind};
use crate::schema::{posts_schema, POSTS_TABLE};

const COLUMNS: &str =
    "id, slug, type, title, description, tags, featured, date, content, status, url, tool_name";

const INSERT_SQL: &str = "INSERT INTO posts (
    slug, type, title, description, tags,
    featured, date, content, status, url, tool_name
) VALUES (?, ?, ?, ?, json(?), ?, ?, ?, ?, ?, ?)";

const UPDATE_SQL: &str = "UPDATE posts SET
    slug = ?, type = ?, title = ?, description = ?, tags = json(?),
    featured = ?, date = ?, content = ?, status = ?, url = ?, tool_name = ?
WHERE id = ?";

const UPSERT_SQL: &str = "INSERT INTO posts (
    id, slug, type, title, description, tags,
    featured, date, content, status, url, tool_name
) VALUES (?, ?, ?, ?, ?, json(?), ?, ?, ?, ?, ?, ?)
ON CONFLICT(id) DO UPDATE SET
    slug = excluded.slug,
    type = excluded.type,
    title = excluded.title,
    description = excluded.description,
    tags = excluded.tags,
    featured = excluded.featured,
    date = excluded.date,
    content = excluded.content,
    status = excluded.status,
    url = excluded.url,
    tool_name = excluded.tool_name";

const TAG_COUNTS_SQL: &str = "SELECT j.value AS tag_name, COUNT(*) AS tag_count
FROM posts, json_each(posts.tags) AS j
GROUP BY j.value";

/// Whether [`PostRepository::save`] inserted or updated.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// A new row was inserted.
    Created(Post),
    /// An existing row was updated.
    Updated(Post),
}

impl SaveOutcome {
    /// Returns the saved post.
    #[must_use]
    pub fn post(&self) -> &Post {
        match self {
            Self::Created(post) | Self::Updated(post) => post,
        }
    }
}

/// Turns a stored row into a [`Post`].
fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let id: i64 = row.try_get("id")?;
    let malformed = |reason: String| PostError::MalformedRow { id, reason };

    let raw_kind: String = row.try_get("type")?;
    let kind = raw_kind
        .parse::<PostKind>()
        .map_err(|_| malformed(format!("unknown kind '{raw_kind}'")))?;

    let tags = match row.try_get::<Option<String>, _>("tags")? {
        Some(raw) => serde_json::from_str::<Option<Vec<String>>>(&raw)
            .map_err(|e| malformed(format!("tags are not a JSON string array: {e}")))?
            .unwrap_or_default(),
        None => Vec::new(),
    };

    let raw_date: Option<String> = row.try_get("date")?;
    let raw_date = raw_date.ok_or_else(|| malformed("missing date".to_string()))?;
    let date = parse_date(&raw_date)
        .map_err(|e| malformed(format!("invalid date '{raw_date}': {e}")))?;

    let featured: Option<i64> = row.try_get("featured")?;

    Ok(Post {
        id,
        slug: row.try_get("slug")?,
        kind,
        title: row.try_get("title")?,
        description: row
            .try_get::<Option<String>, _>("description")?
            .unwrap_or_default(),
        tags,
        featured: featured.unwrap_or(0) != 0,
        date,
        content: row.try_get("content")?,
        status: row.try_get("status")?,
        url: row.try_get("url")?,
        tool_name: row.try_get("tool_name")?,
    })
}

/// CRUD and listing queries over the `posts` table.
#[derive(Debug, Clone)]
pub struct PostRepository {
    pool: SqlitePool,
}

impl PostRepository {
    /// Synchronizes the `posts` table to [`posts_schema`] and returns a
    /// repository on success.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Schema`] when the table cannot be synchronized.
    pub async fn open(pool: SqlitePool) -> Result<Self> {
        let report = Self::synchronize(&pool).await?;
        info!(
            table = POSTS_TABLE,
            created = report.created(),
            "Post repository ready"
        );
        Ok(Self { pool })
    }

    /// Runs the schema synchronizer for the `posts` table.
    pub async fn synchronize(pool: &SqlitePool) -> Result<SyncReport> {
        let synchronizer =
            SchemaSynchronizer::new(SqliteStore::new(pool.clone()), SqliteDialect::new());
        Ok(synchronizer
            .synchronize(POSTS_TABLE, &posts_schema())
            .await?)
    }

    /// Returns the underlying pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Inserts a post and returns it with its new id.
    pub async fn create(&self, post: &NewPost) -> Result<Post> {
        let tags = serde_json::to_string(&post.tags)?;
        let date = format_date(&post.date);

        let result = sqlx::query(INSERT_SQL)
            .bind(post.slug.as_str())
            .bind(post.kind.as_str())
            .bind(post.title.as_str())
            .bind(post.description.as_str())
            .bind(tags)
            .bind(post.featured)
            .bind(date)
            .bind(post.content.as_deref())
            .bind(post.status.as_deref())
            .bind(post.url.as_deref())
            .bind(post.tool_name.as_deref())
            .execute(&self.pool)
            .await?;

        let id = result.last_insert_rowid();
        debug!(id, slug = %post.slug, "Created post");
        Ok(post.clone().with_id(id))
    }

    /// Overwrites every field of the post with id `post.id`.
    pub async fn update(&self, post: &Post) -> Result<()> {
        let tags = serde_json::to_string(&post.tags)?;
        let date = format_date(&post.date);

        let result = sqlx::query(UPDATE_SQL)
            .bind(post.slug.as_str())
            .bind(post.kind.as_str())
            .bind(post.title.as_str())
            .bind(post.description.as_str())
            .bind(tags)
            .bind(post.featured)
            .bind(date)
            .bind(post.content.as_deref())
            .bind(post.status.as_deref())
            .bind(post.url.as_deref())
            .bind(post.tool_name.as_deref())
            .bind(post.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PostError::NotFound(post.id));
        }
        debug!(id = post.id, slug = %post.slug, "Updated post");
        Ok(())
    }

    /// Updates when `id` is a non-zero id, inserts otherwise.
    pub async fn save(&self, id: Option<i64>, post: NewPost) -> Result<SaveOutcome> {
        match id {
            Some(id) if id != 0 => {
                let post = post.with_id(id);
                self.update(&post).await?;
                Ok(SaveOutcome::Updated(post))
            }
            _ => Ok(SaveOutcome::Created(self.create(&post).await?)),
        }
    }

    /// Inserts the post with its own id, or overwrites the row holding that id.
    pub async fn upsert(&self, post: &Post) -> Result<()> {
        let tags = serde_json::to_string(&post.tags)?;
        let date = format_date(&post.date);

        sqlx::query(UPSERT_SQL)
            .bind(post.id)
            .bind(post.slug.as_str())
            .bind(post.kind.as_str())
            .bind(post.title.as_str())
            .bind(post.description.as_str())
            .bind(tags)
            .bind(post.featured)
            .bind(date)
            .bind(post.content.as_deref())
            .bind(post.status.as_deref())
            .bind(post.url.as_deref())
            .bind(post.tool_name.as_deref())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a post. Returns whether a row was removed.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Gets a post by id.
    pub async fn get(&self, id: i64) -> Result<Post> {
        let sql = format!("SELECT {COLUMNS} FROM posts WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PostError::NotFound(id))?;
        post_from_row(&row)
    }

    /// Gets a post by slug.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Post>> {
        let sql = format!("SELECT {COLUMNS} FROM posts WHERE slug = ? LIMIT 1");
        let row = sqlx::query(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    /// Returns every post in storage order.
    pub async fn all(&self) -> Result<Vec<Post>> {
        let sql = format!("SELECT {COLUMNS} FROM posts");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(post_from_row).collect()
    }

    /// Returns the posts matching `filter`, newest first.
    pub async fn filtered(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        let (sql, args) = filter.to_sql(COLUMNS, POSTS_TABLE);
        debug!(sql = %sql, "Filtering posts");

        let mut query = sqlx::query(&sql);
        for arg in &args {
            query = query.bind(arg.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(post_from_row).collect()
    }

    /// Counts stored posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Returns the most recent post date, or `None` when there are no dated posts.
    pub async fn last_post_date(&self) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT MAX(date) FROM posts")
            .fetch_one(&self.pool)
            .await?;

        raw.map(|raw| {
            parse_date(&raw).map_err(|e| PostError::MalformedRow {
                id: 0,
                reason: format!("invalid date '{raw}': {e}"),
            })
        })
        .transpose()
    }

    /// Counts how many posts carry each tag.
    pub async fn tag_counts(&self) -> Result<BTreeMap<String, i64>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(TAG_COUNTS_SQL)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().collect())
    }

    /// Returns the embedded tool name of the post with this slug.
    pub async fn tool_name(&self, slug: &str) -> Result<Option<String>> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT tool_name FROM posts WHERE slug = ? LIMIT 1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name.flatten())
    }
}
