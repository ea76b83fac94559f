//! # folio-posts
//!
//! Storage for the posts of the folio site: notes, links, tools and a single
//! intro entry.
//!
//! The `posts` table is not created by migration files. Its columns are
//! declared in [`posts_schema`], and [`PostRepository::open`] synchronizes
//! the table to that declaration before handing out a repository, keeping
//! the data of every column that survives.
//!
//! ```ignore
//! use folio_posts::{PostFilter, PostKind, PostRepository};
//!
//! let repo = PostRepository::open(pool).await?;
//! let notes = repo
//!     .filtered(&PostFilter::all().kind(PostKind::Note).search("rust"))
//!     .await?;
//! ```

pub mod error;
pub mod filter;
pub mod post;
pub mod repository;
pub mod schema;
pub mod seed;

pub use error::{PostError, Result};
pub use filter::{parse_category, PostFilter};
pub use post::{NewPost, Post, PostKind};
pub use repository::{PostRepository, SaveOutcome};
pub use schema::{posts_schema, POSTS_TABLE};
pub use seed::{seed, seed_posts, SeedReport};
