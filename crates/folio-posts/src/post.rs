//! Post model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PostError;

/// What a post is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    /// The single introduction entry.
    Intro,
    /// An embedded utility tool.
    Tool,
    /// A written note.
    Note,
    /// A recommended external link.
    Link,
}

impl PostKind {
    /// All kinds.
    pub const ALL: [Self; 4] = [Self::Intro, Self::Tool, Self::Note, Self::Link];

    /// Returns the stored representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::Tool => "tool",
            Self::Note => "note",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PostKind {
    type Err = PostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| PostError::UnknownKind(s.to_string()))
    }
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    /// Row id.
    pub id: i64,
    /// URL slug, unique.
    pub slug: String,
    /// Kind of post.
    #[serde(rename = "type")]
    pub kind: PostKind,
    /// Title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Tags.
    pub tags: Vec<String>,
    /// Shown on the home page.
    pub featured: bool,
    /// Publication date.
    pub date: DateTime<Utc>,
    /// Long-form content. Intros have none.
    pub content: Option<String>,
    /// Tool version, tools only.
    pub status: Option<String>,
    /// Target site, links only.
    pub url: Option<String>,
    /// Embedded tool identifier, tools only.
    pub tool_name: Option<String>,
}

/// A post that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPost {
    /// URL slug, unique.
    pub slug: String,
    /// Kind of post.
    #[serde(rename = "type")]
    pub kind: PostKind,
    /// Title.
    pub title: String,
    /// Short description.
    pub description: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Shown on the home page.
    #[serde(default)]
    pub featured: bool,
    /// Publication date.
    pub date: DateTime<Utc>,
    /// Long-form content.
    #[serde(default)]
    pub content: Option<String>,
    /// Tool version.
    #[serde(default)]
    pub status: Option<String>,
    /// Target site.
    #[serde(default)]
    pub url: Option<String>,
    /// Embedded tool identifier.
    #[serde(default)]
    pub tool_name: Option<String>,
}

impl NewPost {
    /// Creates a post with the required fields; everything else is empty.
    #[must_use]
    pub fn new(
        slug: impl Into<String>,
        kind: PostKind,
        title: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            slug: slug.into(),
            kind,
            title: title.into(),
            description: String::new(),
            tags: Vec::new(),
            featured: false,
            date,
            content: None,
            status: None,
            url: None,
            tool_name: None,
        }
    }

    /// Attaches the row id assigned by the database.
    #[must_use]
    pub fn with_id(self, id: i64) -> Post {
        Post {
            id,
            slug: self.slug,
            kind: self.kind,
            title: self.title,
            description: self.description,
            tags: self.tags,
            featured: self.featured,
            date: self.date,
            content: self.content,
            status: self.status,
            url: self.url,
            tool_name: self.tool_name,
        }
    }
}

impl From<Post> for NewPost {
    fn from(post: Post) -> Self {
        Self {
            slug: post.slug,
            kind: post.kind,
            title: post.title,
            description: post.description,
            tags: post.tags,
            featured: post.featured,
            date: post.date,
            content: post.content,
            status: post.status,
            url: post.url,
            tool_name: post.tool_name,
        }
    }
}

/// Formats a date the way it is stored: RFC 3339, UTC, milliseconds.
#[must_use]
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored date.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in PostKind::ALL {
            assert_eq!(kind.as_str().parse::<PostKind>().unwrap(), kind);
        }
        assert!(matches!(
            "essay".parse::<PostKind>(),
            Err(PostError::UnknownKind(k)) if k == "essay"
        ));
    }

    #[test]
    fn test_date_format_matches_iso_strings() {
        let date = Utc.with_ymd_and_hms(2025, 10, 12, 0, 0, 0).unwrap();
        assert_eq!(format_date(&date), "2025-10-12T00:00:00.000Z");
        assert_eq!(parse_date("2025-10-12T00:00:00.000Z").unwrap(), date);
    }

    #[test]
    fn test_new_post_deserializes_with_defaults() {
        let json = r#"{
            "slug": "raycast-store",
            "type": "link",
            "title": "Raycast Store",
            "description": "Extensions",
            "date": "2025-12-08T00:00:00Z",
            "url": "https://raycast.com"
        }"#;
        let post: NewPost = serde_json::from_str(json).unwrap();
        assert_eq!(post.kind, PostKind::Link);
        assert!(post.tags.is_empty());
        assert!(!post.featured);
        assert_eq!(post.url.as_deref(), Some("https://raycast.com"));
    }
}
