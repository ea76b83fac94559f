//! Listing filters.

use std::str::FromStr;

use crate::error::PostError;
use crate::post::PostKind;

/// Filter for [`PostRepository::filtered`](crate::PostRepository::filtered).
///
/// `kind: None` means every kind; `search` matches title or description
/// as a substring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Only posts of this kind.
    pub kind: Option<PostKind>,
    /// Substring searched in title and description.
    pub search: Option<String>,
}

impl PostFilter {
    /// A filter matching every post.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restricts to one kind.
    #[must_use]
    pub fn kind(mut self, kind: PostKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Restricts to posts whose title or description contains `term`.
    /// An empty term is ignored.
    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        self.search = if term.is_empty() { None } else { Some(term) };
        self
    }

    /// Builds the `WHERE`/`ORDER BY` SQL and its bound arguments, newest first.
    #[must_use]
    pub fn to_sql(&self, columns: &str, table: &str) -> (String, Vec<String>) {
        let mut sql = format!("SELECT {columns} FROM {table} WHERE 1=1");
        let mut args = Vec::new();

        if let Some(kind) = self.kind {
            sql.push_str(" AND type = ?");
            args.push(kind.as_str().to_string());
        }

        if let Some(term) = &self.search {
            sql.push_str(" AND (title LIKE ? OR description LIKE ?)");
            let pattern = format!("%{term}%");
            args.push(pattern.clone());
            args.push(pattern);
        }

        sql.push_str(" ORDER BY date DESC");
        (sql, args)
    }
}

/// Parses a category as given on the command line: a kind, or `all`.
pub fn parse_category(category: &str) -> Result<Option<PostKind>, PostError> {
    if category == "all" {
        Ok(None)
    } else {
        PostKind::from_str(category).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered() {
        let (sql, args) = PostFilter::all().to_sql("*", "posts");
        assert_eq!(sql, "SELECT * FROM posts WHERE 1=1 ORDER BY date DESC");
        assert!(args.is_empty());
    }

    #[test]
    fn test_kind_and_search() {
        let (sql, args) = PostFilter::all()
            .kind(PostKind::Note)
            .search("rust")
            .to_sql("*", "posts");
        assert_eq!(
            sql,
            "SELECT * FROM posts WHERE 1=1 AND type = ? \
             AND (title LIKE ? OR description LIKE ?) ORDER BY date DESC"
        );
        assert_eq!(args, vec!["note", "%rust%", "%rust%"]);
    }

    #[test]
    fn test_empty_search_is_ignored() {
        assert_eq!(PostFilter::all().search(""), PostFilter::all());
    }

    #[test]
    fn test_parse_category() {
        assert_eq!(parse_category("all").unwrap(), None);
        assert_eq!(parse_category("tool").unwrap(), Some(PostKind::Tool));
        assert!(parse_category("video").is_err());
    }
}
