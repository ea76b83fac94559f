//! Built-in seed posts.

use chrono::{DateTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::post::{Post, PostKind};
use crate::repository::PostRepository;

/// Result of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// Posts written.
    pub upserted: usize,
    /// Posts that failed and were skipped.
    pub failed: usize,
}

fn day(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|t| (*t).to_string()).collect()
}

/// The seed posts. Undated entries are stamped with `now`.
#[must_use]
pub fn seed_posts(now: DateTime<Utc>) -> Vec<Post> {
    vec![
        Post {
            id: 1,
            slug: "manifest".into(),
            kind: PostKind::Intro,
            title: "Manifesto".into(),
            description: "A second, external memory. A digital garden of notes on Go and \
                          TypeScript, finds from around the web and small automation tools."
                .into(),
            tags: Vec::new(),
            featured: true,
            date: now,
            content: None,
            status: None,
            url: None,
            tool_name: None,
        },
        Post {
            id: 2,
            slug: "json-para-go-struct".into(),
            kind: PostKind::Tool,
            title: "JSON to Go Struct".into(),
            description: "Instant converter with omitempty tags. Paste JSON, get a typed struct."
                .into(),
            tags: tags(&["golang", "tool", "productivity"]),
            featured: false,
            date: now,
            content: Some(
                "Converts JSON objects into Go structs. Nested types are detected \
                 automatically, `json:\"...\"` tags are generated and `omitempty` is added \
                 where appropriate. Runs locally through WASM."
                    .into(),
            ),
            status: Some("v1.4.2".into()),
            url: None,
            tool_name: None,
        },
        Post {
            id: 3,
            slug: "pattern-matching-em-ts".into(),
            kind: PostKind::Note,
            title: "Pattern Matching in TS".into(),
            description: "ts-pattern versus native switch statements for safer control flow."
                .into(),
            tags: tags(&["typescript", "patterns"]),
            featured: false,
            date: day(2025, 10, 12),
            content: Some(
                "Native switch/if control flow gets verbose. Libraries like ts-pattern bring \
                 pattern matching from functional languages.\n\n```typescript\n\
                 match(val).with({ status: \"error\" }, () => ...)\n```"
                    .into(),
            ),
            status: None,
            url: None,
            tool_name: None,
        },
        Post {
            id: 4,
            slug: "raycast-store".into(),
            kind: PostKind::Link,
            title: "Raycast Store".into(),
            description: "Essential scripts and extensions for productivity on the Mac.".into(),
            tags: tags(&["macos", "productivity"]),
            featured: false,
            date: now,
            content: None,
            status: None,
            url: Some("https://raycast.com".into()),
            tool_name: None,
        },
        Post {
            id: 5,
            slug: "goroutines-vs-threads".into(),
            kind: PostKind::Note,
            title: "Goroutines vs Threads".into(),
            description: "Notes on the Go scheduler and when context switching actually matters."
                .into(),
            tags: tags(&["golang", "performance"]),
            featured: false,
            date: day(2025, 12, 8),
            content: Some(
                "Goroutines are not OS threads. They are multiplexed onto a smaller number of \
                 OS threads, and the M:N scheduler is what keeps highly concurrent programs \
                 from stalling."
                    .into(),
            ),
            status: None,
            url: None,
            tool_name: None,
        },
        Post {
            id: 6,
            slug: "regex-tester-local".into(),
            kind: PostKind::Tool,
            title: "Regex Tester (Local)".into(),
            description: "Regex tester running entirely client side through WASM.".into(),
            tags: tags(&["tool", "webassembly"]),
            featured: true,
            date: now,
            content: Some(
                "A playground for regular expressions that never sends data to a server. \
                 Supports PCRE and JS syntax."
                    .into(),
            ),
            status: Some("Beta".into()),
            url: None,
            tool_name: None,
        },
        Post {
            id: 7,
            slug: "design-systems-repo".into(),
            kind: PostKind::Link,
            title: "Design Systems Repo".into(),
            description: "Curated collection of real design systems for UI reference.".into(),
            tags: tags(&["design", "ui"]),
            featured: false,
            date: now,
            content: None,
            status: None,
            url: Some("https://component.gallery".into()),
            tool_name: None,
        },
        Post {
            id: 8,
            slug: "zod-schema-validation".into(),
            kind: PostKind::Note,
            title: "Zod Schema Validation".into(),
            description: "Quick snippet for validating env vars in Next.js.".into(),
            tags: tags(&["typescript", "validation"]),
            featured: false,
            date: day(2025, 12, 28),
            content: Some(
                "Never start an app without validating its environment. Validating the config \
                 with Zod makes the app fail fast when something is missing.\n\n\
                 ```typescript\nz.object({ DATABASE_URL: z.string() })\n```"
                    .into(),
            ),
            status: None,
            url: None,
            tool_name: None,
        },
    ]
}

/// Upserts every seed post. A failing post is logged and skipped.
pub async fn seed(repo: &PostRepository, now: DateTime<Utc>) -> SeedReport {
    info!("Seeding posts");
    let mut report = SeedReport::default();

    for post in seed_posts(now) {
        match repo.upsert(&post).await {
            Ok(()) => report.upserted += 1,
            Err(err) => {
                warn!(id = post.id, slug = %post.slug, error = %err, "Failed to seed post");
                report.failed += 1;
            }
        }
    }

    info!(
        upserted = report.upserted,
        failed = report.failed,
        "Seeding finished"
    );
    report
}
