//! folio CLI
//!
//! Synchronizes the post table, seeds it and lists its content.

mod config;

use std::path::PathBuf;
use std::str::FromStr;

use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use folio_posts::{parse_category, posts_schema, PostFilter, PostRepository, POSTS_TABLE};
use folio_schema::prelude::*;

use crate::config::SchemaFile;

/// Post store for the folio site.
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (SQLite path or connection string).
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:folio.db")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize a table to its declared columns.
    Sync {
        /// JSON schema file (the posts table if not specified).
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Insert or refresh the built-in seed posts.
    Seed,

    /// List posts, newest first.
    Posts {
        /// Kind of post, or `all`.
        #[arg(short, long, default_value = "all")]
        kind: String,

        /// Text searched in titles and descriptions.
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show how many posts carry each tag.
    Tags,
}

async fn connect(url: &str) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

async fn sync(pool: SqlitePool, schema: Option<PathBuf>, dry_run: bool) -> anyhow::Result<()> {
    let (table, columns) = match schema {
        Some(path) => {
            let file = SchemaFile::load(&path)?;
            (file.table, file.columns)
        }
        None => (POSTS_TABLE.to_string(), posts_schema()),
    };

    let synchronizer = SchemaSynchronizer::new(SqliteStore::new(pool), SqliteDialect::new());

    if dry_run {
        info!("Dry run mode - SQL will be printed but not executed.");
        let preview = synchronizer.preview(&table, &columns).await?;
        for statement in &preview.statements {
            println!("{};", statement.sql);
        }
        return Ok(());
    }

    let report = synchronizer.synchronize(&table, &columns).await?;
    if report.created() {
        println!("Created table {}", report.table);
    } else {
        println!(
            "Rebuilt table {} ({} rows kept)",
            report.table, report.rows_copied
        );
    }
    if !report.plan.added.is_empty() {
        println!("  added:   {}", report.plan.added.join(", "));
    }
    if !report.plan.dropped.is_empty() {
        println!("  dropped: {}", report.plan.dropped.join(", "));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let pool = connect(&cli.database).await?;

    match cli.command {
        Commands::Sync { schema, dry_run } => sync(pool, schema, dry_run).await?,

        Commands::Seed => {
            let repo = PostRepository::open(pool).await?;
            let report = folio_posts::seed(&repo, Utc::now()).await;
            println!(
                "Seeded {} posts ({} failed)",
                report.upserted, report.failed
            );
        }

        Commands::Posts { kind, search } => {
            let mut filter = PostFilter::all();
            if let Some(kind) = parse_category(&kind)? {
                filter = filter.kind(kind);
            }
            if let Some(term) = search {
                filter = filter.search(term);
            }

            let repo = PostRepository::open(pool).await?;
            let posts = repo.filtered(&filter).await?;

            if posts.is_empty() {
                info!("No posts found.");
            } else {
                println!("{:-<60}", "");
                for post in &posts {
                    println!(
                        " {}  {:<5}  {}  {}",
                        post.date.format("%Y-%m-%d"),
                        post.kind,
                        post.slug,
                        post.title
                    );
                }
                println!();
            }
        }

        Commands::Tags => {
            let repo = PostRepository::open(pool).await?;
            let counts = repo.tag_counts().await?;

            if counts.is_empty() {
                info!("No tags found.");
            } else {
                for (tag, count) in &counts {
                    println!(" {tag:<20} {count}");
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_dry_run() {
        let cli = Cli::try_parse_from(["folio", "sync", "--dry-run"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync {
                schema: None,
                dry_run: true
            }
        ));
    }

    #[test]
    fn test_posts_defaults_to_all_kinds() {
        let cli = Cli::try_parse_from(["folio", "posts"]).unwrap();
        let Commands::Posts { kind, search } = cli.command else {
            panic!("expected the posts command");
        };
        assert_eq!(kind, "all");
        assert!(search.is_none());
    }
}
