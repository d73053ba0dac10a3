//! Search blog posts from the command line.
//!
//! Usage:
//!     sift --query "test" [--category Essay] [--exact] [--posts posts.json]
//!
//! Without `--posts` the bundled demo posts are searched.

use anyhow::{Context, Result};
use clap::Parser;
use postsift::{demo_documents, documents_from_json, known_categories, SearchConfig, SearchMode, SearchSession};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Search blog posts with fuzzy or exact matching")]
struct Cli {
    /// JSON array of posts to search (defaults to the demo posts)
    #[arg(long)]
    posts: Option<PathBuf>,

    /// Free-text query; empty lists every post in the selected categories
    #[arg(short, long, default_value = "")]
    query: String,

    /// Only search posts in this category (repeatable)
    #[arg(short, long = "category")]
    categories: Vec<String>,

    /// Require the literal query instead of tolerating typos
    #[arg(long)]
    exact: bool,

    /// JSON file overriding search parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

fn init_telemetry() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,postsift=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SearchConfig::from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => SearchConfig::default(),
    };
    let preview_chars = config.preview_chars;

    let documents = match &cli.posts {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read posts from {}", path.display()))?;
            documents_from_json(&json).with_context(|| format!("Invalid posts file {}", path.display()))?
        }
        None => demo_documents(),
    };
    tracing::info!(posts = documents.len(), categories = ?known_categories(&documents), "posts loaded");

    let session = SearchSession::with_config(config).context("Invalid search configuration")?;
    if cli.exact {
        session.set_mode(SearchMode::Exact);
    }

    let result = session
        .perform_search(Arc::from(documents), cli.categories, cli.query)
        .await;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.is_no_results() {
        println!("No posts found for {:?} ({} mode).", result.query, result.mode);
        return Ok(());
    }
    if result.degraded {
        eprintln!("Search failed; showing unranked posts.");
    }
    for (rank, rendered) in result.results.iter().enumerate() {
        println!("{:>2}. {} [{}]", rank + 1, rendered.document.title, rendered.document.category);
        println!("    {}", rendered.display_text(preview_chars));
    }
    Ok(())
}
