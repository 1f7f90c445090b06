//! ingest - Load fashion trends into the trend store
//!
//! Either the built-in demo articles or one plain-text article from disk.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use trend_stylist::config::Config;
use trend_stylist::ingest::{demo_articles, ingest_articles, Article};
use trend_stylist::llm::AnthropicClient;
use trend_stylist::store::TrendStore;

/// Trend ingestion tool
#[derive(Parser, Debug)]
#[command(name = "ingest", version, about = "Extract fashion trends from articles into the trend store")]
struct Args {
    /// Use the built-in sample articles (no article files needed)
    #[arg(long, conflicts_with_all = ["article", "title", "url"])]
    demo: bool,

    /// Plain-text article to extract trends from
    #[arg(long, requires_all = ["title", "url"])]
    article: Option<PathBuf>,

    /// Title of the article
    #[arg(long)]
    title: Option<String>,

    /// Source URL of the article
    #[arg(long)]
    url: Option<String>,

    /// Database path (defaults to TRENDS_DB_PATH)
    #[arg(short, long)]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = Config::from_env();

    let articles = if args.demo {
        demo_articles()
    } else if let (Some(path), Some(title), Some(url)) = (&args.article, &args.title, &args.url) {
        let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        vec![Article::new(title.as_str(), url.as_str(), content)]
    } else {
        bail!("pass --demo, or --article <file> with --title and --url");
    };

    let store = TrendStore::new(args.database.unwrap_or_else(|| PathBuf::from(&config.database_path)));
    store.initialize().await?;
    let before = store.count().await?;

    let writer = AnthropicClient::new(&config.anthropic_base_url, &config.stylist_model);
    let inserted = ingest_articles(&store, &writer, &articles).await?;
    let after = store.count().await?;

    println!("Trends before: {before}");
    println!("Trends inserted: {inserted}");
    println!("Trends after: {after}");
    Ok(())
}
