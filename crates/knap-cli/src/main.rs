use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use knap_ai::{GeminiClient, TemporalExtractor};
use knap_crawler::CrawlConfig;
use knap_storage::{NoticeStore, PgNoticeStore};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "knap-cli")]
#[command(about = "University notice aggregation & recommendation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl the configured seed boards once.
    Crawl,
    /// Run temporal enrichment over notices not yet analyzed.
    Enrich {
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Serve the pipeline-facing HTTP API.
    Serve,
    /// Create the database tables.
    InitDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Crawl) {
        Commands::Crawl => {
            let summary = knap_crawler::run_crawl_from_env().await?;
            println!(
                "crawl complete: visited={} failed={} candidates={} inserted={} enriched={}",
                summary.sources_visited,
                summary.sources_failed,
                summary.candidates_seen,
                summary.inserted,
                summary.enriched
            );
        }
        Commands::Enrich { limit } => {
            let config = CrawlConfig::from_env();
            let store: Arc<dyn NoticeStore> = Arc::new(
                PgNoticeStore::connect(&config.database_url)
                    .await
                    .context("connecting to the notice store")?,
            );
            let client =
                Arc::new(GeminiClient::from_env().context("configuring the generative client")?);
            let report = TemporalExtractor::new(client, store)
                .enrich_pending(limit)
                .await?;
            println!(
                "enrichment pass: attempted={} enriched={} failed={}",
                report.attempted, report.enriched, report.failed
            );
        }
        Commands::Serve => {
            knap_web::serve_from_env().await?;
        }
        Commands::InitDb => {
            let config = CrawlConfig::from_env();
            let store = PgNoticeStore::connect(&config.database_url)
                .await
                .context("connecting to the notice store")?;
            store.init_schema().await?;
            println!("schema ready");
        }
    }
    Ok(())
}
