use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

use nw_archive::ArchiveStore;
use nw_core::Result;
use nw_providers::{Aggregator, ProvidersConfig};
use nw_web::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-provider news aggregation service", long_about = None)]
struct Cli {
    /// Archive database path; falls back to NEWS_DB_PATH, then ./news.db
    #[arg(long)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the HTTP service
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: SocketAddr,
    },
    /// Run one aggregation query and print the ranked results
    Search {
        term: String,
        #[arg(long)]
        language: Option<String>,
    },
}

fn db_path(cli_db: Option<PathBuf>) -> PathBuf {
    cli_db
        .or_else(|| std::env::var("NEWS_DB_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("news.db"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config = ProvidersConfig::from_env();
    let aggregator = Aggregator::from_config(&config)?;
    let archive = ArchiveStore::open(&db_path(cli.db)).await?;
    info!("💾 Archive store initialized successfully");

    match cli.command {
        Commands::Serve { bind } => {
            let app = nw_web::create_app(AppState { aggregator, archive }).await;
            info!("🌐 Listening on {}", bind);
            let listener = tokio::net::TcpListener::bind(bind).await?;
            axum::serve(listener, app).await?;
        }
        Commands::Search { term, language } => {
            let aggregate = aggregator.aggregate(&term, language.as_deref()).await?;
            for report in &aggregate.reports {
                info!(
                    provider = report.provider,
                    status = ?report.status,
                    count = report.count,
                    "provider outcome"
                );
            }
            let inserted = archive
                .upsert_all(&term, language.as_deref(), &aggregate.articles)
                .await?;
            println!(
                "Found {} articles ({} newly archived)",
                aggregate.articles.len(),
                inserted
            );
            for article in &aggregate.articles {
                println!(
                    "- {} ({})",
                    article.title.as_deref().unwrap_or("<untitled>"),
                    article.source.name.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(())
}
