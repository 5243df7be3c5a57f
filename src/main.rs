use anyhow::Context;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mimo_notes::config::Config;
use mimo_notes::repositories::PostgresMemoRepository;
use mimo_notes::server::{self, AppState};
use mimo_notes::services::{GeminiClient, MemoService, SummaryService};

const USAGE: &str = "\
Mimo Notes Server

Usage: mimo-notes [OPTIONS]

Options:
  -c, --config <FILE>  Path to Config.toml (default: ./Config.toml)
  -p, --port <PORT>    Port to listen on (overrides configuration)
  -h, --help           Show this help message

Environment variables:
  DATABASE_URL, DATABASE_ACCESS_KEY  Data store connection (required)
  GEMINI_API_KEY                     Gemini API key for summaries
  LOG_LEVEL                          Default log filter (RUST_LOG takes precedence)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut port: Option<u16> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config_path = Some(args.next().context("--config requires a path")?.into());
            }
            "--port" | "-p" => {
                let value = args.next().context("--port requires a value")?;
                port = Some(value.parse().context("Invalid port number")?);
            }
            "--help" | "-h" => {
                println!("{}", USAGE);
                return Ok(());
            }
            other => anyhow::bail!("Unknown argument: {}\n\n{}", other, USAGE),
        }
    }

    let mut config = Config::load(config_path.as_deref())?;
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{},tower_http=debug", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mimo Notes Server...");

    // DB接続（アクセスキーはパスワードとして渡す）
    let connect_options = PgConnectOptions::from_str(&config.database.url)
        .context("Invalid DATABASE_URL")?
        .password(&config.database.access_key);
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await
        .context("Failed to connect to the data store")?;

    let memo_repo = PostgresMemoRepository::new(pool);
    memo_repo
        .ensure_schema()
        .await
        .context("Failed to prepare the memos table")?;

    if config.gemini.api_key.trim().is_empty() {
        warn!("GEMINI_API_KEY is not set; summarization requests will fail");
    }

    let memo_service = Arc::new(MemoService::new(Arc::new(memo_repo)));
    let summary_service = Arc::new(SummaryService::new(Arc::new(GeminiClient::new(
        &config.gemini,
    ))));
    let state = AppState::new(memo_service, summary_service);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Failed to parse SocketAddr")?;

    server::start_server(addr, state, &config).await
}
