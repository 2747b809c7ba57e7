//! store-fetch: App Store metadata over a resilient request pipeline.
//!
//! ```text
//!   caller ──▶ http (axum) ──▶ store (lookup, clean_app)
//!                                  │
//!                                  ▼
//!                            ┌────────────┐   admit / record
//!                            │  pipeline  │◀──────────────▶ circuit breaker
//!                            └─────┬──────┘
//!                                  │ retries ─ deadlines ─ throttle
//!                                  ▼
//!                             direct request ──▶ iTunes
//!                                  │ blocked / failed
//!                                  ▼
//!                             fallback chain: alternate headers ─▶ content relay
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use store_fetch::config::{load_config, AppConfig, ConfigWatcher};
use store_fetch::lifecycle::{wait_for_signal, Shutdown};
use store_fetch::observability::{logging, metrics};
use store_fetch::{HttpServer, LookupQuery, Pipeline, StoreClient};

#[derive(Parser)]
#[command(name = "store-fetch")]
#[command(about = "App Store metadata service with breaker, retries and fallbacks", version)]
struct Cli {
    /// TOML configuration file; defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Look up apps once and print them as JSON
    Lookup {
        /// Track ids or bundle ids
        #[arg(required = true)]
        ids: Vec<String>,

        #[arg(long, default_value = "us")]
        country: String,

        #[arg(long)]
        lang: Option<String>,

        /// `id` for track ids, `bundleId` for bundle ids
        #[arg(long, default_value = "id")]
        id_field: String,

        /// Throttle window size for this call
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "store-fetch starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let pipeline = Arc::new(Pipeline::from_config(&config)?);
    let store = StoreClient::new(pipeline.clone(), &config.store)?;

    match cli.command {
        Commands::Serve => serve(config, cli.config, pipeline, store).await?,
        Commands::Lookup {
            ids,
            country,
            lang,
            id_field,
            limit,
        } => {
            let query = LookupQuery::new(ids)
                .id_field(id_field)
                .country(country)
                .lang(lang)
                .limit(limit);
            let apps = store.lookup(&query).await?;
            println!("{}", serde_json::to_string_pretty(&apps)?);
        }
    }

    Ok(())
}

async fn serve(
    config: AppConfig,
    config_path: Option<PathBuf>,
    pipeline: Arc<Pipeline>,
    store: StoreClient,
) -> Result<(), Box<dyn std::error::Error>> {
    let shutdown = Shutdown::new();
    tokio::spawn(wait_for_signal(shutdown.clone()));

    // Held for the lifetime of the server; dropping it stops file events.
    let _watcher = match config_path {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(&path);
            let watcher = watcher.run()?;
            let pipeline = pipeline.clone();
            let stopped = shutdown.wait();
            tokio::spawn(async move {
                tokio::pin!(stopped);
                loop {
                    tokio::select! {
                        Some(patch) = updates.recv() => {
                            let live = pipeline.configure(&patch);
                            tracing::info!(config = ?live, "Pipeline configuration reloaded");
                        }
                        _ = &mut stopped => break,
                        else => break,
                    }
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        request_timeout_secs = config.server.request_timeout_secs,
        "Listening for connections"
    );

    HttpServer::new(store, &config.server)
        .run(listener, shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
