//! Benefit decision toolkit development server
//!
//! Runs the builder API's document routes against in-memory stores so the
//! editors can be exercised without the real backend.
//!
//! Usage:
//!   bdt-devserver --port 8081 --seed seed.json --latency-ms 2000
//!
//! Nothing is persisted; every restart starts from the seed file.

use anyhow::{Context, Result};
use bdt_devserver::{AppState, SeedData, build_router};
use clap::Parser;
use std::{fs, path::PathBuf, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "bdt-devserver")]
#[command(about = "In-memory builder API for local development")]
struct Args {
    /// HTTP port to listen on
    #[arg(short, long, default_value = "8081")]
    port: u16,

    /// JSON file with screeners, benefits and checks to load at startup
    #[arg(short, long)]
    seed: Option<PathBuf>,

    /// Artificial delay added to every request, in milliseconds
    #[arg(long, default_value = "0")]
    latency_ms: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("Dev server starting...");
    let state = Arc::new(AppState::new(Duration::from_millis(args.latency_ms)));
    if let Some(path) = &args.seed {
        let data = load_seed(path)?;
        let loaded = state.seed(data).await;
        info!(
            "Seeded {} screeners, {} benefits, {} checks from {:?}",
            loaded.screeners, loaded.benefits, loaded.checks, path
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", args.port))
        .await
        .with_context(|| format!("Failed to bind HTTP port {}", args.port))?;
    info!("Listening on port {} (latency {} ms)", args.port, args.latency_ms);

    axum::serve(listener, build_router(state))
        .await
        .context("HTTP server failed")?;
    Ok(())
}

fn load_seed(path: &PathBuf) -> Result<SeedData> {
    info!("Loading seed data from {:?}", path);
    let text = fs::read_to_string(path).context("Failed to read seed file")?;
    serde_json::from_str(&text).context("Failed to parse seed file")
}
