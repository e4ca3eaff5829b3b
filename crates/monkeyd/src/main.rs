//! monkeyd — the kube-monkey daemon.
//!
//! Assembles the chaos loop and its HTTP surface:
//! - Settings (TOML config, validated once at startup)
//! - Cluster client (in-memory cluster seeded from an inventory file)
//! - Day cycle controller
//! - Liveness and chaos metrics endpoints
//!
//! # Usage
//!
//! ```text
//! monkeyd run --config /etc/kube-monkey/config.toml --inventory cluster.toml --port 8080
//! monkeyd validate --config /etc/kube-monkey/config.toml
//! monkeyd schedule --config config.toml --inventory cluster.toml --json
//! ```

mod standalone;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};

use monkey_core::config::DEFAULT_CONFIG_PATH;
use monkey_metrics::MetricsCollector;
use monkey_scheduler::{DayCycleController, SeededRandom};

#[derive(Parser)]
#[command(name = "monkeyd", about = "kube-monkey chaos daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily chaos loop and the HTTP endpoints until Ctrl-C.
    Run {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Cluster inventory to run against.
        #[arg(long)]
        inventory: PathBuf,

        /// Port for /healthz and /chaosmetrics.
        #[arg(long, default_value = "8080")]
        port: u16,
    },
    /// Validate a config file and print the resulting settings.
    Validate {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },
    /// Build today's schedule and print it without killing anything.
    Schedule {
        #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        #[arg(long)]
        inventory: PathBuf,

        /// Print entries as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,monkeyd=debug,monkey=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            inventory,
            port,
        } => run(config, inventory, port).await,
        Command::Validate { config } => validate(config),
        Command::Schedule {
            config,
            inventory,
            json,
        } => schedule(config, inventory, json).await,
    }
}

async fn run(config: PathBuf, inventory: PathBuf, port: u16) -> anyhow::Result<()> {
    let settings = Arc::new(standalone::load_settings(&config)?);
    let cluster = standalone::load_cluster(&inventory).await?;

    info!(
        dry_run = settings.dry_run,
        run_hour = settings.run_hour,
        start_hour = settings.start_hour,
        end_hour = settings.end_hour,
        time_zone = %settings.time_zone,
        "kube-monkey starting"
    );

    let controller = Arc::new(DayCycleController::new(
        cluster.clone(),
        settings.clone(),
        Arc::new(SeededRandom::from_os()),
    ));
    let metrics = Arc::new(MetricsCollector::new(cluster, &settings));

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let chaos_handle = tokio::spawn({
        let controller = controller.clone();
        async move { controller.run(shutdown_rx).await }
    });

    // ── HTTP server ────────────────────────────────────────────

    let router = monkey_api::build_router(metrics);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for Ctrl-C, shutting down");
            }
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    standalone::join_task("chaos loop", chaos_handle).await;

    info!("kube-monkey stopped");
    Ok(())
}

fn validate(config: PathBuf) -> anyhow::Result<()> {
    let settings = standalone::load_settings(&config)?;
    println!("{}", standalone::describe(&settings));
    Ok(())
}

async fn schedule(config: PathBuf, inventory: PathBuf, json: bool) -> anyhow::Result<()> {
    let settings = Arc::new(standalone::load_settings(&config)?);
    let cluster = standalone::load_cluster(&inventory).await?;
    let controller = DayCycleController::new(cluster, settings, Arc::new(SeededRandom::from_os()));

    let entries = controller.build_schedule(chrono::Utc::now()).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else if entries.is_empty() {
        println!("no terminations scheduled today");
    } else {
        for entry in &entries {
            let mode = if entry.kill_all { "kill-all" } else { "kill-one" };
            println!("{}  {}  {mode}", entry.fire_at.to_rfc3339(), entry.workload);
        }
    }
    Ok(())
}
