//! airspottr - ADS-B rarity spotter
//!
//! Polls an ADS-B aggregator for aircraft around a spotting location and
//! reports aircraft types, operators and registration countries that are
//! rare relative to everything seen so far.
//!
//! # Usage
//!
//! ```bash
//! # Live polling around the configured location
//! airspottr
//!
//! # Somewhere else, with the API and military watch enabled
//! airspottr --lat 51.4700 --lon -0.4543 --api --military
//!
//! # Replay a recording (one JSON payload per line), no warm-up
//! airspottr --replay recording.jsonl --delay-ms 100 --no-warmup
//!
//! # Validate and print the effective configuration
//! airspottr check-config
//! ```
//!
//! # Environment Variables
//!
//! - `AIRSPOTTR_CONFIG`: Path to the TOML config file
//! - `AIRSPOTTR_CORS_ORIGINS`: Allowed API origins (comma separated)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use airspottr::api::{create_app, ApiState};
use airspottr::config::{self, defaults, SpotterConfig};
use airspottr::military::{run_military_watch, MilitaryWatch};
use airspottr::notify::{ConsoleNotifier, LogNotifier, RarityNotifier};
use airspottr::pipeline::{
    aircraft_url, military_url, run_summary_task, shared_snapshot, summary_text, AdsbClient,
    BatchSource, HttpSource, ProcessingLoop, ReplaySource, SharedSnapshot, StdinSource,
};
use airspottr::{load_reference_tables, SightingStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "airspottr")]
#[command(about = "ADS-B sighting aggregation and rarity spotting")]
#[command(version)]
struct CliArgs {
    /// Path to a TOML config file (overrides AIRSPOTTR_CONFIG and ./airspottr.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the spotting latitude
    #[arg(long, allow_hyphen_values = true)]
    lat: Option<f64>,

    /// Override the spotting longitude
    #[arg(long, allow_hyphen_values = true)]
    lon: Option<f64>,

    /// Read snapshot payloads from stdin (one JSON document per line)
    #[arg(long, conflicts_with = "replay")]
    stdin: bool,

    /// Replay a recording file (one JSON document per line)
    #[arg(long, value_name = "PATH")]
    replay: Option<PathBuf>,

    /// Delay between replayed payloads
    #[arg(long, default_value = "0")]
    delay_ms: u64,

    /// Notify from the first payload instead of waiting out the warm-up
    #[arg(long)]
    no_warmup: bool,

    /// Serve the read-only snapshot API
    #[arg(long)]
    api: bool,

    /// Override the API listen address
    #[arg(long, value_name = "HOST:PORT")]
    addr: Option<String>,

    /// Run the military proximity watch
    #[arg(long)]
    military: bool,

    #[command(subcommand)]
    command: Option<SubCommand>,
}

#[derive(clap::Subcommand, Debug)]
enum SubCommand {
    /// Validate the configuration and print the effective values as TOML
    CheckConfig,
}

// ============================================================================
// Task Supervision
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Ingest,
    Summary,
    MilitaryWatch,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpServer => write!(f, "HttpServer"),
            Self::Ingest => write!(f, "Ingest"),
            Self::Summary => write!(f, "Summary"),
            Self::MilitaryWatch => write!(f, "MilitaryWatch"),
        }
    }
}

/// Monitor tasks; cancel everything on failure or once ingest has ended.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("🔒 Supervisor: All tasks spawned, monitoring...");

    let mut outcome = Ok(());
    loop {
        tokio::select! {
            () = cancel_token.cancelled() => {
                info!("🛑 Supervisor: Shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(TaskName::Ingest))) => {
                        info!("🔒 Supervisor: Ingest finished, stopping remaining tasks");
                        cancel_token.cancel();
                        break;
                    }
                    Some(Ok(Ok(task_name))) => {
                        info!("🔒 Supervisor: Task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("🔒 Supervisor: Task failed with error: {}", e);
                        cancel_token.cancel();
                        outcome = Err(e);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("🔒 Supervisor: Task panicked: {}", e);
                        cancel_token.cancel();
                        outcome = Err(anyhow::anyhow!("Task panicked: {}", e));
                        break;
                    }
                    None => {
                        info!("🔒 Supervisor: All tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Every task watches the token, so draining is bounded
    while task_set.join_next().await.is_some() {}
    outcome
}

async fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    addr: &str,
    state: ApiState,
    cancel_token: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding API listener on {addr}"))?;
    info!("🌐 API listening on http://{}/api/v1", addr);

    let app = create_app(state);
    task_set.spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;
        match result {
            Ok(()) => Ok(TaskName::HttpServer),
            Err(e) => Err(anyhow::anyhow!("HTTP server error: {}", e)),
        }
    });
    Ok(())
}

// ============================================================================
// Runner
// ============================================================================

async fn run<S: BatchSource>(
    mut source: S,
    settings: &SpotterConfig,
    args: &CliArgs,
    client: AdsbClient,
    cancel_token: CancellationToken,
) -> Result<SharedSnapshot> {
    let tables = Arc::new(
        load_reference_tables(&settings.reference).context("loading reference tables")?,
    );
    let store = SightingStore::new(
        Arc::clone(&tables),
        settings.location.coordinates(),
        settings.rarity.policy(),
    );
    let published = shared_snapshot(&store);

    let notifier: Box<dyn RarityNotifier> = if settings.notify.enabled {
        Box::new(ConsoleNotifier::stdout())
    } else {
        Box::new(LogNotifier)
    };
    let warmup = if args.no_warmup {
        Duration::ZERO
    } else {
        settings.polling.warmup()
    };

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    if args.api || settings.server.enabled {
        let addr = args.addr.clone().unwrap_or_else(|| settings.server.addr.clone());
        let state = ApiState::new(Arc::clone(&published), &settings.location.name);
        spawn_http_server(&mut task_set, &addr, state, cancel_token.clone()).await?;
    }

    if args.military || settings.military.enabled {
        let watch = MilitaryWatch {
            url: military_url(&settings.polling.api_host),
            reference: settings.location.coordinates(),
            max_distance_km: settings.military.max_distance_km,
            start_delay: Duration::from_secs(defaults::MILITARY_START_DELAY_SECS),
            interval: settings.military.interval(),
        };
        let token = cancel_token.clone();
        let tables = Arc::clone(&tables);
        task_set.spawn(async move {
            run_military_watch(watch, client, tables, token).await;
            Ok(TaskName::MilitaryWatch)
        });
    }

    {
        let published = Arc::clone(&published);
        let location = settings.location.name.clone();
        let every = settings.polling.summary_interval();
        let token = cancel_token.clone();
        task_set.spawn(async move {
            run_summary_task(published, location, every, token).await;
            Ok(TaskName::Summary)
        });
    }

    let ingest = ProcessingLoop::new(store, notifier, Arc::clone(&published), cancel_token.clone())
        .with_warmup(warmup);
    task_set.spawn(async move {
        info!("[Ingest] Task starting");
        let stats = ingest.run(&mut source).await;
        if stats.delivery_broken() {
            warn!(
                failures = stats.notify_failures,
                "⚠️ Every rarity notification failed to deliver"
            );
        }
        Ok(TaskName::Ingest)
    });

    run_supervisor(&mut task_set, cancel_token).await?;
    Ok(published)
}

fn load_settings(args: &CliArgs) -> Result<SpotterConfig> {
    let settings = match &args.config {
        Some(path) => SpotterConfig::load_from_file(path)?,
        None => SpotterConfig::load(),
    };
    let settings = settings.with_location_override(args.lat, args.lon);
    settings.validate()?;
    Ok(settings)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    if let Some(SubCommand::CheckConfig) = &args.command {
        let settings = load_settings(&args)?;
        print!("{}", settings.to_toml()?);
        info!("✓ Configuration is valid");
        return Ok(());
    }

    config::init(load_settings(&args)?);
    let settings = config::get();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  airspottr - ADS-B rarity spotter");
    info!(
        "  Location: {} ({})",
        settings.location.name,
        settings.location.coordinates()
    );
    info!("  Policy: {:?}", settings.rarity.policy());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let client = AdsbClient::new(settings.polling.request_timeout())
        .context("building aggregator HTTP client")?;

    let published = if args.stdin {
        info!("📥 Input: stdin (JSON snapshot per line)");
        run(StdinSource::new(), settings, &args, client, cancel_token).await?
    } else if let Some(path) = &args.replay {
        info!("📥 Input: replay of {}", path.display());
        let source = ReplaySource::from_file(path, args.delay_ms)?;
        run(source, settings, &args, client, cancel_token).await?
    } else {
        let url = aircraft_url(
            &settings.polling.api_host,
            settings.location.coordinates(),
            settings.polling.radius_nm,
        );
        info!(
            "📥 Input: {} every {}s",
            url,
            settings.polling.interval_secs
        );
        let source = HttpSource::new(client.clone(), url, settings.polling.interval());
        run(source, settings, &args, client, cancel_token).await?
    };

    print!("{}", summary_text(&published, &settings.location.name));
    info!("✓ airspottr shutdown complete");
    Ok(())
}
