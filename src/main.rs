//! Sports odds scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sports_arb::api::{create_router, AppState};
use sports_arb::config::Config;
use sports_arb::detector::{Category, Opportunity};
use sports_arb::metrics;
use sports_arb::odds::{OddsApiClient, OddsSource, OfflineSource};
use sports_arb::scanner::Scanner;
use sports_arb::sink::{JsonFileStore, MemoryCountStore, MemoryStore, OpportunityStore};
use sports_arb::utils::shutdown_signal;

/// Sports odds scanner.
#[derive(Parser, Debug)]
#[command(name = "sports-arb")]
#[command(about = "Scans bookmaker odds for surebets, middles and valuebets")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scan loop with the HTTP API (default).
    Run {
        /// HTTP server port, overrides PORT.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run a single pass and print the results.
    Scan {
        /// Read odds from a snapshot file instead of the API.
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Print opportunities as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List in-season sports.
    Sports,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("sports_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let (json_layer, plain_layer) = if config.log_json {
        (Some(fmt::layer().json()), None)
    } else {
        (None, Some(fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(plain_layer)
        .init();

    // Initialize metrics
    let prometheus = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    };
    metrics::init_metrics();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Sports) => cmd_sports(config).await,
        Some(Command::Scan { file, json }) => cmd_scan(config, file, json).await,
        Some(Command::Run { port }) => cmd_run(config, port, prometheus).await,
        None => cmd_run(config, None, prometheus).await,
    }
}

/// Build the odds source: an offline file when given, the API otherwise.
fn build_source(config: &Config, file: Option<PathBuf>) -> anyhow::Result<Arc<dyn OddsSource>> {
    match file.or_else(|| config.odds_file.clone()) {
        Some(path) => {
            info!(path = %path.display(), "Reading odds from snapshot file");
            Ok(Arc::new(OfflineSource::new(path)))
        }
        None => Ok(Arc::new(OddsApiClient::new(config)?)),
    }
}

/// Build the opportunity store.
fn build_store(config: &Config) -> Arc<dyn OpportunityStore> {
    let ttl = Duration::from_secs(config.result_ttl_secs);
    match &config.output_dir {
        Some(dir) => Arc::new(JsonFileStore::new(dir.clone(), ttl)),
        None => Arc::new(MemoryStore::new(ttl)),
    }
}

fn build_scanner(
    config: &Config,
    source: Arc<dyn OddsSource>,
    store: Arc<dyn OpportunityStore>,
    counts: Arc<MemoryCountStore>,
) -> anyhow::Result<Scanner> {
    let settings = config.settings()?;
    Ok(Scanner::new(source, store, counts, &settings).with_sport_filter(config.sports.clone()))
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("SPORTS ARB SCANNER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    if let Err(e) = config.validate() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed"));
    }
    println!("OK");

    print!("Building detector settings... ");
    if let Err(e) = config.settings() {
        println!("FAILED");
        println!("  Error: {}", e);
        return Err(anyhow::anyhow!("Detector settings invalid"));
    }
    println!("OK");

    print!("Checking odds source... ");
    match (&config.odds_file, config.has_api_key()) {
        (Some(path), _) => println!("OK (file {})", path.display()),
        (None, true) => println!("OK (api {})", config.odds_api_url),
        (None, false) => {
            println!("FAILED");
            println!("  Error: set ODDS_API_KEY or ODDS_FILE");
            return Err(anyhow::anyhow!("No odds source configured"));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Markets: {}", config.markets.join(", "));
    println!("  Regions: {}", config.odds_regions.join(", "));
    if !config.sports.is_empty() {
        println!("  Sports: {}", config.sports.join(", "));
    }
    println!("  Min Profit Margin: {}%", config.min_profit_margin);
    println!("  Middle Min Confidence: {}", config.middle_min_confidence);
    println!("  Sharp Books: {}", config.sharp_books.join(", "));
    println!("  Result TTL: {}s", config.result_ttl_secs);
    println!("  Scan Interval: {}s", config.scan_interval_secs);
    match &config.output_dir {
        Some(dir) => println!("  Output: {}", dir.display()),
        None => println!("  Output: memory"),
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// List in-season sports.
async fn cmd_sports(config: Config) -> anyhow::Result<()> {
    let source = build_source(&config, None)?;
    let sports = source.sports().await?;

    println!("{:<40} {:<20} {}", "KEY", "GROUP", "TITLE");
    for sport in sports.iter().filter(|s| s.active) {
        let marker = if sport.has_outrights { " (outrights)" } else { "" };
        println!("{:<40} {:<20} {}{}", sport.key, sport.group, sport.title, marker);
    }

    Ok(())
}

/// Run one pass and print what was found.
async fn cmd_scan(config: Config, file: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    config.validate()?;

    let source = build_source(&config, file)?;
    let store = build_store(&config);
    let counts = Arc::new(MemoryCountStore::new());
    let scanner = build_scanner(&config, source, store.clone(), counts)?;

    let summary = scanner.scan_once().await?;

    let mut found: Vec<Opportunity> = Vec::new();
    for category in Category::ALL {
        if let Some(snapshot) = store.latest(category).await? {
            found.extend(snapshot.items.into_values());
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    println!("======================================================================");
    println!(
        "Scanned {} sports, {} events ({} failed)",
        summary.sports_scanned, summary.events, summary.sports_failed
    );
    println!(
        "Surebets: {}  Middles: {}  Valuebets: {}",
        summary.surebets, summary.middles, summary.valuebets
    );
    if summary.limit_reached {
        println!("WARNING: odds quota exhausted, pass was cut short");
    }
    println!("----------------------------------------------------------------------");
    for opportunity in &found {
        let header = opportunity.header();
        println!(
            "[{}] {} | {} | {}",
            opportunity.category(),
            header.sport_title,
            header.event,
            header.market
        );
    }
    println!("======================================================================");

    Ok(())
}

/// Run the scan loop and serve the HTTP API.
async fn cmd_run(
    config: Config,
    port_override: Option<u16>,
    prometheus: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!("Markets: {}", config.markets.join(", "));
    info!("Scan interval: {}s", config.scan_interval_secs);

    let source = build_source(&config, None)?;
    let store = build_store(&config);
    let counts = Arc::new(MemoryCountStore::new());
    let scanner = build_scanner(&config, source, store.clone(), counts.clone())?;

    // Create app state
    let mut app_state = AppState::new(scanner.status(), store, counts);
    if let Some(handle) = prometheus {
        app_state = app_state.with_prometheus(handle);
    }

    // Start HTTP server
    let port = port_override.unwrap_or(config.port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);

    // Spawn HTTP server
    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
        {
            error!("HTTP server error: {}", e);
        }
    });

    scanner
        .run_forever(
            Duration::from_secs(config.scan_interval_secs),
            shutdown_signal(),
        )
        .await;

    if let Err(e) = server_handle.await {
        warn!("HTTP server task failed: {}", e);
    }

    info!("Shutdown complete");
    Ok(())
}
