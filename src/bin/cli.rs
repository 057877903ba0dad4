//! SPMB Proxy CLI
//!
//! Runs the HTTP service, validates configuration, or performs a one-shot
//! fetch-and-rank for a school.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use spmb_proxy::{
    config,
    error::{AppError, Result},
    models::{Config, RankingStrategy},
    server::{self, AppState},
    services::{Lookups, RegistrantFilter, rank},
    utils::http::HttpUpstream,
};

/// spmb-proxy - SPMB Jabar registrant dashboard backend
#[derive(Parser, Debug)]
#[command(
    name = "spmb-proxy",
    version,
    about = "Caching proxy for the SPMB Jabar registration API"
)]

struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the dashboard API
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Validate configuration and the fallback region table
    Validate,

    /// Fetch, filter, and rank one school's registrants, printing JSON
    Fetch {
        /// School NPSN
        #[arg(long)]
        npsn: String,

        /// DOMISILI, KETM, or MUTASI
        #[arg(long, default_value = "DOMISILI")]
        option_type: String,

        #[arg(long)]
        search: Option<String>,

        #[arg(long)]
        min_distance: Option<f64>,

        #[arg(long)]
        max_distance: Option<f64>,

        /// Exact origin school name
        #[arg(long)]
        origin_school: Option<String>,

        /// Override the configured ranking strategy
        #[arg(long, value_parser = parse_strategy)]
        strategy: Option<RankingStrategy>,
    },
}

fn parse_strategy(value: &str) -> std::result::Result<RankingStrategy, String> {
    match value {
        "score_first" | "score-first" => Ok(RankingStrategy::ScoreFirst),
        "distance_first" | "distance-first" => Ok(RankingStrategy::DistanceFirst),
        other => Err(format!(
            "unknown strategy {other:?} (expected score_first or distance_first)"
        )),
    }
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Resolves when `signal` fires. Never resolves when the signal handler
/// cannot be installed.
async fn shutdown_on<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => log::info!("Shutdown requested"),
        Err(e) => {
            log::error!("Cannot listen for Ctrl-C, graceful shutdown disabled: {e}");
            std::future::pending::<()>().await;
        }
    }
}

fn build_lookups(config: Config, fallback: spmb_proxy::models::RegionMapping) -> Result<Lookups> {
    let upstream = HttpUpstream::new(&config.upstream)?;
    Ok(Lookups::new(Arc::new(config), Arc::new(upstream), fallback))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, load_error) = match Config::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_logging(cli.verbose, &config.logging.level);

    match load_error {
        None => log::info!("Loaded configuration from {}", cli.config.display()),
        Some(e) => log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        ),
    }
    let config = config.with_env_overrides();

    match cli.command {
        Command::Serve { port } => {
            let (mut config, fallback) = config::with_fallback_regions(config)?;
            if let Some(port) = port {
                config.server.port = port;
            }
            let host: IpAddr = config.server.host.parse().map_err(|e| {
                AppError::config(format!("Invalid server.host {:?}: {e}", config.server.host))
            })?;
            let addr = SocketAddr::new(host, config.server.port);

            let lookups = build_lookups(config, fallback)?;
            let state = AppState::new(Arc::new(lookups));
            server::serve(addr, state, shutdown_on(tokio::signal::ctrl_c())).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");

            match config::load_fallback_regions(&config) {
                Ok(table) => log::info!(
                    "✓ Fallback regions OK (version {}, {} regions)",
                    table.version,
                    table.regions.len()
                ),
                Err(e) => {
                    log::error!("Fallback region table invalid: {}", e);
                    return Err(e);
                }
            }

            log::info!("All validations passed!");
        }

        Command::Fetch {
            npsn,
            option_type,
            search,
            min_distance,
            max_distance,
            origin_school,
            strategy,
        } => {
            let (config, fallback) = config::with_fallback_regions(config)?;
            let strategy = strategy.unwrap_or(config.ranking.strategy);
            let lookups = build_lookups(config, fallback)?;

            let records = lookups
                .load_registrants(Some(&npsn), Some(&option_type))
                .await;
            let filter = RegistrantFilter {
                search_text: search,
                min_distance,
                max_distance,
                origin_school_name: origin_school,
            };
            let ranked = rank(&records, &filter, strategy);

            log::info!(
                "{} of {} registrants match ({:?})",
                ranked.len(),
                records.len(),
                strategy
            );
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        }
    }

    Ok(())
}
