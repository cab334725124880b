use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epgsync::config::Config;
use epgsync::service::Service;

#[derive(Parser)]
#[command(
    name = "epgsync",
    version,
    about = "Periodic channel directory and EPG refresher",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json); overrides the configured format
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh once, then keep refreshing on the configured cadence
    Serve,

    /// Run a single refresh cycle and print a summary
    Refresh,

    /// Validate the configuration and print the effective settings
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?;
    let format = cli
        .log_format
        .clone()
        .unwrap_or_else(|| config.logging.format.clone());

    setup_tracing(&format, &config.logging.level, cli.verbose)?;

    match cli.command {
        Commands::Serve => {
            tracing::info!(config = ?cli.config, "Starting serve command");
            serve(config).await?;
        }

        Commands::Refresh => {
            tracing::info!(config = ?cli.config, "Starting refresh command");
            refresh(config).await?;
        }

        Commands::CheckConfig => check_config(&config),
    }

    Ok(())
}

fn setup_tracing(format: &str, level: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("epgsync=debug,info")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(format!("epgsync={level},warn")))
            .context("Invalid log level")?
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let service = Service::from_config(config)?;
    service.start().await?;

    println!("{}", service.store().status().display());
    println!("Serving snapshots for {}", service.server_address());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutdown signal received");
    service.stop().await?;
    Ok(())
}

async fn refresh(config: Config) -> Result<()> {
    let service = Service::from_config(config)?;
    let report = service.orchestrator().run().await;

    println!("{}", report.summary());
    for failure in report.failures() {
        println!(
            "  {} failed at {}: {}",
            failure.channel_id, failure.stage, failure.reason
        );
    }
    println!();
    print!("{}", service.store().status().display());

    if !report.is_completed() {
        anyhow::bail!("refresh did not complete");
    }
    Ok(())
}

fn check_config(config: &Config) {
    println!("Configuration OK");
    println!("  Cadence:         {}", config.refresh.cron);
    println!(
        "  Max concurrent:  {} (configured {})",
        config.effective_concurrency(),
        config.refresh.max_concurrent
    );
    println!("  Server address:  {}", config.server.address);
    println!("  Directory URL:   {}", config.source.directory_url);
    println!("  Guide URL:       {}", config.source.guide_url);
    println!("  Request timeout: {:?}", config.request_timeout());
    println!("  Log format:      {}", config.logging.format);
}
