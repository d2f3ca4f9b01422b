//! Site-Scanner main entry point
//!
//! This is the command-line interface for the Site-Scanner crawler.

use anyhow::{bail, Context};
use clap::Parser;
use site_scanner::config::{load_config_with_hash, Config};
use site_scanner::crawler::crawl;
use site_scanner::output::{print_crawl_stats, print_store_summary};
use site_scanner::storage::{open_datastore, Datastore, MemoryDatastore, RunStatus};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Site-Scanner: a bounded-parallel site graph crawler
///
/// Site-Scanner fetches the configured seeds, extracts references from every
/// HTML and CSS response and follows each in-scope URL exactly once.
#[derive(Parser, Debug)]
#[command(name = "site-scanner")]
#[command(version)]
#[command(about = "A bounded-parallel site graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &config_hash, cli.quiet).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_scanner=info,warn"),
            1 => EnvFilter::new("site_scanner=debug,info"),
            2 => EnvFilter::new("site_scanner=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Scanner Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Parallel fetches: {}", config.crawler.parallel);
    println!("  Failure policy: {:?}", config.crawler.failure_policy);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.user_agent_string());

    println!("\nOutput:");
    match &config.output.database_path {
        Some(path) => println!("  Database: {}", path),
        None => println!("  Database: (in memory)"),
    }

    println!("\nScope:");
    println!("  Seeds ({}):", config.scope.seeds.len());
    for seed in &config.scope.seeds {
        println!("    * {}", seed);
    }
    println!("  Prefixes ({}):", config.scope.prefixes.len());
    for prefix in &config.scope.prefixes {
        println!("    * {}", prefix);
    }
    println!("  Domains ({}):", config.scope.domains.len());
    for domain in &config.scope.domains {
        println!("    * {}", domain);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.scope.seeds.len()
    );
}

/// Handles the --stats mode: shows stored counts from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let Some(path) = &config.output.database_path else {
        bail!("--stats needs output.database-path to be set");
    };

    println!("Database: {}\n", path);
    let store = open_datastore(Path::new(path))
        .with_context(|| format!("Failed to open database {}", path))?;

    let counts = store.counts()?;
    let statuses = store.status_breakdown()?;
    let latest_run = store.latest_run()?;

    print_store_summary(&counts, &statuses, latest_run.as_ref());
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, config_hash: &str, quiet: bool) -> anyhow::Result<()> {
    tracing::info!(
        "Seeds: {}, Prefixes: {}, Domains: {}",
        config.scope.seeds.len(),
        config.scope.prefixes.len(),
        config.scope.domains.len()
    );

    let result = match &config.output.database_path {
        Some(path) => {
            let store = Arc::new(
                open_datastore(Path::new(path))
                    .with_context(|| format!("Failed to open database {}", path))?,
            );
            let run_id = store.create_run(config_hash)?;
            tracing::info!("Starting crawl run {}", run_id);

            let result = crawl(config, Arc::clone(&store) as Arc<dyn Datastore>).await;
            let status = if result.is_ok() {
                RunStatus::Completed
            } else {
                RunStatus::Failed
            };
            store.finish_run(run_id, status)?;
            result
        }
        None => crawl(config, Arc::new(MemoryDatastore::new())).await,
    };

    match result {
        Ok(stats) => {
            tracing::info!("Crawl completed successfully");
            if !quiet {
                print_crawl_stats(&stats);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
