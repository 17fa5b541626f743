//! Catalog-Harvest main entry point
//!
//! This is the command-line interface for the two harvesting phases.

use anyhow::Context;
use catalog_harvest::config::{load_or_default, Config};
use catalog_harvest::discovery::run_discovery;
use catalog_harvest::extraction::run_extraction;
use catalog_harvest::output::print_summary;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DISCOVERY_CONCURRENCY: usize = 5;
const EXTRACTION_CONCURRENCY: usize = 8;

/// Catalog-Harvest: a two-phase product catalog harvester
///
/// `discover` walks the storefront's sitemap and listing pages and writes the
/// product URL list; `extract` turns that list into validated product records.
#[derive(Parser, Debug)]
#[command(name = "catalog-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A two-phase product catalog harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    /// Directory every artifact is written to (overrides the config file)
    #[arg(long, value_name = "DIR", global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover product URLs from the sitemap and category listings
    Discover {
        /// Listings resolved at once [default: 5]
        #[arg(long, env = "HARVEST_CONCURRENCY")]
        concurrency: Option<usize>,
    },

    /// Extract product records from a URL list
    Extract {
        /// Newline-delimited product URL list
        #[arg(long, default_value = "product_urls.txt")]
        input: PathBuf,

        /// Product URLs extracted at once [default: 8]
        #[arg(long, env = "HARVEST_CONCURRENCY")]
        concurrency: Option<usize>,

        /// Discovery metadata used as category hints
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Validate the configuration and show what would be harvested
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let (mut config, config_hash) =
        load_or_default(cli.config.as_deref()).context("Failed to load configuration")?;
    match &cli.config {
        Some(path) => tracing::info!(
            "Configuration loaded from {} (hash: {})",
            path.display(),
            config_hash
        ),
        None => tracing::info!("No configuration file given; using built-in defaults"),
    }

    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.to_string_lossy().into_owned();
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    match cli.command {
        Command::Discover { concurrency } => {
            let workers = apply_concurrency(&mut config, concurrency, DISCOVERY_CONCURRENCY);
            let report = run_discovery(&config, workers, cancel)
                .await
                .context("Discovery failed")?;
            print_summary(&report.summary);
        }
        Command::Extract {
            input,
            concurrency,
            metadata,
        } => {
            let workers = apply_concurrency(&mut config, concurrency, EXTRACTION_CONCURRENCY);
            let summary = run_extraction(&config, &input, metadata.as_deref(), workers, cancel)
                .await
                .context("Extraction failed")?;
            print_summary(&summary);
        }
        Command::Check => handle_check(&config),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_harvest=info,warn"),
            1 => EnvFilter::new("catalog_harvest=debug,info"),
            2 => EnvFilter::new("catalog_harvest=trace,debug"),
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

/// Resolves the worker count for a phase
///
/// An explicit value (flag or `HARVEST_CONCURRENCY`) also becomes the
/// run-wide fetch limit, replacing the config file's `max-concurrent`.
fn apply_concurrency(config: &mut Config, requested: Option<usize>, default: usize) -> usize {
    match requested {
        Some(n) => {
            let n = n.max(1);
            config.concurrency.max_concurrent = n;
            config.concurrency.per_host = config.concurrency.per_host.min(n);
            n
        }
        None => default,
    }
}

/// First Ctrl-C cancels cooperatively; in-flight URLs finish and files are flushed
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight work");
            cancel.cancel();
        }
    });
}

/// Handles the `check` command: shows the effective configuration
fn handle_check(config: &Config) {
    println!("=== Catalog-Harvest Configuration ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Domain: {}", config.site.domain);
    println!("  Locale prefix: {}", config.site.locale_prefix);
    println!(
        "  Sitemap: {} (max depth {})",
        config.site.sitemap_url, config.site.sitemap_max_depth
    );

    println!("\nFetch:");
    println!("  Static timeout: {}ms", config.fetch.static_timeout_ms);
    println!(
        "  Rendering: {} ({} browser slots, {}ms timeout)",
        if config.fetch.rendering { "enabled" } else { "disabled" },
        config.fetch.browser_slots,
        config.fetch.render_timeout_ms
    );
    println!("  Respect robots.txt: {}", config.fetch.respect_robots);

    println!("\nConcurrency:");
    println!("  Max concurrent fetches: {}", config.concurrency.max_concurrent);
    println!("  Per host: {}", config.concurrency.per_host);
    println!(
        "  Crawl delay: {}ms (+ up to {}ms jitter)",
        config.concurrency.crawl_delay_ms, config.concurrency.jitter_ms
    );

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nOutput directory: {}", config.output.directory);

    println!("\nCategories ({}):", config.site.categories.len());
    for category in &config.site.categories {
        match &category.fallback_hub {
            Some(hub) => println!("  - {} (fallback {})", category.name, hub),
            None => println!("  - {}", category.name),
        }
    }

    println!("\n✓ Configuration is valid");
}
