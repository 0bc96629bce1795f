//! ripple-collector main entry point
//!
//! Command-line front end that drives a collector from a TOML config.

use anyhow::Context as _;
use clap::Parser;
use ripple_collector::config::{load_config_with_hash, Config, ExtractEntry};
use ripple_collector::output::print_statistics;
use ripple_collector::{Collector, ConcurrencyMode, CollectorError, HttpFetcher};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ripple-collector: a callback-driven web scraper
///
/// Crawls from the configured seeds, following links within the domain
/// and depth policy, and prints the elements selected by `[[extract]]`
/// entries as it goes.
#[derive(Parser, Debug)]
#[command(name = "ripple-collector")]
#[command(version)]
#[command(about = "A callback-driven web scraper", long_about = None)]
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

    /// Extra seed URLs, added to those in the config
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Do not follow `a[href]` links; only fetch the seeds
    #[arg(long)]
    no_follow: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    config.seeds.extend(cli.seeds);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, !cli.no_follow).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("ripple_collector=info,warn"),
            1 => EnvFilter::new("ripple_collector=debug,info"),
            2 => EnvFilter::new("ripple_collector=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    let policy = config.policy();

    println!("=== ripple-collector Dry Run ===\n");

    println!("Collector:");
    match policy.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unbounded"),
    }
    match policy.mode {
        ConcurrencyMode::Synchronous => println!("  Mode: synchronous"),
        ConcurrencyMode::Asynchronous { parallelism } => {
            println!("  Mode: asynchronous ({} workers)", parallelism)
        }
    }
    println!("  Request timeout: {}ms", config.collector.request_timeout_ms);
    println!("  Parse HTTP errors: {}", config.collector.parse_http_errors);

    println!("\nUser Agent: {}", config.user_agent.header_value());

    println!("\nAllowed Domains ({}):", policy.allowed_domains.len());
    for domain in &policy.allowed_domains {
        println!("  - {}", domain);
    }

    println!("\nDisallowed Domains ({}):", policy.disallowed_domains.len());
    for domain in &policy.disallowed_domains {
        println!("  - {}", domain);
    }

    println!("\nRate Rules ({}):", config.limits.len());
    for rule in config.rate_rules() {
        println!(
            "  - {} delay {:?} (+ up to {:?})",
            rule.domain_glob, rule.delay, rule.random_delay
        );
    }

    println!("\nSeeds ({}):", config.seeds.len());
    for seed in &config.seeds {
        println!("  * {}", seed);
    }

    println!("\n✓ Configuration is valid");
}

/// Registers the printing callbacks for one `[[extract]]` entry
fn register_extractor(collector: &Collector, entry: ExtractEntry) -> Result<(), CollectorError> {
    let selector = entry.selector.clone();

    collector.on_html(&selector, move |e| {
        let value = match &entry.attr {
            Some(attr) => e.attr(attr).map(str::to_string),
            None => Some(e.text().trim().to_string()),
        };

        if let Some(value) = value.filter(|v| !v.is_empty()) {
            println!("{}\t{}\t{}", e.response().url(), entry.label(), value);
        }
    })
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, follow_links: bool) -> anyhow::Result<()> {
    if config.seeds.is_empty() {
        anyhow::bail!("no seed URLs configured");
    }

    let fetcher = HttpFetcher::from_config(&config.user_agent)?;
    let collector = Collector::with_options(fetcher, config.options());
    collector.set_policy(config.policy())?;
    for rule in config.rate_rules() {
        collector.limit(rule)?;
    }

    collector.on_error(|request, error| {
        tracing::warn!("Failed {}: {}", request.url(), error);
    })?;
    collector.on_scraped(|response| {
        tracing::info!("Scraped {} ({})", response.url(), response.status());
    })?;

    if follow_links {
        collector.on_html("a[href]", |e| {
            if let Some(href) = e.attr("href") {
                // Rejections and duplicates are already logged by the collector
                let _ = e.visit(href);
            }
        })?;
    }

    for entry in config.extract.iter().cloned() {
        register_extractor(&collector, entry)?;
    }

    let enqueued = collector.visit_seeds(&config.seeds);
    if enqueued == 0 {
        anyhow::bail!("none of the {} seed URL(s) could be enqueued", config.seeds.len());
    }
    tracing::info!("Enqueued {} of {} seed(s)", enqueued, config.seeds.len());

    let interrupt = collector.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl");
            interrupt.cancel();
        }
    });

    collector.run().await?;
    let stats = collector.wait().await?;

    if !collector.is_cancelled() {
        tracing::info!("Crawl completed successfully");
    }
    println!();
    print_statistics(&stats);

    Ok(())
}
