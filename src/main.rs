//! Netsift main entry point
//!
//! This is the command-line interface for the Netsift host scanner and
//! keyword index.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use netsift::address::{parse_network, DEFAULT_NETWORK};
use netsift::config::{load_config_with_hash, Config};
use netsift::output::{
    format_analytics, format_crawler_status, format_events, format_host_details,
    format_keywords, format_queue_stats, format_search_response, print_statistics,
};
use netsift::storage::open_storage;
use netsift::{Crawler, SearchEngine};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Interval between progress lines while crawling
const PROGRESS_INTERVAL: Duration = Duration::from_secs(30);

/// Netsift: random-sample HTTP host scanner
///
/// Netsift probes randomly chosen public IPv4 addresses for web servers,
/// indexes the keywords of every page that answers, and searches the
/// result.
#[derive(Parser, Debug)]
#[command(name = "netsift")]
#[command(version = "1.0.0")]
#[command(about = "Random-sample HTTP host scanner and keyword index", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan until interrupted with Ctrl-C
    Crawl {
        /// IPv4 network to sample from
        #[arg(long, default_value = DEFAULT_NETWORK)]
        network: String,

        /// Candidates to seed the queue with (defaults to max-addresses-per-run)
        #[arg(long)]
        max_addresses: Option<usize>,
    },

    /// Seed the queue without scanning
    Populate {
        #[arg(long, default_value = DEFAULT_NETWORK)]
        network: String,

        #[arg(long)]
        count: Option<usize>,
    },

    /// Show task queue counts
    Queue,

    /// Show crawl statistics
    Stats,

    /// Keyword search over active hosts
    Search {
        query: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Hosts whose domain contains a substring
    Domain {
        substring: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Most frequent keywords
    Keywords {
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Everything stored for one address
    Host { address: String },

    /// Recent searches and 24-hour statistics
    Analytics {
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::debug!("Configuration loaded (hash: {})", config_hash);

    match cli.command {
        Command::Crawl {
            network,
            max_addresses,
        } => {
            let count = max_addresses.unwrap_or(config.crawler.max_addresses_per_run as usize);
            handle_crawl(config, config_hash, &network, count).await
        }
        Command::Populate { network, count } => {
            let count = count.unwrap_or(config.crawler.max_addresses_per_run as usize);
            let crawler = Crawler::new(config, config_hash)?;
            let added = crawler.populate_queue(parse_network(&network)?, count)?;
            println!("Queued {} new addresses from {}", added, network);
            Ok(())
        }
        Command::Queue => {
            let crawler = Crawler::new(config, config_hash)?;
            print!("{}", format_queue_stats(&crawler.queue_stats()?));
            Ok(())
        }
        Command::Stats => {
            println!("Database: {}\n", config.output.database_path);
            let crawler = Crawler::new(config, config_hash)?;
            print_statistics(&crawler.stats()?);
            Ok(())
        }
        Command::Search {
            query,
            limit,
            offset,
        } => {
            let response = search_engine(&config)?.search(&query, limit, offset);
            print!("{}", format_search_response(&response));
            Ok(())
        }
        Command::Domain {
            substring,
            limit,
            offset,
        } => {
            let response = search_engine(&config)?.search_by_domain(&substring, limit, offset);
            print!("{}", format_search_response(&response));
            Ok(())
        }
        Command::Keywords { limit } => {
            let keywords = search_engine(&config)?.popular_keywords(limit);
            print!("{}", format_keywords(&keywords));
            Ok(())
        }
        Command::Host { address } => match search_engine(&config)?.host_details(&address) {
            Some(details) => {
                print!("{}", format_host_details(&details));
                Ok(())
            }
            None => bail!("no host {} in the database", address),
        },
        Command::Analytics { limit } => {
            let analytics = search_engine(&config)?.search_analytics(limit);
            print!("{}", format_analytics(&analytics));
            Ok(())
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("netsift=info,warn"),
            1 => EnvFilter::new("netsift=debug,info"),
            2 => EnvFilter::new("netsift=trace,debug"),
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

fn search_engine(config: &Config) -> anyhow::Result<SearchEngine> {
    let storage = open_storage(Path::new(&config.output.database_path))?;
    Ok(SearchEngine::from_config(config, Arc::new(Mutex::new(storage))))
}

/// Runs a scan until Ctrl-C, logging progress periodically
async fn handle_crawl(
    config: Config,
    config_hash: String,
    network: &str,
    max_addresses: usize,
) -> anyhow::Result<()> {
    let network = parse_network(network)?;
    tracing::info!(
        "Scanning {} with {} workers, seeding {} addresses",
        network,
        config.crawler.worker_count,
        max_addresses
    );

    let crawler = Arc::new(Crawler::new(config, config_hash)?);
    let mut scan = tokio::spawn({
        let crawler = Arc::clone(&crawler);
        async move { crawler.start(network, max_addresses).await }
    });

    let mut progress = tokio::time::interval(PROGRESS_INTERVAL);
    progress.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, stopping crawl");
                crawler.stop().await;
                break;
            }
            finished = &mut scan => {
                // start only returns on its own when setup failed
                if !matches!(finished, Ok(true)) {
                    bail!("crawl failed to start");
                }
                return Ok(());
            }
            _ = progress.tick() => {
                tracing::info!("{}", format_crawler_status(&crawler.status()));
                for line in format_events(&crawler.recent_events(5)).lines() {
                    tracing::debug!("{}", line);
                }
            }
        }
    }

    match scan.await {
        Ok(_) => {}
        Err(e) => tracing::warn!("Scan task ended abnormally: {}", e),
    }

    let stats = crawler.stats()?;
    println!();
    print_statistics(&stats);
    Ok(())
}
