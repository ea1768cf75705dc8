//! Query an ElastiCache configuration endpoint and print the cluster nodes

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use elasticache_autodiscovery::cluster::{Endpoint, EndpointOptions};

/// Print the node list reported by an ElastiCache configuration endpoint
#[derive(Parser, Debug)]
#[command(name = "elasticache-discover")]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration endpoint (host:port)
    endpoint: String,

    /// Treat the endpoint as a single memcached node without discovery
    #[arg(long = "standalone")]
    standalone: bool,

    /// Also fetch and print server stats
    #[arg(long = "stats")]
    stats: bool,

    /// Print JSON instead of text
    #[arg(long = "json")]
    json: bool,

    /// Connect timeout in milliseconds
    #[arg(long = "connect-timeout-ms")]
    connect_timeout_ms: Option<u64>,

    /// Socket read/write timeout in milliseconds (default: none)
    #[arg(long = "io-timeout-ms")]
    io_timeout_ms: Option<u64>,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn run(args: &Args) -> Result<()> {
    let options = EndpointOptions {
        standalone_mode: args.standalone,
        connect_timeout: args.connect_timeout_ms.map(Duration::from_millis),
        io_timeout: args.io_timeout_ms.map(Duration::from_millis),
    };

    let endpoint = Endpoint::new(&args.endpoint, options)?;
    let config = endpoint
        .config()
        .with_context(|| format!("Failed to discover nodes from {}", endpoint.address()))?;
    let stats = if args.stats {
        Some(endpoint.stats().context("Failed to fetch stats")?)
    } else {
        None
    };

    if args.json {
        let json = serde_json::json!({
            "endpoint": endpoint.address(),
            "version": config.version,
            "nodes": config.nodes,
            "servers": config.servers(),
            "stats": stats.map(|s| s.fields()),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    println!("Endpoint: {}", endpoint.address());
    println!("Config version: {}", config.version);
    println!("Nodes ({}):", config.num_nodes());
    for node in &config.nodes {
        println!("  {:<50} {:<16} {}", node.host, node.ip, node.port);
    }

    if let Some(stats) = stats {
        println!(
            "Engine version: {}",
            stats.version().unwrap_or("unknown")
        );
        for (key, value) in stats.fields() {
            println!("  {} = {}", key, value);
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    setup_logging(args.verbose, args.quiet);

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
