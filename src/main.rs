//! Bare-Metal Host Operator
//!
//! Runs the HostFirmwareSettings controller against the current cluster.

use clap::Parser;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use baremetal_host_operator::firmware::controller;
use baremetal_host_operator::{AccessRegistry, Error, ReconcilerConfig, Result};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Bare-Metal Host Operator - firmware settings, RAID and BMC reconciliation
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Only watch resources in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Give up retrying conflicting writes after this many seconds
    #[arg(long, env = "CONFLICT_RETRY_SECS", default_value = "30")]
    conflict_retry_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Bare-Metal Host Operator");
    info!("  Version: {}", baremetal_host_operator::VERSION);
    info!("  Namespace: {}", args.namespace.as_deref().unwrap_or("<all>"));
    info!(
        "  BMC types: {}",
        AccessRegistry::with_default_drivers().bmc_types().join(", ")
    );

    let config = ReconcilerConfig {
        conflict_retry_timeout: Duration::from_secs(args.conflict_retry_secs),
        ..Default::default()
    };

    let client = kube::Client::try_default()
        .await
        .map_err(|e| Error::Configuration(format!("Failed to create Kubernetes client: {}", e)))?;

    controller::run(client, args.namespace.as_deref(), config).await?;

    info!("Operator shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "kube=info", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
