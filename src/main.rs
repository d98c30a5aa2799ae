//! prompthouse-mcp: stdio MCP relay for the PromptHouse prompt library
//!
//! Launched by an MCP client as a subprocess. Reads JSON-RPC messages from
//! stdin, answers or forwards them, and writes responses to stdout. All
//! diagnostics go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use prompthouse_mcp::config::{self, Overrides, RelayConfig};
use prompthouse_mcp::error::ConfigError;
use prompthouse_mcp::mcp::{Dispatcher, McpServer};
use prompthouse_mcp::upstream::UpstreamClient;

/// Stdio MCP relay for the PromptHouse prompt library.
///
/// Answers MCP handshake and discovery requests locally and forwards tool
/// calls to the PromptHouse API using your personal access link.
#[derive(Parser, Debug)]
#[command(name = "prompthouse-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// PromptHouse access link (overrides PROMPTHOUSE_ACCESS_LINK)
    #[arg(long, value_name = "LINK")]
    access_link: Option<String>,

    /// Upstream to use: web, local or custom
    #[arg(long, value_name = "MODE")]
    mode: Option<String>,

    /// Endpoint URL for custom mode
    #[arg(long, value_name = "URL")]
    custom_url: Option<String>,

    /// Include diagnostic data in error responses and log at debug level
    #[arg(long)]
    debug: bool,

    /// Upstream request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Retries after a connection failure
    #[arg(long, value_name = "N")]
    retries: Option<u32>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            access_link: self.access_link.clone(),
            mode: self.mode.clone(),
            custom_url: self.custom_url.clone(),
            debug: self.debug.then_some(true),
            timeout_ms: self.timeout_ms,
            retries: self.retries,
        }
    }
}

/// Determines the log level from CLI arguments, debug mode and the config
/// file, in that order.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, debug: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 if debug => Level::DEBUG,
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints a configuration failure with setup guidance to stderr.
fn report_config_error(e: &ConfigError, explicit_path: bool) {
    eprintln!("Configuration error: {e}");

    match e {
        ConfigError::MissingAccessLink => {
            eprintln!();
            eprintln!("To get your access link:");
            eprintln!("  1. Go to https://prompthouse.app");
            eprintln!("  2. Sign in to your account");
            eprintln!("  3. Click \"Set Up MCP\"");
            eprintln!("  4. Copy your personal access link");
            eprintln!();
            eprintln!("Then set PROMPTHOUSE_ACCESS_LINK or pass --access-link.");
        }
        ConfigError::ReadError { .. } | ConfigError::ParseError { .. } if !explicit_path => {
            if let Some(default_path) = config::default_config_path() {
                eprintln!("\nWhile reading: {}", default_path.display());
            }
        }
        _ => {}
    }
}

/// Entry point for the prompthouse-mcp relay.
fn main() -> ExitCode {
    let args = Args::parse();

    let config_path = args.config.as_deref();
    let resolved = config::load_config(config_path).and_then(|file| {
        RelayConfig::resolve(file, args.overrides(), config::process_env)
    });
    let cfg = match resolved {
        Ok(cfg) => cfg,
        Err(e) => {
            report_config_error(&e, config_path.is_some());
            return ExitCode::FAILURE;
        }
    };

    let log_level = get_log_level(args.verbose, args.quiet, cfg.debug, &cfg.log_level);
    init_tracing(log_level);

    let upstream = match UpstreamClient::new(&cfg) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to set up upstream client");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %cfg.mode,
        endpoint = upstream.endpoint(),
        timeout = ?cfg.timeout,
        retries = cfg.retries,
        debug = cfg.debug,
        "Starting prompthouse-mcp relay"
    );

    let server = McpServer::new(Dispatcher::new(Arc::new(upstream), cfg.debug));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(server.run());

    // The stdin reader thread may still be blocked in a read; don't wait for it.
    runtime.shutdown_background();

    match result {
        Ok(()) => {
            info!("Relay shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Relay error");
            ExitCode::FAILURE
        }
    }
}
