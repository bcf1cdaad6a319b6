//! ToolMux host binary
//!
//! Loads backend configs, connects every backend and either lists the merged
//! tool registry or executes one namespaced tool.

mod settings;

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};

use toolmux_core::{branding, load_backend_configs, merge_backend_configs};
use toolmux_gateway::{MultiServerManager, OAuthClient, RmcpTransportFactory};
use toolmux_storage::TrustStore;

use settings::AppSettings;

#[derive(Parser, Debug)]
#[command(name = "toolmux", version, about = "Aggregate MCP tools from several backends")]
struct Cli {
    /// Backend config file(s); earlier files win on duplicate names
    #[arg(short, long = "config", global = true)]
    config: Vec<PathBuf>,

    /// Directory for cached OAuth tokens and client registrations
    #[arg(long, env = "TOOLMUX_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the merged tool registry as JSON
    Tools,
    /// Execute one namespaced tool (`<backend>::<tool>`)
    Call {
        name: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Check that a valid access token can be obtained for a resource URL
    Token { url: String },
}

fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let logs_dir = branding::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("failed to create logs directory {}", logs_dir.display()))?;

    // Files like: toolmux.2026-10-18.log
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(branding::LOG_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)
        .context("failed to create log file appender")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("warn")
            .add_directive("toolmux=info".parse()?)
            .add_directive("toolmux_core=info".parse()?)
            .add_directive("toolmux_gateway=info".parse()?)
            .add_directive("toolmux_storage=info".parse()?),
    };

    // Console goes to stderr; stdout carries command output.
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Load `.env` (the given file, or the nearest one) before parsing so that
/// `env = ...` arguments see its values.
fn parse_cli<I, T>(env_file: Option<&Path>, args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let _ = match env_file {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    Cli::parse_from(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli(None, std::env::args_os());
    // Dropping the guard stops file logging
    let _log_guard = init_tracing()?;

    let settings = AppSettings::from_env()?;
    let cache_dir = cli.cache_dir.clone().unwrap_or_else(branding::oauth_cache_dir);
    info!(cache_dir = %cache_dir.display(), "Starting {}", branding::DISPLAY_NAME);

    let store = Arc::new(TrustStore::new(cache_dir));
    let oauth = Arc::new(OAuthClient::new(store, settings.oauth_settings()));

    if let Command::Token { url } = &cli.command {
        return match oauth.get_valid_access_token(url).await {
            Ok(_) => {
                println!("A valid access token is available for {}", url);
                Ok(())
            }
            Err(e) => bail!("could not obtain an access token for {}: {}", url, e),
        };
    }

    if cli.config.is_empty() {
        bail!("at least one --config file is required");
    }

    let mut sources = Vec::with_capacity(cli.config.len());
    for path in &cli.config {
        let parsed = load_backend_configs(path).await?;
        for error in &parsed.errors {
            warn!(config = %path.display(), error = %error, "Ignoring backend entry");
        }
        sources.push(parsed.configs);
    }
    let configs = merge_backend_configs(sources);

    let manager = MultiServerManager::new(Arc::new(RmcpTransportFactory::default()), Some(oauth));
    let report = manager.init(configs).await;
    for failure in &report.failed {
        warn!(backend = %failure.name, reason = %failure.reason, "Backend unavailable");
    }

    let outcome = run(&manager, cli.command).await;
    manager.close().await;
    outcome
}

async fn run(manager: &MultiServerManager, command: Command) -> Result<()> {
    match command {
        Command::Tools => {
            let tools = manager.get_tools().await;
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Command::Call { name, args } => {
            let args: Value = serde_json::from_str(&args).context("--args must be valid JSON")?;
            let result = manager.execute_tool(&name, args).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Token { .. } => {}
    }
    Ok(())
}
