mod cache_commands;
mod config_commands;
mod request_commands;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    picker_config::PickerConfig,
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "picker", about = "Single-flight media picker coordinator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file (overrides discovery of picker.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "PICKER_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire images or videos and print the outcome as JSON.
    Request(request_commands::RequestArgs),
    /// Claim a result left behind by an earlier run.
    Recover(request_commands::RecoverArgs),
    /// Inspect or clear the persisted request state.
    Cache {
        #[command(subcommand)]
        action: cache_commands::CacheAction,
    },
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries command output.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<PickerConfig> {
    match path {
        Some(path) => {
            let mut config = picker_config::load_config(path)?;
            picker_config::apply_env_overrides(&mut config);
            Ok(config)
        },
        None => Ok(picker_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_telemetry(&cli);
    debug!(version = env!("CARGO_PKG_VERSION"), "picker starting");

    let config = load_config(cli.config.as_ref())?;

    let metrics = picker_metrics::init_metrics(picker_metrics::MetricsRecorderConfig {
        enabled: config.metrics.enabled,
        global_labels: Vec::new(),
    })?;

    let result = match cli.command {
        Commands::Request(args) => request_commands::handle_request(&config, args).await,
        Commands::Recover(args) => request_commands::handle_recover(&config, args).await,
        Commands::Cache { action } => cache_commands::handle_cache(&config, action).await,
        Commands::Config { action } => {
            config_commands::handle_config(&config, cli.config.as_deref(), action)
        },
    };

    let rendered = metrics.render();
    if !rendered.is_empty() {
        info!("metrics at exit:\n{rendered}");
    }
    result
}
