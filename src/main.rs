use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use poolwatch::alerts::{AlertSink, LogSink, SlackSink};
use poolwatch::collectors::LogTailer;
use poolwatch::config::Config;
use poolwatch::error::{AlertError, ConfigError, TailError};
use poolwatch::watcher::Watcher;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Command-line arguments for the deployment watcher
#[derive(Parser)]
#[command(
    name = "poolwatch",
    about = "Blue/green deployment watcher - failover and error-rate alerts from proxy access logs",
    long_about = "Follows the reverse proxy's JSON access log, detects traffic switching between \
                  backend pools and rolling 5xx error rates above a threshold, and sends \
                  rate-limited alerts to a Slack-compatible webhook."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Access log to follow, overriding configuration and LOG_FILE_PATH
    #[arg(short, long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Suppress all alerts while still detecting and logging
    #[arg(short, long)]
    maintenance: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (debug level)")]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// Missing config files are allowed and fall back to defaults; a path
    /// that exists but is not a file is rejected.
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        if let Some(ref log_file) = self.log_file {
            if log_file.is_dir() {
                return Err(format!("Log file path is a directory: {}", log_file.display()));
            }
        }

        Ok(())
    }

    /// Apply flags that take precedence over file and environment settings
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(ref log_file) = self.log_file {
            config.log_file = log_file.clone();
        }
        if self.maintenance {
            config.maintenance_mode = true;
        }
    }
}

/// Load configuration: defaults, then the optional file, then environment, then flags
fn load_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match cli.config {
        Some(ref path) => {
            info!("Loading configuration from: {}", path.display());
            match Config::from_file(path) {
                Ok(config) => config,
                Err(ConfigError::ReadError(e)) => {
                    warn!("Configuration file not found or unreadable ({}), using defaults", e);
                    Config::default()
                }
                Err(e) => return Err(e),
            }
        }
        None => Config::default(),
    };

    config.apply_env()?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    for warning in config.warnings() {
        warn!("Configuration: {}", warning);
    }
    Ok(config)
}

/// Pick the alert sink: webhook if configured, log-only otherwise
fn build_sink(config: &Config) -> Result<Box<dyn AlertSink>, AlertError> {
    match config.webhook_url() {
        Some(url) => {
            info!(
                "Delivering alerts to webhook (timeout {}s)",
                config.alert_timeout_seconds
            );
            Ok(Box::new(SlackSink::new(
                url.to_string(),
                config.alert_timeout(),
            )?))
        }
        None => {
            info!("No webhook configured, alerts will only be logged");
            Ok(Box::new(LogSink::new()))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    cli.validate().map_err(anyhow::Error::msg)?;

    let config = load_config(&cli).context("failed to load configuration")?;
    let sink = build_sink(&config).context("failed to set up alert delivery")?;

    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal, shutting down gracefully...");
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    let mut watcher = Watcher::new(&config, sink);

    info!("Monitoring log file: {}", config.log_file.display());
    let tailer = match LogTailer::open(&config.log_file, config.poll_interval(), running) {
        Ok(tailer) => tailer,
        Err(TailError::Stopped) => {
            info!("Watcher stopped before the log file became available.");
            return Ok(());
        }
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to open {}", config.log_file.display()))
        }
    };

    let result = watcher.run(tailer);
    watcher.stats_mut().report();
    result.context("watcher encountered a fatal read error")?;

    info!("Watcher stopped manually.");
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    info!("Starting blue/green deployment watcher");

    if let Err(e) = run(cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
