//! pagehand - natural-language commands for web pages
//!
//! Main entry point for the pagehand CLI.

mod cli;
mod cmd_run;
mod register;

use clap::Parser;
use tracing::{error, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pagehand_config::{Config, ConfigLoader};

use crate::cli::{Cli, Commands};
use crate::register::{pagehand_dir, report_validation};

fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = pagehand_dir().join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("pagehand")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes the file writer when dropped.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let path = cli.config.as_ref().map(|p| p.to_string_lossy().into_owned());
    let config = ConfigLoader::load_or_default(path.as_deref())?;
    if !report_validation(&config) {
        return Err("invalid configuration".into());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing()?;

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Err(e);
        }
    };

    match cli.command {
        Commands::Run { target, command } => {
            cmd_run::run_once(&config, target, command.join(" ")).await
        }
        Commands::Repl { target } => cmd_run::run_repl(&config, target).await,
        Commands::CheckConfig => {
            info!(
                "Configuration OK (provider: {}, cdp: {})",
                config.provider.kind, config.surface.cdp_endpoint
            );
            Ok(())
        }
    }
}
