mod app;
mod config;
mod effects;
mod render;
mod session;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::LevelFilter;
use poller_logging::{poller_error, poller_info, poller_warn, LogDestination};

use app::RunOutcome;
use config::{AppConfig, CliArgs, Command, DEFAULT_CONFIG_FILE};
use session::SessionStore;

fn main() -> ExitCode {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(64);
        }
    };

    match run(args) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            poller_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> anyhow::Result<RunOutcome> {
    let (config_path, required) = match args.config_path {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    };
    let mut config = AppConfig::load(&config_path, required)?;
    config.apply_env(|name| std::env::var(name).ok());

    let level = poller_logging::parse_level(&config.log_level).unwrap_or(LevelFilter::Info);
    let destination = match config.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    if !poller_logging::initialize(destination, level) {
        // Reaches a logger only if another one was already installed.
        poller_warn!("Logger setup failed; continuing without the configured log");
        eprintln!("warning: logging could not be initialized");
    }
    poller_info!("cv_poller starting against {}", config.api_url);

    let session = Arc::new(match config.token_override.clone() {
        Some(token) => SessionStore::with_token(&config.session_file, token),
        None => SessionStore::load(&config.session_file),
    });

    match args.command {
        Command::Login(token) => {
            session.save(&token)?;
            println!("Token saved to {}", config.session_file.display());
            Ok(RunOutcome::Idle)
        }
        Command::Logout => {
            if session.clear()? {
                println!("Logged out.");
            } else {
                println!("No stored session.");
            }
            Ok(RunOutcome::Idle)
        }
        Command::Status => app::run_status(&config, session),
        Command::Upload(path) => app::run_upload(&config, session, &path),
    }
}
