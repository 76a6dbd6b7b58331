#![forbid(unsafe_code)]

//! `fog-supervisor` — session launcher for the fog anomaly-detection lab.
//!
//! Loads the session configuration (or the built-in lab session), installs
//! signal handling, then starts the background services, runs the
//! foreground driver, and tears everything down when it ends.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use fog_supervisor::config::SessionConfig;
use fog_supervisor::orchestrator::os_process::OsProcessBackend;
use fog_supervisor::orchestrator::prereq::check_prerequisites_in_env;
use fog_supervisor::orchestrator::Orchestrator;
use fog_supervisor::{signals, AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "fog-supervisor", about = "Fog lab session supervisor", version, long_about = None)]
struct Cli {
    /// Path to a TOML session file; the built-in lab session is used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the directory for per-service log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Supervisor log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Validate the configuration and required executables, then exit.
    #[arg(long)]
    check: bool,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("fog-supervisor: {err}");
        return ExitCode::from(err.exit_code());
    }
    info!("fog-supervisor bootstrap");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(%err, "failed to build tokio runtime");
            return ExitCode::from(AppError::Io(err.to_string()).exit_code());
        }
    };

    let code = runtime.block_on(async {
        match run(args).await {
            Ok(code) => code,
            Err(err) => {
                error!(%err, "fog-supervisor failed");
                err.exit_code()
            }
        }
    });

    ExitCode::from(code)
}

async fn run(args: Cli) -> Result<u8> {
    // ── Load configuration ──────────────────────────────
    let mut config = match args.config {
        Some(ref path) => SessionConfig::load_from_path(path)?,
        None => {
            info!("no --config given; using built-in fog lab session");
            SessionConfig::fog_default()?
        }
    };

    if let Some(dir) = args.log_dir {
        config.log_dir = dir;
    }
    info!(
        services = config.service.len(),
        log_dir = %config.log_dir.display(),
        "configuration loaded"
    );

    if args.check {
        check_prerequisites_in_env(&config.required_executables())?;
        info!("preflight check passed");
        return Ok(0);
    }

    // ── Install signal handling before anything is launched ──
    let cancel = CancellationToken::new();
    let _signal_listener = signals::spawn_signal_listener(cancel.clone())?;

    // ── Run the session ─────────────────────────────────
    let mut orchestrator = Orchestrator::new(OsProcessBackend::new(), &config, cancel);
    let report = orchestrator.run().await;

    info!(exit_code = report.exit_code, "fog-supervisor session finished");
    Ok(report.exit_code)
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
