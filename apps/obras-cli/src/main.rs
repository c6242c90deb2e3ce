use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clientkit::{ApiClient, FileTokenStore, Session};
use obras::{DomainError, HttpObrasClient, ObrasConfig, Service};

mod commands;
mod render;

use commands::{Commands, SessionCmd};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Obras - administrative client for construction projects
#[derive(Parser)]
#[command(name = "obras")]
#[command(about = "Obras - administrative client for construction projects")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// API base URL (overrides the one selected by api.environment)
    #[arg(long)]
    api_url: Option<String>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        api_url: cli.api_url.clone(),
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.as_ref().cloned().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.client.home_dir));
    tracing::debug!(api = %config.api.base_url(), "obras client starting");

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(ExitCode::SUCCESS);
    }

    let command = match cli.command {
        Some(Commands::Session(SessionCmd::Check)) => {
            check_config(&config)?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(cmd) => cmd,
        None => {
            Cli::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let service = build_service(&config)?;
    match commands::execute(command, &service).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => match err.downcast_ref::<DomainError>() {
            Some(domain) => {
                tracing::debug!(error = ?err, "command failed");
                eprintln!("{}", domain);
                if domain.requires_login() {
                    eprintln!("obras session login --email <correo>");
                }
                Ok(ExitCode::FAILURE)
            }
            None => Err(err),
        },
    }
}

/// Session from the persisted tokens, the intercepting API client and the
/// screen service on top.
fn build_service(config: &AppConfig) -> Result<Service> {
    let store = Arc::new(FileTokenStore::new(config.session_path()));
    let session = Arc::new(Session::hydrate(store).context("Failed to restore session")?);
    tracing::debug!(state = ?session.auth_state(), "session restored");

    let base = config.api.parsed_base_url()?;
    let api = ApiClient::from_config(base, config.api.timeout_sec, session.clone())
        .context("Failed to build HTTP client")?;

    let module_cfg: ObrasConfig = config.module_config("obras")?;
    Ok(Service::new(
        Arc::new(HttpObrasClient::new(api)),
        session,
        module_cfg,
    ))
}

fn check_config(config: &AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");
    config.api.parsed_base_url()?;
    let _: ObrasConfig = config.module_config("obras")?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
