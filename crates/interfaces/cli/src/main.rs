mod dashboard;
mod watch;

use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use agentflow_config::{AppConfig, DEFAULT_CONFIG_PATH, TelemetryConfig};

#[derive(Debug, Parser)]
#[command(
    name = "agentflow",
    version,
    about = "Terminal dashboard for multi-agent research workflows"
)]
struct Cli {
    /// Configuration file; missing files fall back to defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Backend WebSocket URL, overriding the config file and AGENTFLOW_BACKEND_URL.
    #[arg(long, global = true)]
    url: Option<String>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive dashboard (default).
    Dashboard,
    /// Run one workflow without the dashboard, printing events as lines.
    Watch {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value_t = 10)]
        connect_timeout_secs: u64,
    },
    #[command(about = "Inspect or create the configuration file")]
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Print the effective configuration as TOML.
    Show,
    /// Write a default configuration file.
    Init {
        #[arg(long)]
        force: bool,
    },
}

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// The dashboard owns the terminal, so its logs go to a daily file.
fn init_file_tracing(telemetry: &TelemetryConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&telemetry.log_dir)
        .with_context(|| format!("failed to create log dir {}", telemetry.log_dir))?;
    let appender = tracing_appender::rolling::daily(&telemetry.log_dir, "agentflow.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&telemetry.log_level))
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(guard)
}

fn init_stderr_tracing(telemetry: &TelemetryConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&telemetry.log_level))
        .with_writer(io::stderr)
        .init();
}

fn load_config(path: &Path, url: Option<String>) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(url) = url {
        config.backend.url = url;
        config.validate().context("invalid --url")?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Dashboard) {
        Commands::Dashboard => {
            let config = load_config(&cli.config, cli.url)?;
            if !io::stdout().is_terminal() {
                bail!("the dashboard needs a terminal; use `agentflow watch --prompt <text>`");
            }
            let _guard = init_file_tracing(&config.telemetry)?;
            dashboard::run_dashboard(&config).await?;
        }
        Commands::Watch {
            prompt,
            connect_timeout_secs,
        } => {
            let config = load_config(&cli.config, cli.url)?;
            init_stderr_tracing(&config.telemetry);
            return watch::run_watch(&config, &prompt, Duration::from_secs(connect_timeout_secs))
                .await;
        }
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let config = load_config(&cli.config, cli.url)?;
                print!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommands::Init { force } => {
                if cli.config.exists() && !force {
                    bail!(
                        "{} already exists; pass --force to overwrite",
                        cli.config.display()
                    );
                }
                AppConfig::default().save_to(&cli.config)?;
                println!("wrote {}", cli.config.display());
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}
