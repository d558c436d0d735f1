use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::error;
use uuid::Uuid;

use upwatch_service::{
    config::Config,
    database::{LibsqlStore, Monitor, MonitorUpdate, Store},
    monitoring::{HttpProber, RunCoordinator},
    validation::{DEFAULT_INTERVAL_SECONDS, validate_monitor_update, validate_new_monitor},
};

/// Uptime checks over a local monitor database
#[derive(Parser, Debug)]
#[command(name = "upwatch-service")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/upwatch/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply database migrations
    Migrate,
    /// Run one check cycle over every monitor and print the summary
    Run {
        /// Leave per-monitor results out of the summary
        #[arg(long)]
        quiet: bool,
    },
    /// Manage monitors
    #[command(subcommand)]
    Monitor(MonitorCommand),
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum MonitorCommand {
    /// Register a new monitor
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        url: String,
        /// Seconds between checks
        #[arg(long, default_value_t = DEFAULT_INTERVAL_SECONDS)]
        interval: u32,
    },
    /// Edit a monitor's name, URL or interval
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        url: Option<String>,
        /// Seconds between checks
        #[arg(long)]
        interval: Option<u32>,
    },
    /// List every monitor
    List,
    /// Delete a monitor and its check history
    Remove { id: Uuid },
    /// Show the most recent checks of a monitor
    Checks {
        id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match Config::from_config(cli.config.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let format = config.logging.format.parse::<logger::LogFormat>().unwrap_or_default();
    logger::init_tracing_with(&config.logging.level, format);

    match execute(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{e:#}"), "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands, config: &Config) -> Result<()> {
    if let Commands::Config(ConfigCommand::Show) = command {
        print!("{config}");
        return Ok(());
    }

    let store = LibsqlStore::open(&config.database.path, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database.path.display()))?;

    match command {
        Commands::Migrate => {
            println!("Database migrated: {}", config.database.path.display());
        }
        Commands::Run { quiet } => {
            let prober = HttpProber::from_config(&config.checks).context("Failed to build HTTP client")?;
            let coordinator = RunCoordinator::new(Arc::new(store), Arc::new(prober), config.checks.batch_size);

            let mut summary = coordinator.run_cycle().await?;
            if quiet {
                summary = summary.without_results();
            }
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Monitor(command) => monitor_command(&store, command).await?,
        Commands::Config(_) => {}
    }

    Ok(())
}

async fn monitor_command(store: &LibsqlStore, command: MonitorCommand) -> Result<()> {
    match command {
        MonitorCommand::Add { name, url, interval } => {
            validate_new_monitor(&name, &url, interval)?;

            let monitor = Monitor::new(name.trim(), url.trim(), interval);
            store.insert_monitor(&monitor).await?;
            println!("{}", monitor.id);
        }
        MonitorCommand::Update { id, name, url, interval } => {
            validate_monitor_update(name.as_deref(), url.as_deref(), interval)?;

            let update = MonitorUpdate {
                name: name.map(|name| name.trim().to_string()),
                url: url.map(|url| url.trim().to_string()),
                interval_seconds: interval,
            };
            if update.is_empty() {
                anyhow::bail!("Nothing to update; pass --name, --url or --interval");
            }

            let monitor = store.update_monitor(id, &update).await?;
            println!("Updated {}: {} {} (every {}s)", monitor.id, monitor.name, monitor.url, monitor.interval_seconds);
        }
        MonitorCommand::List => {
            let monitors = store.list_monitors().await?;
            for monitor in monitors {
                let last_checked = monitor
                    .last_checked_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string());
                println!(
                    "{}  {:<8} {:<24} {}  (every {}s, last checked {})",
                    monitor.id, monitor.status, monitor.name, monitor.url, monitor.interval_seconds, last_checked
                );
            }
        }
        MonitorCommand::Remove { id } => {
            if !store.delete_monitor(id).await? {
                anyhow::bail!("Monitor {id} not found");
            }
            println!("Removed {id}");
        }
        MonitorCommand::Checks { id, limit } => {
            if store.get_monitor(id).await?.is_none() {
                anyhow::bail!("Monitor {id} not found");
            }
            for check in store.recent_checks(id, limit).await? {
                let code = check.status_code.map(|c| c.to_string()).unwrap_or_else(|| "-".into());
                println!(
                    "{}  {:<4} {:>6} ms  {}  {}",
                    check.created_at.to_rfc3339(),
                    code,
                    check.response_time_ms,
                    if check.success { "up" } else { "down" },
                    check.message.as_deref().unwrap_or("")
                );
            }
        }
    }

    Ok(())
}
