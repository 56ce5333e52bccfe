//! cheevo CLI - achievement unlock notifier

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmd;

/// cheevo - Desktop notifications for emulator achievement unlocks
#[derive(Parser)]
#[command(name = "cheevo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the daemon
    Start {
        /// Run in the foreground instead of detaching
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Show daemon and folder status
    Status,
    /// List achievement files in the configured folders
    Scan,
    /// View or edit settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// List all settings
    List,
    /// Print one setting
    Get {
        /// Dotted key, e.g. watch.debounce_ms
        key: String,
    },
    /// Change one setting
    Set {
        /// Dotted key, e.g. watch.debounce_ms
        key: String,
        /// New value; lists are comma separated
        value: String,
    },
    /// Add a folder to watch
    AddFolder { folder: PathBuf },
    /// Stop watching a folder
    RemoveFolder { folder: PathBuf },
    /// Print the settings file location
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an example settings file
    Example,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A foreground daemon also logs to a daily file under the state directory
    let log_dir = match &cli.command {
        Commands::Start { foreground: true } => Some(cheevo_cli::util::log_dir()?),
        _ => None,
    };
    let _guard = init_tracing(log_dir)?;

    match cli.command {
        Commands::Start { foreground } => cmd::start::run(foreground).await,
        Commands::Stop => cmd::stop::run().await,
        Commands::Status => cmd::status::run().await,
        Commands::Scan => cmd::scan::run().await,
        Commands::Config { action } => match action {
            ConfigAction::List => cmd::config::run_list().await,
            ConfigAction::Get { key } => cmd::config::run_get(&key).await,
            ConfigAction::Set { key, value } => cmd::config::run_set(&key, &value).await,
            ConfigAction::AddFolder { folder } => cmd::config::run_add_folder(&folder).await,
            ConfigAction::RemoveFolder { folder } => cmd::config::run_remove_folder(&folder).await,
            ConfigAction::Path { create } => cmd::config::run_path(create).await,
            ConfigAction::Example => cmd::config::run_example().await,
        },
    }
}

/// `RUST_LOG` filtering, `info` by default
fn init_tracing(log_dir: Option<PathBuf>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr));

    match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(dir, "cheevo.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Ok(Some(guard))
        }
        None => {
            registry.init();
            Ok(None)
        }
    }
}
