//! Top-level CLI definition and dispatch.

use std::path::PathBuf;
use std::time::SystemTime;

use clap::{Parser, Subcommand};

use crate::core::config::Config;
use crate::core::errors::{CsmError, Result};
use crate::monitor::health::{ServiceManager, SystemctlManager};
use crate::monitor::retention::{RetentionPolicy, reclaim};

/// Camera Service Monitor — keeps one streaming service alive, ships its
/// journal to Loki, and prunes expired recordings.
#[derive(Parser)]
#[command(name = "csm", version, about)]
pub struct Cli {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Run the supervision daemon in the foreground (used by systemd).
    Daemon,
    /// Query the managed service's liveness once and print the status.
    Check,
    /// Run one retention pass over the recordings directory and print the summary.
    Reclaim,
    /// Print the effective configuration.
    Config,
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Command::Daemon => {
            let mut supervisor = crate::daemon::Supervisor::new(config)?;
            supervisor.run()
        }
        Command::Check => {
            let status = SystemctlManager.query(&config.service_name);
            println!("{status}");
            Ok(())
        }
        Command::Reclaim => {
            let max_age = config.retention_age();
            let policy = RetentionPolicy::for_recordings(config.recordings_dir, max_age);
            let summary = reclaim(&policy, SystemTime::now());
            println!(
                "removed {} segments, freed {:.2} MB",
                summary.deleted,
                summary.freed_mib()
            );
            summary.failure.map_or(Ok(()), |details| {
                Err(CsmError::Runtime { details })
            })
        }
        Command::Config => {
            let rendered =
                toml::to_string_pretty(&config).map_err(|err| CsmError::Serialization {
                    context: "toml",
                    details: err.to_string(),
                })?;
            print!("{rendered}");
            Ok(())
        }
    }
}
