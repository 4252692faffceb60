mod application;
mod presentation;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;

use presentation::bootstrap::{build_default_app_state, StoreKind};
use presentation::commands;
use presentation::error::CommandError;
use presentation::state::AppState;
use streakboard_infrastructure::config::{default_data_dir, EngineConfig};

#[derive(Parser)]
#[command(name = "streakboard", version, about = "Workspace activity streaks and leaderboards")]
struct Cli {
    /// Config file (defaults to the platform data dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep streaks in memory for this run only
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record activity for a member
    Record {
        workspace: String,
        user: String,
        /// Calendar day (YYYY-MM-DD)
        #[arg(long, conflicts_with = "at")]
        date: Option<String>,
        /// Instant of the activity (RFC 3339)
        #[arg(long)]
        at: Option<String>,
    },
    /// Show one member's streak
    Get { workspace: String, user: String },
    /// Rank a workspace
    Leaderboard {
        workspace: String,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Reset a member's current streak
    Reset { workspace: String, user: String },
    /// List every streak in a workspace
    List { workspace: String },
    /// Remove a member's streak, or the whole workspace
    Remove {
        workspace: String,
        user: Option<String>,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let config_path = cli
        .config
        .unwrap_or_else(|| default_data_dir().join("config.json"));
    let config = EngineConfig::load_or_default(&config_path)?;

    let log_dir = default_data_dir().join("logs");
    if let Err(e) = streakboard_infrastructure::logging::init_logger(log_dir, config.log_level) {
        eprintln!("warning: file logging disabled: {e:#}");
    }

    let store = if cli.memory {
        StoreKind::Memory
    } else {
        StoreKind::Sqlite
    };
    let state = build_default_app_state(config, store).await?;

    dispatch(&state, cli.command).await
}

async fn dispatch(state: &AppState, command: Commands) -> Result<(), CommandError> {
    match command {
        Commands::Record {
            workspace,
            user,
            date,
            at,
        } => print_json(&commands::record_activity(state, workspace, user, date, at).await?),
        Commands::Get { workspace, user } => {
            print_json(&commands::get_streak(state, workspace, user).await?)
        }
        Commands::Leaderboard { workspace, limit } => {
            print_json(&commands::get_leaderboard(state, workspace, limit).await?)
        }
        Commands::Reset { workspace, user } => {
            print_json(&commands::reset_streak(state, workspace, user).await?)
        }
        Commands::List { workspace } => {
            print_json(&commands::list_streaks(state, workspace).await?)
        }
        Commands::Remove { workspace, user } => {
            print_json(&commands::remove_streaks(state, workspace, user).await?)
        }
        Commands::Config => print_json(&commands::show_config(state)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CommandError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| CommandError::infrastructure(format!("Failed to render output: {e}")))?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_record_rejects_date_with_instant() {
        let parsed = Cli::try_parse_from([
            "streakboard",
            "record",
            "ws",
            "amy",
            "--date",
            "2024-01-12",
            "--at",
            "2024-01-12T08:00:00Z",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = ["streakboard", "leaderboard", "ws", "--limit", "3", "--memory"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.memory);
        assert!(matches!(
            cli.command,
            Commands::Leaderboard { limit: Some(3), .. }
        ));
    }
}
