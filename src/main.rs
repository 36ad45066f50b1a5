use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tracing::info;

/// One-time starting items for players joining a game server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Plugin config file, relative to the base directory
    #[arg(long, short = 'c', default_value = "starting_items.json")]
    config: PathBuf,

    /// Install directory of the plugin (defaults to the executable's directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List players that already received their starting items
    List,

    /// Forget a player so the kit is granted again
    Revoke {
        #[arg(long, allow_hyphen_values = true)]
        user_id: i64,

        #[arg(long)]
        name: String,
    },

    /// Merge a `}`-delimited players file into the store
    ImportLegacy {
        /// Defaults to legacy_players_file from the config
        path: Option<PathBuf>,
    },

    /// Write the store as a `}`-delimited players file
    ExportLegacy { path: PathBuf },

    /// Run reward scans against an in-process host and print what happened
    Simulate {
        /// JSON roster of connected players
        #[arg(long)]
        roster: PathBuf,

        #[arg(long, default_value_t = 1)]
        ticks: u64,

        /// Scratch copy of the store used by the simulation
        #[arg(long)]
        scratch: Option<PathBuf>,
    },
}

mod commands;
mod config;
mod error;
mod host;
mod kit;
mod logging;
mod managers;
mod messages;
mod plugin;
mod protocol;
mod state;

use config::{ConfigSource, PluginConfig};

fn base_dir(arg: Option<PathBuf>) -> PathBuf {
    arg.or_else(|| {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
    })
    .unwrap_or_else(|| PathBuf::from("."))
}

fn load_config(config_path: &str, base_dir: &Path) -> Result<(PluginConfig, ConfigSource)> {
    let (mut config, source) = PluginConfig::load_or_default(config_path)?;
    config.apply_env();
    config.resolve_paths(base_dir);
    config.validate()?;
    Ok((config, source))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let base_dir = base_dir(args.base_dir.clone());
    let config_path = if args.config.is_absolute() {
        args.config.clone()
    } else {
        base_dir.join(&args.config)
    };
    let config_path = config_path.display().to_string();

    let (config, source) = load_config(&config_path, &base_dir)?;
    logging::init(&config.log_level)?;

    if source == ConfigSource::Defaults {
        info!("No config file at {}, using defaults", config_path);
    }

    info!(
        "Using rewarded players file {} (channel {})",
        config.players_file, config.channel
    );

    match args.command {
        Command::List => commands::list(&config).await?,
        Command::Revoke { user_id, name } => commands::revoke(&config, user_id, &name).await?,
        Command::ImportLegacy { path } => {
            commands::import_legacy(&config, path.as_deref()).await?;
        }
        Command::ExportLegacy { path } => commands::export_legacy(&config, &path).await?,
        Command::Simulate {
            roster,
            ticks,
            scratch,
        } => {
            let roster = commands::simulate::Roster::load_from_file(&roster)?;
            let scratch = scratch.unwrap_or_else(commands::simulate::default_scratch_path);
            let summary = commands::simulate(&config, &roster, ticks, &scratch).await?;
            let rendered = serde_json::to_string_pretty(&summary)
                .context("failed to render simulation summary")?;
            println!("{}", rendered);
        }
    }

    Ok(())
}
