use anyhow::Result;
use clap::{Parser, Subcommand};

use statepack::cli::{handle_archive_command, ArchiveCommands};
use statepack::config::{paths::StatePaths, settings::Settings};

#[derive(Parser)]
#[command(
    name = "statepack",
    version,
    about = "Versioned backup and restore of application state",
    long_about = "statepack captures preferences, databases and account credentials \
                  into self-describing archive folders, and restores them on the same \
                  or a newer version."
)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, env = "STATEPACK_LOG")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Archive(ArchiveCommands),

    /// Show current configuration and paths
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize paths and settings
    let paths = StatePaths::new()?;
    let settings = Settings::load_or_create(&paths)?;

    let level = cli.log_level.as_deref().unwrap_or(settings.log_level.as_str());
    statepack::logging::init(level)?;

    match cli.command {
        Some(Commands::Archive(cmd)) => {
            handle_archive_command(&paths, &settings, cmd)?;
        }
        Some(Commands::Config) => {
            println!("statepack Configuration");
            println!("=======================");
            println!("Base directory:   {}", paths.base_dir().display());
            println!("Data directory:   {}", paths.data_dir().display());
            println!("Backup directory: {}", paths.backup_dir().display());
            println!();
            println!("Settings:");
            println!("  Databases:          {}", settings.databases.join(", "));
            println!("  Failure policy:     {:?}", settings.failure_policy);
            println!("  Require empty dest: {}", settings.require_empty_destination);
            println!("  Keep archives:      {}", settings.retention.keep_count);
            println!("  Log level:          {}", settings.log_level);
        }
        None => {
            println!("statepack - versioned backup and restore of application state");
            println!();
            println!("Run 'statepack --help' for usage information.");
        }
    }

    Ok(())
}
