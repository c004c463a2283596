// ABOUTME: CLI entry point for npconv
// ABOUTME: Parses commands, loads configuration and routes to the command handlers

use clap::{Parser, Subcommand};
use npconv::backup::{Direction, Mode};
use npconv::commands::{self, BackupArgs, PasteArgs};
use npconv::config::load_config;
use npconv::session::Session;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "npconv")]
#[command(about = "Convert and merge NewPipe and LibreTube backups", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to npconv.toml (defaults to ./npconv.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a backup to the other app's format, or merge it into an existing backup
    Backup {
        #[arg(long, value_enum)]
        mode: Mode,
        #[arg(long, value_enum)]
        direction: Direction,
        /// NewPipe backup database (newpipe.db)
        #[arg(long)]
        newpipe: Option<PathBuf>,
        /// LibreTube backup database
        #[arg(long)]
        libretube: Option<PathBuf>,
        /// Directory for the output file (overrides backup.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Split base64 images out of pasted Markdown and clean up the text
    Paste {
        /// Pasted Markdown (defaults to stdin)
        #[arg(long)]
        input: Option<PathBuf>,
        /// Where to write the cleaned text (defaults to stdout)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory to save extracted images in
        #[arg(long)]
        images_dir: Option<PathBuf>,
        /// Run the cleaned text through the Markdown formatter
        #[arg(long)]
        format: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so paste output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    };
    let session = Session::new(config);

    let result = match cli.command {
        Commands::Backup {
            mode,
            direction,
            newpipe,
            libretube,
            output_dir,
        } => commands::backup(
            &session,
            BackupArgs {
                mode,
                direction,
                newpipe,
                libretube,
                output_dir,
            },
        )
        .await
        .map(|path| println!("{}", path.display())),
        Commands::Paste {
            input,
            output,
            images_dir,
            format,
        } => commands::paste(
            &session,
            PasteArgs {
                input,
                output,
                images_dir,
                format,
            },
        )
        .await
        .map(|_| ()),
    };

    if let Err(e) = result {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_backup_arguments() {
        let cli = Cli::parse_from([
            "npconv",
            "backup",
            "--mode",
            "merge",
            "--direction",
            "to-newpipe",
            "--newpipe",
            "np.db",
            "--libretube",
            "lt.db",
        ]);
        match cli.command {
            Commands::Backup {
                mode, direction, ..
            } => {
                assert_eq!(mode, Mode::Merge);
                assert_eq!(direction, Direction::ToNewpipe);
            }
            _ => panic!("expected backup command"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["npconv", "paste", "--format", "--config", "my.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
    }
}
