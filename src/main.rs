//! `reelsource` CLI - resolve media into playable streams

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::MediaArgs;

#[derive(Parser)]
#[command(name = "reelsource")]
#[command(about = "Resolve movies and episodes into playable streams via ranked providers")]
#[command(version)]
struct Cli {
    /// Debug logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ~/.config/reelsource/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Provider declarations (default: ~/.config/reelsource/providers.toml)
    #[arg(long, global = true)]
    providers: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a movie, or an episode when --season and --episode are given
    Resolve {
        #[command(flatten)]
        media: MediaArgs,

        /// Resolve every embed of the winning source
        #[arg(long)]
        collect_all: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        /// Per-attempt deadline in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// List registered sources and embeds
    Providers {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run a single embed against a location
    Embed {
        /// Embed id
        id: String,

        /// Location passed to the embed (usually a URL)
        location: String,

        #[arg(long)]
        json: bool,
    },

    /// Run a single source
    Source {
        /// Source id
        id: String,

        #[command(flatten)]
        media: MediaArgs,

        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let paths = cmd::Paths {
        config: cli.config,
        providers: cli.providers,
    };

    match cli.command {
        Commands::Resolve {
            media,
            collect_all,
            json,
            timeout,
        } => {
            cmd::resolve::cmd_resolve(&paths, &media, collect_all, json, timeout).await?;
        }
        Commands::Providers { json } => {
            cmd::providers::cmd_providers(&paths, json)?;
        }
        Commands::Embed { id, location, json } => {
            cmd::resolve::cmd_embed(&paths, &id, &location, json).await?;
        }
        Commands::Source { id, media, json } => {
            cmd::resolve::cmd_source(&paths, &id, &media, json).await?;
        }
    }

    Ok(())
}
