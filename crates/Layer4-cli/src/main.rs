//! HotFix CLI - Main entry point

mod applier;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// HotFix - hot patch manager
#[derive(Parser, Debug)]
#[command(name = "hotfix")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Data directory (patch directory and version marker live here)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Host application version used by the version gate
    /// (required by every command except `list`)
    #[arg(long)]
    app_version: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare the patch directory and run the version check
    Init,
    /// Copy a patch archive into the patch directory and apply it
    Add {
        /// Path to the patch archive
        path: PathBuf,
    },
    /// Apply stored patches
    Load {
        /// Apply only to this scope instead of the default one
        #[arg(short, long)]
        scope: Option<String>,
    },
    /// List stored patches, oldest first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every patch and reset the version marker
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = commands::resolve_config(args.data_dir)?;

    // list 는 버전 게이트를 거치지 않음
    if let Command::List { json } = args.command {
        let coordinator = commands::inspect(config).await?;
        return commands::list(&coordinator, json);
    }

    let Some(app_version) = args.app_version else {
        anyhow::bail!("--app-version is required: a mismatched version purges every stored patch");
    };
    let session = commands::open(config, &app_version).await?;

    match args.command {
        Command::Init => commands::init(&session),
        Command::Add { path } => commands::add(&session, &path).await?,
        Command::Load { scope } => commands::load(&session, scope).await,
        Command::Clear => commands::clear(&session).await?,
        Command::List { .. } => {}
    }

    Ok(())
}
