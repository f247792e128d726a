//! Greensite CLI
//!
//! Command-line interface for greensite - provisioning, seeding and
//! live content sync for the marketing site.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "greensite")]
#[command(about = "Greensite - content sync and provisioning for the marketing site")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create missing collections, attributes and the media bucket
    Provision,
    /// Create missing singleton documents with default content
    Seed,
    /// Run the full initialization sequence (provision, seed, load)
    Init,
    /// Show configuration, remote reachability and sync state
    Status,
    /// Follow remote changes live
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage the media library
    Media {
        #[command(subcommand)]
        command: MediaCommands,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (endpoint, project_id, api_key, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[derive(Subcommand)]
enum MediaCommands {
    /// Upload a file to the media library
    #[command(alias = "add")]
    Upload {
        /// Path to the file
        path: PathBuf,
        /// Description shown in the gallery
        #[arg(short, long)]
        description: Option<String>,
        /// Include in the homepage slider
        #[arg(long)]
        slider: bool,
    },
    /// List media items
    #[command(alias = "ls")]
    List,
    /// Edit a media item
    Edit {
        /// Media item ID
        id: String,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// Include in the homepage slider (true/false)
        #[arg(long)]
        slider: Option<bool>,
    },
    /// Delete a media item (storage object and gallery entry)
    #[command(alias = "rm")]
    Delete {
        /// Media item ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --json output stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    match cli.command {
        Commands::Provision => commands::provision::run(&output).await,
        Commands::Seed => commands::seed::run(&output).await,
        Commands::Init => commands::init::run(&output).await,
        Commands::Status => commands::status::run(&output).await,
        Commands::Watch => commands::watch::run(&output).await,
        Commands::Config { command } => handle_config_command(command, &output),
        Commands::Media { command } => handle_media_command(command, &output).await,
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

async fn handle_media_command(command: MediaCommands, output: &Output) -> Result<()> {
    match command {
        MediaCommands::Upload {
            path,
            description,
            slider,
        } => commands::media::upload(path, description, slider, output).await,
        MediaCommands::List => commands::media::list(output).await,
        MediaCommands::Edit {
            id,
            name,
            description,
            slider,
        } => commands::media::edit(id, name, description, slider, output).await,
        MediaCommands::Delete { id } => commands::media::delete(id, output).await,
    }
}
