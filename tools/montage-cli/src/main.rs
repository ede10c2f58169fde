//! Montage CLI: build, inspect, preview and export timeline projects.
//!
//! Usage:
//!   montage init <NAME>                  Create an empty project
//!   montage info <ID>                    Show tracks, clips and assets
//!   montage validate <ID>                Check model consistency
//!   montage import <ID> <FILE>           Import a media file
//!   montage track add <ID> <KIND>        Append a track
//!   montage add-clip <ID> ...            Place an asset on a track
//!   montage split <ID> ...               Split a clip
//!   montage export <ID>                  Render the video tracks
//!   montage preview <ID>                 Run headless playback

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use montage_common::config::{AppConfig, LoggingConfig};
use montage_project_model::MediaKind;

mod commands;

#[derive(Parser)]
#[command(
    name = "montage",
    about = "Non-linear timeline editing from the command line",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project store directory (defaults to the configured projects dir)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Ruler length in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Show project information
    Info {
        /// Project id
        id: String,
    },

    /// Check a project for inconsistencies
    Validate {
        /// Project id
        id: String,
    },

    /// Import a media file as an asset
    Import {
        /// Project id
        id: String,

        /// Media file
        file: PathBuf,

        /// Declared kind: video|audio|image (inferred from the extension if omitted)
        #[arg(long)]
        kind: Option<String>,

        /// Copy the file's bytes into the project store
        #[arg(long)]
        embed: bool,
    },

    /// Track operations
    Track {
        #[command(subcommand)]
        command: TrackCommands,
    },

    /// Place an asset on a track
    AddClip {
        /// Project id
        id: String,

        /// Target track id
        #[arg(long)]
        track: u64,

        /// Asset id
        #[arg(long)]
        asset: u64,

        /// Timeline start in seconds
        #[arg(long, default_value = "0")]
        start: f64,

        /// Clip length in seconds (defaults to the asset length)
        #[arg(long)]
        duration: Option<f64>,

        /// Opacity or volume in [0, 1]
        #[arg(long)]
        level: Option<f64>,
    },

    /// Split a clip in two at a timeline time
    Split {
        /// Project id
        id: String,

        /// Clip id
        #[arg(long)]
        clip: u64,

        /// Timeline time of the cut
        #[arg(long)]
        at: f64,
    },

    /// Export the video tracks to a file
    Export {
        /// Project id
        id: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format: mp4-h264|mp4-h265|webm
        #[arg(long)]
        format: Option<String>,

        /// Print the render plan as JSON instead of transcoding
        #[arg(long)]
        dry_run: bool,
    },

    /// Play the timeline headlessly, logging what the preview would show
    Preview {
        /// Project id
        id: String,

        /// Start position in seconds
        #[arg(long, default_value = "0")]
        from: f64,

        /// Frame rate of the preview loop
        #[arg(long)]
        fps: Option<u32>,
    },
}

#[derive(Subcommand)]
enum TrackCommands {
    /// Append a track
    Add {
        /// Project id
        id: String,

        /// Track kind: video|audio
        kind: MediaKind,

        /// Display name
        #[arg(long)]
        name: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = AppConfig::load();

    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    montage_common::logging::init_logging(&LoggingConfig {
        level,
        ..config.logging.clone()
    });

    if let Some(store) = cli.store {
        config.projects_dir = store;
    }

    match cli.command {
        Commands::Init { name, duration } => commands::init::run(&config, name, duration),
        Commands::Info { id } => commands::info::run(&config, &id),
        Commands::Validate { id } => commands::validate::run(&config, &id),
        Commands::Import {
            id,
            file,
            kind,
            embed,
        } => commands::import::run(&config, &id, file, kind, embed).await,
        Commands::Track {
            command: TrackCommands::Add { id, kind, name },
        } => commands::track::add(&config, &id, kind, name),
        Commands::AddClip {
            id,
            track,
            asset,
            start,
            duration,
            level,
        } => commands::clip::add(&config, &id, track, asset, start, duration, level),
        Commands::Split { id, clip, at } => commands::clip::split(&config, &id, clip, at),
        Commands::Export {
            id,
            output,
            format,
            dry_run,
        } => commands::export::run(&config, &id, output, format, dry_run).await,
        Commands::Preview { id, from, fps } => commands::preview::run(&config, &id, from, fps).await,
    }
}
