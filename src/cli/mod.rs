//! CLI module for Hark.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Hark - YouTube transcript ingestion
///
/// Ingests a video's spoken content into a chunked, vector-embedded
/// knowledge base, falling back across transcript sources as needed.
#[derive(Parser, Debug)]
#[command(name = "hark")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest a video's spoken content
    Ingest {
        /// YouTube URL or video ID
        input: String,

        /// Force re-processing even if already ingested
        #[arg(short, long)]
        force: bool,
    },

    /// List ingested videos
    List,

    /// Delete an ingested video and its embeddings
    Delete {
        /// Video ID to delete
        video_id: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init,
}
