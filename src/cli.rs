use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Directory overrides shared by the merge and plan commands
#[derive(clap::Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Directory containing episode videos
    #[arg(long)]
    pub video_dir: Option<PathBuf>,

    /// Directory containing audio tracks
    #[arg(long)]
    pub audio_dir: Option<PathBuf>,

    /// Output directory for merged files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

impl DirArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.video_dir {
            config.paths.video_dir = dir.clone();
        }
        if let Some(dir) = &self.audio_dir {
            config.paths.audio_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.paths.output_dir = dir.clone();
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge every episode video with its matching audio tracks
    Merge {
        #[command(flatten)]
        dirs: DirArgs,

        /// Maximum number of merges running at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Merge tool binary
        #[arg(long)]
        tool: Option<String>,
    },

    /// Show what would be merged without running the merge tool
    Plan {
        #[command(flatten)]
        dirs: DirArgs,
    },

    /// Check whether the merge tool can be launched
    Check {
        /// Merge tool binary
        #[arg(long)]
        tool: Option<String>,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Destination file
        #[arg(short, long, default_value = "mkvbatch.toml")]
        output: PathBuf,
    },
}
