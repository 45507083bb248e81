use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tk_core::UserId;
use tk_select::SelectionStrategy;

#[derive(Parser)]
#[command(name = "trackkeep")]
#[command(author, version, about = "Keep the tracks you want, drop the rest")]
pub struct Cli {
    /// Path to config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select tracks of a single file and remux it
    Run {
        /// Input file to process
        #[arg(required = true)]
        input: PathBuf,

        /// How tracks are selected
        #[arg(short, long, value_enum, default_value_t = Mode::Auto)]
        mode: Mode,
    },

    /// Probe a media file and display its streams
    Probe {
        /// File to probe, or an http(s) URL for a format-only summary
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Keep the first preferred audio language found
    Auto,
    /// Edit the automatic choice interactively on stdin
    Manual,
    /// Automatic choice without subtitles
    Extract,
}

impl Mode {
    /// The console is a single user.
    pub fn strategy(self) -> SelectionStrategy {
        match self {
            Mode::Auto => SelectionStrategy::Auto,
            Mode::Manual => SelectionStrategy::Manual { user: UserId(0) },
            Mode::Extract => SelectionStrategy::Extract,
        }
    }
}
