//! Command-line front-end for the fallwatch core.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

pub mod commands;

#[derive(Parser, Debug)]
#[command(name = "fallwatch", version, about = "IMU fall detection tools")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay recorded sample batches (JSON lines) through the fall detector
    Replay(ReplayArgs),
    /// Print the feature row of one window of samples
    Features(FeaturesArgs),
    /// Load and validate a fall model artifact
    CheckModel(CheckModelArgs),
    /// Print the default configuration as TOML
    DefaultConfig,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Batches file; one `{"samples": [[ax, ay, az, gx, gy, gz], ...]}` per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Model artifact, overrides `model_path` from the configuration
    #[arg(short, long)]
    pub model: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(short, long, default_value = "default")]
    pub subject: String,

    /// Simulated seconds between consecutive batches
    #[arg(long, default_value_t = 1.0)]
    pub batch_interval: f64,

    /// Timestamp of the first batch, in seconds
    #[arg(long, default_value_t = 0.0)]
    pub start: f64,
}

#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// JSON array of 6-value rows
    #[arg(short, long)]
    pub input: PathBuf,

    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Emit a JSON object instead of `name value` lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CheckModelArgs {
    #[arg(short, long)]
    pub model: PathBuf,
}
