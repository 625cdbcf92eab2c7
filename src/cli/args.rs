//! CLI argument definitions.

use crate::constants::simulate;
use crate::frame::Scenario;
use crate::output::EventFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Hornet detection and deterrent control for hive entrances.
#[derive(Debug, Parser)]
#[command(name = "vespa-guard")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (default: platform config directory).
    #[arg(short, long, global = true, env = "VESPA_GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a synthetic scene through the full control loop.
    Simulate(SimulateArgs),
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
    /// Validate the configuration file.
    Check,
}

/// Arguments for the simulate command.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct SimulateArgs {
    /// Scene to replay (hover, transit, static, noise).
    #[arg(short, long, default_value = "hover")]
    pub scenario: Scenario,

    /// Number of frames to replay.
    #[arg(short = 'n', long, default_value_t = simulate::DEFAULT_FRAMES)]
    pub frames: u32,

    /// Frame rate of the synthetic feed.
    #[arg(long, default_value_t = simulate::DEFAULT_FPS,
          value_parser = clap::value_parser!(u32).range(1..=120))]
    pub fps: u32,

    /// Arm the safety gate before the first frame.
    #[arg(long)]
    pub arm: bool,

    /// Report this supply voltage (mV) to the gate.
    #[arg(long)]
    pub voltage_mv: Option<u32>,

    /// Pace frames in real time against the system clock.
    #[arg(long)]
    pub realtime: bool,

    /// Write per-frame events to this file.
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Event file format (csv, json).
    #[arg(short, long, default_value = "csv")]
    pub format: EventFormat,

    /// Suppress the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
