//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Overlay Sync - time-locked heatmap overlays over a master video
#[derive(Parser, Debug)]
#[command(
    name = "overlay-sync",
    author,
    version,
    about = "Multi-stream overlay video synchronization",
    long_about = "Keeps any number of silent overlay streams time-locked to a master video.\n\n\
                  Loads a media manifest, preloads every stream, and drives a playback \n\
                  session with scrubbing, frame stepping and non-1x rates against a \n\
                  simulated media backend."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OVERLAY_SYNC_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OVERLAY_SYNC_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated playback session and report sync statistics
    Run(RunArgs),

    /// Validate a manifest without running
    Validate(ValidateArgs),

    /// Display manifest information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to the media manifest (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "videos.toml",
        env = "OVERLAY_SYNC_MANIFEST"
    )]
    pub config: PathBuf,

    /// Video to play (defaults to the first video in the manifest)
    #[arg(long, env = "OVERLAY_SYNC_VIDEO")]
    pub video: Option<String>,

    /// Overlay to attach (repeatable; defaults to every overlay shown for the age group)
    #[arg(long = "overlay")]
    pub overlays: Vec<String>,

    /// Only attach overlays of this age group
    #[arg(long)]
    pub age_group: Option<String>,

    /// Playback rate applied after selection
    #[arg(long, default_value = "1.0", env = "OVERLAY_SYNC_RATE")]
    pub rate: f64,

    /// Media seconds to simulate
    #[arg(long, default_value = "10", env = "OVERLAY_SYNC_DURATION")]
    pub duration: f64,

    /// Seek targets in seconds, issued at evenly spaced points of the run
    #[arg(long = "seek", value_delimiter = ',')]
    pub seeks: Vec<f64>,

    /// Frames to step after the run (pauses playback)
    #[arg(long, allow_hyphen_values = true)]
    pub step: Option<i64>,

    /// Simulation speed (media seconds per wall-clock second)
    #[arg(long, default_value = "1.0", env = "OVERLAY_SYNC_SPEED")]
    pub speed: f64,

    /// Length of every simulated recording in seconds
    #[arg(long, default_value = "60")]
    pub media_duration: f64,

    /// Clock skew applied to overlay decoders (1.0 = perfectly matched)
    #[arg(long, default_value = "1.0")]
    pub overlay_skew: f64,

    /// Simulated load latency in seconds for every stream
    #[arg(long, default_value = "0.0")]
    pub load_delay: f64,

    /// Loop every stream at its end
    #[arg(long = "loop")]
    pub looping: bool,

    /// Stream ids whose load always fails (repeatable)
    #[arg(long = "fail-load")]
    pub fail_load: Vec<String>,

    /// Stream ids whose play() is refused (repeatable)
    #[arg(long = "reject-play")]
    pub reject_play: Vec<String>,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "OVERLAY_SYNC_TIMEOUT")]
    pub timeout: u64,

    /// Validate the manifest and selection, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Display tick rate in Hz (defaults to the manifest's playback.display_hz)
    #[arg(long)]
    pub display_hz: Option<u32>,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OVERLAY_SYNC_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the manifest to validate
    #[arg(short, long, default_value = "videos.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to the manifest
    #[arg(short, long, default_value = "videos.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every overlay of every video
    #[arg(long)]
    pub overlays: bool,

    /// Only list overlays of this age group
    #[arg(long)]
    pub age_group: Option<String>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => observability::LogFormat::Json,
            LogFormat::Pretty => observability::LogFormat::Pretty,
            LogFormat::Compact => observability::LogFormat::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parse() {
        let cli = Cli::try_parse_from([
            "overlay-sync",
            "run",
            "--config",
            "m.toml",
            "--overlay",
            "heat_a",
            "--overlay",
            "heat_b",
            "--seek",
            "2.5,7",
            "--rate",
            "0.25",
            "--step",
            "-3",
        ])
        .unwrap();

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.overlays, vec!["heat_a", "heat_b"]);
        assert_eq!(args.seeks, vec![2.5, 7.0]);
        assert_eq!(args.rate, 0.25);
        assert_eq!(args.step, Some(-3));
        assert_eq!(args.metrics_port, 0);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["overlay-sync", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
