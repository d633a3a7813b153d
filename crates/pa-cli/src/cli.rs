//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pa_core::{Formula, GestureType, Measurement};

/// Practical Analytics client.
///
/// Records gaze, gesture, keyword and stat telemetry for interactive
/// applications and sends it to the analytics backend.
#[derive(Debug, Parser)]
#[command(name = "pa", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the status code catalog.
    Errors {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configure the selected transport and report the resulting status.
    Check,

    /// Send a single event.
    Record {
        #[command(subcommand)]
        event: RecordEvent,
    },

    /// Replay JSONL interaction signals from stdin.
    Replay {
        /// Record into memory and print emitted events as JSONL.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Events that can be sent from the command line.
#[derive(Debug, Subcommand)]
pub enum RecordEvent {
    /// A resource gain.
    Gain { identifier: String, value: f64 },

    /// A resource loss.
    Loss { identifier: String, value: f64 },

    /// A caller-defined stat.
    CustomStat {
        identifier: String,
        value: f64,

        #[arg(long, default_value_t = Measurement::Count)]
        measurement: Measurement,

        #[arg(long, default_value_t = Formula::Total)]
        formula: Formula,

        /// Subject to attribute the stat to.
        #[arg(long, default_value = "")]
        subject: String,
    },

    /// A spoken keyword.
    Keyword {
        keyword: String,

        /// Subject to attribute the keyword to.
        #[arg(long, default_value = "")]
        subject: String,
    },

    /// A gesture.
    Gesture {
        identifier: String,

        #[arg(long, default_value_t = GestureType::Tap)]
        gesture: GestureType,

        /// Hold duration in seconds.
        #[arg(long, default_value_t = 0.0)]
        hold_length: f64,

        /// Subject to attribute the gesture to.
        #[arg(long, default_value = "")]
        subject: String,
    },
}
