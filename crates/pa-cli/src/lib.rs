//! Practical Analytics CLI library.
//!
//! Drives the recorder from the command line: inspect the status catalog,
//! check credentials, send single events, or replay recorded interaction
//! sessions.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, RecordEvent};
pub use config::Config;
