//! CLI tool for generating testbed cluster requests.
//!
//! Provides commands for:
//! - Generating the request document from profile parameters
//! - Listing the parameters the profile accepts

pub mod commands;
pub mod config;
pub mod telemetry;

pub use commands::{Command, CommandResult};
pub use config::{CliConfig, FileConfig};
