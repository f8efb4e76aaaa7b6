//! Command-line front end
//!
//! - [`args`] - clap argument definitions
//! - [`commands`] - subcommand runners, logging setup and progress display

pub mod args;
pub mod commands;
