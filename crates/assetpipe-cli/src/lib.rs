//! assetpipe CLI - build, watch and live reload front-end assets.
//!
//! The binary wraps [`assetpipe_core`] (configuration, mapping file, tags)
//! and [`assetpipe_builders`] (esbuild, tailwind, inline extraction) behind
//! a set of commands.
//!
//! # Architecture
//!
//! - [`cli`] - Argument definitions
//! - [`commands`] - One module per command
//! - [`config`] - Configuration loading from flags, environment and files
//! - [`dev`] - File watching and the live reload server
//! - [`error`] - Error types and miette conversion
//! - [`logger`] - Structured logging with tracing
//! - [`ui`] - Terminal status messages

pub mod cli;
pub mod commands;
pub mod config;
pub mod dev;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result, ResultExt};
