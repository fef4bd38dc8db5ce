//! Command-line interface definition.
//!
//! # Command Structure
//!
//! - `assetpipe build` - Build assets for production and write the mapping file
//! - `assetpipe dev` - Run builders in watch mode with live reload
//! - `assetpipe extract` - Extract inline assets from templates
//! - `assetpipe init-tailwind` - Create the tailwind input stylesheet
//! - `assetpipe livereload` - Standalone live reload server
//! - `assetpipe convert-esbuild-metafile` - Metafile to mapping file
//! - `assetpipe generate-esbuild-script` / `esbuild-script` - Custom esbuild scripts
//! - `assetpipe tags` / `render` - Inspect rendered tags and pages

mod commands;

use std::path::PathBuf;

use clap::{Args, Parser};

pub use commands::{
    Command, ConvertMetafileArgs, DevArgs, EsbuildScriptArgs, GenerateScriptArgs, LivereloadArgs,
    RenderArgs, TagsArgs,
};

/// assetpipe - front-end asset pipeline for server-rendered apps
#[derive(Parser, Debug)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch and live reload front-end assets",
    long_about = "assetpipe drives esbuild and tailwind, extracts inline assets from templates\n\
                  and writes the mapping file used to render script, link and import map tags."
)]
pub struct Cli {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Where the project lives and how it is configured.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Config file (default: assets.toml or assets.json in the root)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project root
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Run in debug mode (unbuilt assets, live reload script)
    #[arg(long, global = true)]
    pub debug: bool,
}
