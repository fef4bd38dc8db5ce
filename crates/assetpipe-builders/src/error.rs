//! Error types for builders and their subprocesses

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = BuilderError> = std::result::Result<T, E>;

/// Errors that can occur while building assets
#[derive(Error, Debug, Diagnostic)]
pub enum BuilderError {
    /// A builder binary could not be started
    #[error("Failed to spawn '{program}': {source}")]
    #[diagnostic(
        code(assetpipe::builders::spawn_failed),
        help("Check that '{program}' is installed (npm install) or set the *_bin option")
    )]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Subprocess exited with non-zero status
    #[error("'{program}' exited with code {exit_code}")]
    #[diagnostic(code(assetpipe::builders::exit_error))]
    ExitError {
        program: String,
        exit_code: i32,
        #[help]
        stderr: Option<String>,
    },

    /// Subprocess timed out
    #[error("'{program}' timed out after {timeout_secs} seconds")]
    #[diagnostic(code(assetpipe::builders::timeout))]
    Timeout { program: String, timeout_secs: u64 },

    /// Builder needs an empty command line
    #[error("No command configured for {builder}")]
    #[diagnostic(
        code(assetpipe::builders::empty_command),
        help("esbuild_bin and tailwind_bin must name at least one program")
    )]
    EmptyCommand { builder: String },

    #[error("No esbuild script configured")]
    #[diagnostic(
        code(assetpipe::builders::no_script),
        help("Run 'assetpipe generate-esbuild-script' and set esbuild_script = \"esbuild.mjs\"")
    )]
    NoScript,

    #[error("I/O error on {}: {source}", .path.display())]
    #[diagnostic(code(assetpipe::builders::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(assetpipe::core))]
    Core(#[from] assetpipe_core::Error),

    #[error("JSON error: {0}")]
    #[diagnostic(code(assetpipe::builders::json))]
    Json(#[from] serde_json::Error),
}

impl BuilderError {
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    pub fn exit_error(program: impl Into<String>, exit_code: i32, stderr: Option<String>) -> Self {
        Self::ExitError {
            program: program.into(),
            exit_code,
            stderr: stderr.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn timeout(program: impl Into<String>, timeout_secs: u64) -> Self {
        Self::Timeout {
            program: program.into(),
            timeout_secs,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
