//! Error handling for the assetpipe CLI.
//!
//! Library errors (`assetpipe_core::Error`, `BuilderError`) convert into
//! [`CliError`] through `#[from]`, and `main` turns the final error into a
//! miette report with [`cli_error_to_miette`].
//!
//! ```rust,no_run
//! use assetpipe_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_input(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Run 'assetpipe init-tailwind' first")
//! }
//! ```

use std::path::PathBuf;

use assetpipe_builders::BuilderError;
use miette::Report;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration loading or validation failed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from the core pipeline
    #[error(transparent)]
    Core(#[from] assetpipe_core::Error),

    /// Errors from a builder or its subprocess
    #[error(transparent)]
    Builder(#[from] BuilderError),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Live reload server errors
    #[error("Server error: {0}")]
    Server(String),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn a `NotFound` I/O error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}\n\nHint: {}", err, hint))
        })
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| {
            let err: CliError = e.into();
            CliError::Custom(format!("{}: {}", msg, err))
        })
    }
}

/// Convert a CLI error to a miette report.
///
/// Builder errors already carry diagnostic codes and help, so they are
/// reported as-is.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Builder(e) => Report::new(e),
        CliError::Config(msg) => miette::miette!(
            code = "assetpipe::config",
            help = "Check assets.toml / assets.json and ASSETS_* variables",
            "{}",
            msg
        ),
        CliError::Core(assetpipe_core::Error::InvalidConfig { field, hint }) => miette::miette!(
            code = "assetpipe::config",
            help = hint,
            "Invalid value for '{}'",
            field
        ),
        _ => miette::miette!("{}", err),
    }
}
