//! Error types for configuration loading, manifest handling and rendering.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    // Configuration errors
    #[error("invalid config value for '{field}': {hint}")]
    InvalidConfig { field: String, hint: String },

    #[error("failed to load configuration: {0}")]
    ConfigLoad(#[from] Box<figment::Error>),

    // Bundle and include errors
    #[error("unknown bundle: {0}")]
    UnknownBundle(String),

    // Template errors
    #[error("unclosed <{tag}> tag in template {template}")]
    UnclosedInlineTag { tag: String, template: String },

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    // Manifest / metafile errors
    #[error("invalid esbuild metafile: {0}")]
    InvalidMetafile(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // I/O errors
    #[error("I/O error on {}: {source}", .path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    pub fn invalid_config(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            hint: hint.into(),
        }
    }

    pub fn path_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::PathIo {
            path: path.into(),
            source,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}
