//! Development mode: file watching and the live reload server.

pub mod server;
pub mod watcher;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe_builders::{BuildContext, Broker, Builder};
use tokio::task::JoinHandle;

use crate::error::Result;

pub use server::LivereloadServer;
pub use watcher::{FileChange, FileWatcher};

/// Delay under which repeated events for the same file are dropped.
pub const DEBOUNCE_MS: u64 = 100;

/// Patterns never worth reacting to.
pub fn default_ignore() -> Vec<String> {
    ["node_modules", "__pycache__", "target", "*.pyc", "*.swp", "*~"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.trim_start_matches('.') == ext))
}

/// Ping `broker` whenever a file under `paths` is written.
///
/// With `extensions`, only files with one of them count.
pub fn spawn_reload_watcher(
    paths: Vec<PathBuf>,
    extensions: Option<Vec<String>>,
    broker: Arc<Broker>,
) -> Result<JoinHandle<()>> {
    let (watcher, mut rx) = FileWatcher::new(paths, default_ignore(), DEBOUNCE_MS)?;

    Ok(tokio::spawn(async move {
        let _watcher = watcher;
        while let Some(change) = rx.recv().await {
            if !change.is_write() {
                continue;
            }
            if let Some(extensions) = &extensions {
                if !has_extension(change.path(), extensions) {
                    continue;
                }
            }
            tracing::debug!("{} changed", change.path().display());
            broker.ping();
        }
    }))
}

/// Report changes under the builder's watch paths, pinging live reload when it asks.
///
/// Returns `None` for builders that watch nothing.
pub fn spawn_builder_watcher(
    builder: Arc<dyn Builder>,
    ctx: BuildContext,
) -> Result<Option<JoinHandle<()>>> {
    let paths = builder.watch_paths();
    if paths.is_empty() {
        return Ok(None);
    }
    let (watcher, mut rx) = FileWatcher::new(paths, default_ignore(), DEBOUNCE_MS)?;

    Ok(Some(tokio::spawn(async move {
        let _watcher = watcher;
        while let Some(change) = rx.recv().await {
            if !change.is_write() {
                continue;
            }
            match builder.on_file_changed(change.path()).await {
                Ok(true) => ctx.ping(),
                Ok(false) => {}
                Err(e) => tracing::warn!("{} {}", builder.prefix(), e),
            }
        }
    })))
}
