//! Standalone live reload server.
//!
//! Useful when assets are built by other means: pages in debug mode
//! reload whenever one of the watched paths changes.

use std::sync::Arc;

use assetpipe_builders::Broker;
use tokio::signal;

use crate::cli::{LivereloadArgs, ProjectArgs};
use crate::dev::{spawn_reload_watcher, LivereloadServer};
use crate::error::Result;
use crate::ui;

pub async fn execute(project: &ProjectArgs, args: LivereloadArgs) -> Result<()> {
    let root = project.root_dir()?;
    let port = match args.port {
        Some(port) => port,
        None => project.load_config()?.livereload_port,
    };

    let broker = Arc::new(Broker::new());
    let paths: Vec<_> = args.paths.iter().map(|p| root.join(p)).collect();
    let watcher = if paths.is_empty() {
        None
    } else {
        for path in &paths {
            ui::info(&format!("Watching {}", path.display()));
        }
        Some(spawn_reload_watcher(paths, None, Arc::clone(&broker))?)
    };

    let server = LivereloadServer::new(port, broker);
    ui::info(&format!("Live reload on http://{}", server.addr()));

    let outcome = tokio::select! {
        result = server.start() => result,
        _ = signal::ctrl_c() => {
            ui::info("Shutting down...");
            Ok(())
        }
    };

    if let Some(watcher) = watcher {
        watcher.abort();
    }
    outcome
}
