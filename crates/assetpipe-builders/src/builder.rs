//! The builder abstraction shared by `build` and `dev`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe_core::{AssetsPipeline, Manifest};
use async_trait::async_trait;
use regex::Regex;

use crate::error::Result;
use crate::reload::Broker;
use crate::worker::BuildCommand;

/// What every builder gets to work with.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub pipeline: Arc<AssetsPipeline>,
    /// Live-reload broker, present when the dev loop serves live reload
    pub broker: Option<Arc<Broker>>,
}

impl BuildContext {
    pub fn new(pipeline: Arc<AssetsPipeline>) -> Self {
        Self {
            pipeline,
            broker: None,
        }
    }

    pub fn with_broker(mut self, broker: Arc<Broker>) -> Self {
        self.broker = Some(broker);
        self
    }

    /// Ping live reload, if enabled.
    pub fn ping(&self) {
        if let Some(broker) = &self.broker {
            broker.ping();
        }
    }
}

/// A step of the asset build.
///
/// `build` runs once for production and contributes to the mapping file.
/// In dev mode, builders with a [`Builder::dev_command`] get a long-running
/// worker; [`Builder::on_dev_output`] runs whenever the worker prints a line
/// matching [`Builder::matchline`]. Paths from [`Builder::watch_paths`] are
/// watched by the dev loop and reported through [`Builder::on_file_changed`].
#[async_trait]
pub trait Builder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Prefix echoed in front of the worker's output lines
    fn prefix(&self) -> &str;

    fn matchline(&self) -> Option<&Regex> {
        None
    }

    /// Runs before the dev worker starts.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// Command of the dev worker. `build_only` runs it once without watching.
    fn dev_command(&self, _build_only: bool) -> Result<Option<BuildCommand>> {
        Ok(None)
    }

    async fn on_dev_output(&self) -> Result<()> {
        Ok(())
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// A watched path changed. Returns whether live reload should be pinged.
    async fn on_file_changed(&self, _path: &Path) -> Result<bool> {
        Ok(false)
    }

    /// Runs after the dev worker terminated.
    async fn cleanup(&self) -> Result<()> {
        Ok(())
    }

    /// Production build. Adds mapping entries and the asset filenames that
    /// must not be copied to the static folder.
    async fn build(&self, manifest: &mut Manifest, ignore: &mut Vec<String>) -> Result<()>;
}
