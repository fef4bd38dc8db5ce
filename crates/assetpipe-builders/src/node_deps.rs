//! Vendoring of node packages.
//!
//! Exposed packages are bundled once into `{output}/vendor/{name}.js` so the
//! import map can point at them. Files listed in
//! `copy_files_from_node_modules` are copied into the static folder.

use std::path::PathBuf;

use assetpipe_core::copy::copy_files;
use assetpipe_core::Manifest;
use async_trait::async_trait;

use crate::builder::{BuildContext, Builder};
use crate::error::{BuilderError, Result};
use crate::worker::BuildCommand;

const BUNDLE_TIMEOUT_SECS: u64 = 120;

/// A package to vendor: `name` or `name:entry source`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePackage {
    pub name: String,
    /// Module source fed to esbuild on stdin
    pub source: String,
}

impl NodePackage {
    pub fn parse(spec: &str) -> Self {
        match spec.split_once(':') {
            Some((name, source)) => Self {
                name: name.to_string(),
                source: source.to_string(),
            },
            None => Self {
                name: spec.to_string(),
                source: format!("export * from '{}'", spec),
            },
        }
    }
}

pub struct NodeDepsBuilder {
    ctx: BuildContext,
}

impl NodeDepsBuilder {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx }
    }

    pub fn vendor_path(&self, package: &NodePackage) -> PathBuf {
        self.ctx
            .pipeline
            .layout()
            .output_folder
            .join("vendor")
            .join(format!("{}.js", package.name))
    }

    pub fn command(&self, package: &NodePackage) -> Result<BuildCommand> {
        let pipeline = &self.ctx.pipeline;
        let layout = pipeline.layout();
        let cmd = BuildCommand::from_argv(&pipeline.config().esbuild_bin.to_vec(), &layout.root)
            .ok_or_else(|| BuilderError::EmptyCommand {
                builder: "node dependencies".to_string(),
            })?;

        Ok(cmd
            .arg("--bundle")
            .arg("--minify")
            .arg("--format=esm")
            .arg(format!("--sourcefile={}.js", package.name))
            .arg(format!("--outfile={}", self.vendor_path(package).display()))
            .env("NODE_PATH", layout.node_modules_path.display().to_string()))
    }

    /// Bundle missing vendor files and copy files out of `node_modules`.
    pub async fn install(&self) -> Result<()> {
        let config = self.ctx.pipeline.config();

        for spec in &config.expose_node_packages {
            let package = NodePackage::parse(spec);
            let outfile = self.vendor_path(&package);
            if outfile.exists() {
                tracing::debug!("{} already vendored", package.name);
                continue;
            }

            tracing::info!("bundling node package {}", package.name);
            self.command(&package)?
                .pipe(&package.source, BUNDLE_TIMEOUT_SECS)
                .await?;
        }

        if !config.copy_files_from_node_modules.is_empty() {
            let layout = self.ctx.pipeline.layout();
            copy_files(
                &config.copy_files_from_node_modules,
                &layout.root.join(&layout.node_modules_path),
                &layout.static_folder,
            )?;
        }

        Ok(())
    }
}

#[async_trait]
impl Builder for NodeDepsBuilder {
    fn name(&self) -> &'static str {
        "node"
    }

    fn prefix(&self) -> &str {
        "[node]"
    }

    async fn prepare(&self) -> Result<()> {
        self.install().await
    }

    async fn build(&self, _manifest: &mut Manifest, _ignore: &mut Vec<String>) -> Result<()> {
        self.install().await
    }
}
