//! Inline asset extraction from templates.

use std::path::{Path, PathBuf};

use assetpipe_core::{Manifest, TemplateAssets};
use async_trait::async_trait;

use crate::builder::{BuildContext, Builder};
use crate::error::Result;

pub struct TemplatesBuilder {
    ctx: BuildContext,
    templates: TemplateAssets,
    reload: bool,
}

impl TemplatesBuilder {
    pub fn new(ctx: BuildContext, templates: TemplateAssets) -> Self {
        Self {
            ctx,
            templates,
            reload: false,
        }
    }

    /// Ping live reload whenever a template changes.
    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = reload;
        self
    }

    fn inline(&self) -> bool {
        self.ctx.pipeline.config().inline
    }

    /// Extract inline assets of every template into the assets folder.
    pub fn extract(&self) -> Result<usize> {
        if !self.inline() {
            return Ok(0);
        }
        let assets = self.templates.extract_all(true)?;
        if !assets.is_empty() {
            tracing::info!("extracted {} inline assets from templates", assets.len());
        }
        Ok(assets.len())
    }
}

#[async_trait]
impl Builder for TemplatesBuilder {
    fn name(&self) -> &'static str {
        "templates"
    }

    fn prefix(&self) -> &str {
        "[templates]"
    }

    async fn prepare(&self) -> Result<()> {
        self.extract().map(|_| ())
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        if !self.inline() && !self.reload {
            return Vec::new();
        }
        self.templates
            .folders()
            .iter()
            .filter(|folder| folder.is_dir())
            .cloned()
            .collect()
    }

    async fn on_file_changed(&self, path: &Path) -> Result<bool> {
        let Some(template) = self.templates.template_for_path(path) else {
            return Ok(false);
        };
        if !template.path.is_file() {
            return Ok(self.reload);
        }

        if self.inline() {
            let assets = self.templates.extract_file(&template, true)?;
            tracing::debug!("{}: re-extracted {} inline assets", template.name, assets.len());
            return Ok(self.reload || !assets.is_empty());
        }
        Ok(self.reload)
    }

    async fn build(&self, _manifest: &mut Manifest, _ignore: &mut Vec<String>) -> Result<()> {
        self.extract().map(|_| ())
    }
}
