//! Project configuration for CLI commands.
//!
//! Priority: CLI flags > `ASSETS_*` environment variables > config file >
//! defaults.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use assetpipe_core::{AssetsPipeline, PipelineConfig};
use figment::providers::Serialized;

use crate::cli::ProjectArgs;
use crate::error::{CliError, Result};

impl ProjectArgs {
    /// Project root: `--root`, else the current directory.
    pub fn root_dir(&self) -> Result<PathBuf> {
        match &self.root {
            Some(root) if root.is_absolute() => Ok(root.clone()),
            Some(root) => Ok(std::env::current_dir()?.join(root)),
            None => Ok(std::env::current_dir()?),
        }
    }

    fn config_file(&self, root: &Path) -> Result<Option<PathBuf>> {
        let Some(path) = &self.config else {
            return Ok(None);
        };
        let path = if path.is_absolute() {
            path.clone()
        } else {
            std::env::current_dir()?.join(path)
        };
        if !path.exists() {
            return Err(CliError::FileNotFound(path));
        }
        tracing::debug!("using config {} for {}", path.display(), root.display());
        Ok(Some(path))
    }

    /// Load and validate the pipeline configuration.
    pub fn load_config(&self) -> Result<PipelineConfig> {
        let root = self.root_dir()?;
        let mut figment = PipelineConfig::figment(&root, self.config_file(&root)?.as_deref());
        if self.debug {
            figment = figment.merge(Serialized::default("debug", true));
        }

        let config = PipelineConfig::from_figment(figment, &root)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the configuration and set up the pipeline.
    pub fn pipeline(&self) -> Result<Arc<AssetsPipeline>> {
        Ok(Arc::new(AssetsPipeline::new(self.load_config()?)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn project(temp: &TempDir) -> ProjectArgs {
        ProjectArgs {
            root: Some(temp.path().to_path_buf()),
            ..ProjectArgs::default()
        }
    }

    #[test]
    #[serial]
    fn test_loads_config_file_from_root() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("assets.toml"),
            "tailwind = \"main.css\"\nlivereload_port = 9999\n",
        )
        .unwrap();

        let config = project(&temp).load_config().unwrap();
        assert_eq!(config.tailwind.as_deref(), Some("main.css"));
        assert_eq!(config.livereload_port, 9999);
        assert_eq!(config.root_path, temp.path());
        assert!(!config.debug);
    }

    #[test]
    #[serial]
    fn test_debug_flag_overrides_file() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("assets.json"), r#"{"debug": false}"#).unwrap();

        let args = ProjectArgs {
            debug: true,
            ..project(&temp)
        };
        assert!(args.load_config().unwrap().debug);
    }

    #[test]
    #[serial]
    fn test_explicit_config_must_exist() {
        let temp = TempDir::new().unwrap();
        let args = ProjectArgs {
            config: Some(temp.path().join("missing.toml")),
            ..project(&temp)
        };
        assert!(matches!(args.load_config(), Err(CliError::FileNotFound(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_config_is_rejected() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("assets.toml"), "static_url_path = \"static\"\n").unwrap();
        assert!(matches!(
            project(&temp).load_config(),
            Err(CliError::Core(assetpipe_core::Error::InvalidConfig { .. }))
        ));
    }
}
