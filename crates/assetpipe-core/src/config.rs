//! Pipeline configuration with multi-source loading.
//!
//! Merges settings from defaults, a config file (`assets.toml` or
//! `assets.json`) and `ASSETS_*` environment variables. Callers (the CLI)
//! merge their own overrides on top of [`PipelineConfig::figment`].

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::directive::is_abs_url;
use crate::error::{Error, Result};

/// Config file names probed in the project root, in order.
pub const CONFIG_FILES: &[&str] = &["assets.toml", "assets.json"];

/// Prefix of environment variables overriding config keys.
pub const ENV_PREFIX: &str = "ASSETS_";

/// A command given either as a single program or as a full argv.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argv {
    One(String),
    Many(Vec<String>),
}

impl Argv {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Argv::One(program) => vec![program.clone()],
            Argv::Many(argv) => argv.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Argv::One(program) => program.is_empty(),
            Argv::Many(argv) => argv.is_empty(),
        }
    }
}

/// Declared bundles: a list of files (each its own bundle) or a name to files map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundleSpec {
    List(Vec<String>),
    Named(IndexMap<String, Vec<String>>),
}

/// Asset pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Bundles built by esbuild
    pub bundles: Option<BundleSpec>,

    /// References included on every page. When unset, declared bundles are included.
    pub include: Option<Vec<String>>,

    /// Extract `<script bundle>` / `<style bundle>` blocks from templates
    pub inline: bool,

    /// Only include inline bundles on pages rendering the template
    pub include_inline_on_demand: bool,

    /// Template extensions scanned for inline assets
    pub inline_template_exts: Vec<String>,

    pub import_map: IndexMap<String, String>,

    /// Node packages exposed through the import map (`name` or `name:input`)
    pub expose_node_packages: Vec<String>,

    /// Project root, other relative paths are resolved against it
    pub root_path: PathBuf,

    pub static_folder: PathBuf,
    pub static_url_path: String,
    pub template_folder: PathBuf,

    /// Source assets folder, defaults to the static folder
    pub assets_folder: Option<PathBuf>,
    pub assets_url_path: String,

    /// Stamp copied assets with a content hash
    pub stamp_assets: bool,

    pub output_folder: Option<PathBuf>,
    pub output_url: Option<String>,
    pub mapping_file: PathBuf,

    /// Base URL used for external URLs (e.g. `https://example.com`)
    pub base_url: Option<String>,

    pub esbuild_script: Option<Argv>,
    pub esbuild_args: Vec<String>,
    pub esbuild_bin: Argv,
    pub esbuild_splitting: bool,
    pub esbuild_target: Vec<String>,
    pub esbuild_aliases: IndexMap<String, String>,
    pub esbuild_external: Vec<String>,

    pub livereload_port: u16,

    /// Tailwind input stylesheet, relative to the assets folder
    pub tailwind: Option<String>,
    pub tailwind_args: Vec<String>,
    pub tailwind_bin: Argv,
    pub tailwind_suggested_content: Vec<String>,
    pub tailwind_expand_env_vars: bool,
    pub tailwind_sources: Vec<String>,

    /// Defaults to `$NODE_PATH`, then `node_modules`
    pub node_modules_path: Option<PathBuf>,
    pub copy_files_from_node_modules: IndexMap<String, String>,

    pub cdn_host: Option<String>,
    /// Defaults to `!debug`
    pub cdn_enabled: Option<bool>,

    pub watch_template_folders: Vec<PathBuf>,
    pub watch_app_extensions: Vec<String>,

    pub cache_worker: bool,
    pub cache_worker_filename: String,
    pub cache_worker_name: Option<String>,
    pub cache_worker_urls: Vec<String>,

    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bundles: None,
            include: None,
            inline: false,
            include_inline_on_demand: false,
            inline_template_exts: vec!["html".to_string()],
            import_map: IndexMap::new(),
            expose_node_packages: Vec::new(),
            root_path: PathBuf::from("."),
            static_folder: PathBuf::from("static"),
            static_url_path: "/static".to_string(),
            template_folder: PathBuf::from("templates"),
            assets_folder: None,
            assets_url_path: "/static/assets".to_string(),
            stamp_assets: true,
            output_folder: None,
            output_url: None,
            mapping_file: PathBuf::from("assets.json"),
            base_url: None,
            esbuild_script: None,
            esbuild_args: Vec::new(),
            esbuild_bin: Argv::Many(vec!["npx".to_string(), "esbuild".to_string()]),
            esbuild_splitting: true,
            esbuild_target: Vec::new(),
            esbuild_aliases: IndexMap::new(),
            esbuild_external: Vec::new(),
            livereload_port: 7878,
            tailwind: None,
            tailwind_args: Vec::new(),
            tailwind_bin: Argv::Many(vec!["npx".to_string(), "tailwindcss".to_string()]),
            tailwind_suggested_content: Vec::new(),
            tailwind_expand_env_vars: false,
            tailwind_sources: Vec::new(),
            node_modules_path: None,
            copy_files_from_node_modules: IndexMap::new(),
            cdn_host: None,
            cdn_enabled: None,
            watch_template_folders: Vec::new(),
            watch_app_extensions: vec!["py".to_string()],
            cache_worker: false,
            cache_worker_filename: "cache-worker.js".to_string(),
            cache_worker_name: None,
            cache_worker_urls: Vec::new(),
            debug: false,
        }
    }
}

impl PipelineConfig {
    /// Build the figment for a project root.
    ///
    /// Priority: environment variables > config file > defaults. The explicit
    /// `config_path` wins over the probed [`CONFIG_FILES`].
    pub fn figment(root: &Path, config_path: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        let config_file = config_path.map(Path::to_path_buf).or_else(|| {
            CONFIG_FILES
                .iter()
                .map(|name| root.join(name))
                .find(|path| path.exists())
        });

        if let Some(path) = config_file {
            tracing::debug!("loading config from {}", path.display());
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract a configuration from a figment and anchor it to `root`.
    pub fn from_figment(figment: Figment, root: &Path) -> Result<Self> {
        let mut config: Self = figment.extract()?;
        if config.root_path.is_relative() {
            config.root_path = path_clean::clean(root.join(&config.root_path));
        }
        Ok(config)
    }

    /// Load configuration for a project root.
    pub fn load(root: &Path, config_path: Option<&Path>) -> Result<Self> {
        Self::from_figment(Self::figment(root, config_path), root)
    }

    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.esbuild_bin.is_empty() {
            return Err(Error::invalid_config(
                "esbuild_bin",
                "the esbuild command cannot be empty",
            ));
        }

        if self.tailwind_bin.is_empty() {
            return Err(Error::invalid_config(
                "tailwind_bin",
                "the tailwind command cannot be empty",
            ));
        }

        if self.livereload_port == 0 {
            return Err(Error::invalid_config(
                "livereload_port",
                "use a fixed port so pages know where to connect",
            ));
        }

        if let Some(host) = &self.cdn_host {
            if !is_abs_url(host) {
                return Err(Error::invalid_config(
                    "cdn_host",
                    format!("'{}' must be an absolute URL like https://cdn.example.com", host),
                ));
            }
        }

        if !self.static_url_path.starts_with('/') {
            return Err(Error::invalid_config(
                "static_url_path",
                "URL paths must start with '/'",
            ));
        }

        Ok(())
    }

    /// Resolve derived paths and URLs.
    pub fn layout(&self) -> Layout {
        Layout::new(self)
    }
}

/// Where relative asset names are served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetsEndpoint {
    Static,
    /// Separate assets folder served directly in debug mode
    Assets,
}

/// Resolved folders and URL prefixes.
#[derive(Debug, Clone)]
pub struct Layout {
    pub root: PathBuf,
    pub static_folder: PathBuf,
    pub static_url_path: String,
    pub template_folder: PathBuf,
    pub assets_folder: PathBuf,
    pub assets_url_path: String,
    pub assets_endpoint: AssetsEndpoint,
    pub output_folder: PathBuf,
    pub output_url: String,
    pub mapping_file: PathBuf,
    pub node_modules_path: PathBuf,
    /// CDN host, present only when the CDN is enabled
    pub cdn_host: Option<String>,
    pub base_url: Option<String>,
}

impl Layout {
    fn new(config: &PipelineConfig) -> Self {
        let root = config.root_path.clone();
        let static_folder = root.join(&config.static_folder);

        let assets_folder = config
            .assets_folder
            .as_ref()
            .map(|folder| root.join(folder))
            .unwrap_or_else(|| static_folder.clone());

        let output_folder = config
            .output_folder
            .as_ref()
            .map(|folder| root.join(folder))
            .unwrap_or_else(|| static_folder.join("dist"));

        let output_url = config
            .output_url
            .clone()
            .unwrap_or_else(|| format!("{}/dist", config.static_url_path.trim_end_matches('/')));

        let assets_endpoint = if assets_folder != static_folder && config.debug {
            AssetsEndpoint::Assets
        } else {
            AssetsEndpoint::Static
        };

        let node_modules_path = config
            .node_modules_path
            .clone()
            .or_else(|| std::env::var_os("NODE_PATH").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("node_modules"));

        let cdn_host = if config.cdn_enabled.unwrap_or(!config.debug) {
            config
                .cdn_host
                .as_ref()
                .map(|host| host.trim_end_matches('/').to_string())
        } else {
            None
        };

        Self {
            template_folder: root.join(&config.template_folder),
            mapping_file: root.join(&config.mapping_file),
            static_url_path: config.static_url_path.trim_end_matches('/').to_string(),
            assets_url_path: config.assets_url_path.trim_end_matches('/').to_string(),
            base_url: config
                .base_url
                .as_ref()
                .map(|url| url.trim_end_matches('/').to_string()),
            root,
            static_folder,
            assets_folder,
            assets_endpoint,
            output_folder,
            output_url,
            node_modules_path,
            cdn_host,
        }
    }

    /// Whether sources live outside the static folder.
    pub fn has_separate_assets_folder(&self) -> bool {
        self.assets_folder != self.static_folder
    }
}
