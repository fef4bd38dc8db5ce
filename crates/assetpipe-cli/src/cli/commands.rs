use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available assetpipe subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build assets for production
    ///
    /// Vendors node packages, extracts inline assets, runs esbuild and
    /// tailwind, copies the assets folder and writes the mapping file.
    Build,

    /// Watch and build assets in development mode with live reload
    Dev(DevArgs),

    /// Extract inline assets from templates
    Extract,

    /// Create the tailwind input stylesheet if it is missing
    InitTailwind,

    /// Start a live reload server for the given paths
    Livereload(LivereloadArgs),

    /// Convert an esbuild metafile into the mapping file
    #[command(name = "convert-esbuild-metafile")]
    ConvertMetafile(ConvertMetafileArgs),

    /// Generate a node script building assets with esbuild
    ///
    /// The script reads its settings from ESBUILD_* environment variables
    /// and can be customized with esbuild plugins.
    GenerateEsbuildScript(GenerateScriptArgs),

    /// Run the configured esbuild script
    EsbuildScript(EsbuildScriptArgs),

    /// Print the tags for the given references (default: global includes)
    Tags(TagsArgs),

    /// Render a template with its asset tags
    Render(RenderArgs),
}

/// Arguments for the dev command
#[derive(Args, Debug, Clone, Default)]
pub struct DevArgs {
    /// Additional template folders to watch
    #[arg(long = "watch-template-folder", value_name = "DIR")]
    pub watch_template_folders: Vec<PathBuf>,

    /// Additional paths triggering a reload when modified
    #[arg(long = "watch-path", value_name = "PATH")]
    pub watch_paths: Vec<PathBuf>,

    /// Reload when application sources in the root change
    #[arg(long)]
    pub watch_app: bool,

    /// Start the live reload server (default)
    #[arg(long, overrides_with = "no_livereload")]
    pub livereload: bool,

    /// Do not start the live reload server
    #[arg(long, overrides_with = "livereload")]
    pub no_livereload: bool,

    /// Reload when templates change (default)
    #[arg(long, overrides_with = "no_livereload_templates")]
    pub livereload_templates: bool,

    /// Do not reload when templates change
    #[arg(long, overrides_with = "livereload_templates")]
    pub no_livereload_templates: bool,

    /// Build once in development mode and exit
    #[arg(long)]
    pub build_only: bool,
}

impl DevArgs {
    /// Whether the live reload server runs. `--build-only` never serves.
    pub fn livereload_enabled(&self) -> bool {
        !self.no_livereload && !self.build_only
    }

    /// Whether template changes trigger a reload.
    pub fn reload_templates(&self) -> bool {
        self.livereload_enabled() && !self.no_livereload_templates
    }
}

/// Arguments for the livereload command
#[derive(Args, Debug, Clone)]
pub struct LivereloadArgs {
    /// Paths to watch
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Port (default: livereload_port from the config)
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// Arguments for convert-esbuild-metafile
#[derive(Args, Debug, Clone)]
pub struct ConvertMetafileArgs {
    /// esbuild metafile
    #[arg(value_name = "FILE")]
    pub filename: PathBuf,

    /// Output file (default: the configured mapping file)
    #[arg(short, long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Merge with the existing mapping file
    #[arg(long)]
    pub merge: bool,
}

/// Arguments for generate-esbuild-script
#[derive(Args, Debug, Clone)]
pub struct GenerateScriptArgs {
    /// Output filename, relative to the project root
    #[arg(long, default_value = "esbuild.mjs")]
    pub filename: PathBuf,

    /// Overwrite an existing script
    #[arg(long)]
    pub force: bool,
}

/// Arguments for esbuild-script
#[derive(Args, Debug, Clone)]
pub struct EsbuildScriptArgs {
    /// Arguments passed to the script
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Arguments for the tags command
#[derive(Args, Debug, Clone)]
pub struct TagsArgs {
    /// References to include (bundles, files, URLs, with optional directive)
    #[arg(value_name = "REF")]
    pub refs: Vec<String>,

    /// Nonce added to script tags
    #[arg(long)]
    pub nonce: Option<String>,
}

/// Arguments for the render command
#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Template name, relative to a template folder
    #[arg(value_name = "TEMPLATE")]
    pub template: String,

    /// JSON object used as the template context
    #[arg(long, value_name = "JSON")]
    pub context: Option<String>,
}
