//! Tailwind CSS CLI integration.
//!
//! The stylesheet named by the `tailwind` option is compiled from the assets
//! folder into the output folder. When environment expansion or extra
//! `@source` paths are configured, the CLI is pointed at a generated
//! `{input}.expanded.css` instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use assetpipe_core::Manifest;
use async_trait::async_trait;
use regex::{Captures, Regex};

use crate::builder::{BuildContext, Builder};
use crate::error::{BuilderError, Result};
use crate::worker::BuildCommand;

/// Content of a freshly created input stylesheet.
pub const DEFAULT_INPUT: &str = "@import \"tailwindcss\";\n";

const EXPANDED_SUFFIX: &str = ".expanded.css";

static DONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Done in").expect("tailwind matchline is valid"));

static TAILWIND_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^@import\s+"tailwindcss""#).expect("tailwind import regex is valid")
});

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("env var regex is valid")
});

/// Replace `$VAR` and `${VAR}` with environment values. Unset variables are left as is.
pub fn expand_env_vars(source: &str) -> String {
    ENV_VAR
        .replace_all(source, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Insert `@source` lines right after the tailwind import, or before the last line without one.
pub fn insert_sources(source: &str, sources: &[String]) -> String {
    let mut lines: Vec<String> = source.split('\n').map(str::to_string).collect();
    let mut insert_at = lines
        .iter()
        .position(|line| TAILWIND_IMPORT.is_match(line))
        .map(|i| i + 1)
        .unwrap_or_else(|| lines.len().saturating_sub(1));

    for src in sources {
        lines.insert(insert_at, format!("@source \"{}\";", src));
        insert_at += 1;
    }
    lines.join("\n")
}

pub struct TailwindBuilder {
    ctx: BuildContext,
    stylesheet: String,
    input: PathBuf,
    output: PathBuf,
}

impl TailwindBuilder {
    /// `None` unless a tailwind stylesheet is configured.
    pub fn new(ctx: BuildContext) -> Option<Self> {
        let stylesheet = ctx.pipeline.config().tailwind.clone()?;
        let layout = ctx.pipeline.layout();
        let input = layout.assets_folder.join(&stylesheet);
        let output = layout.output_folder.join(&stylesheet);

        Some(Self {
            ctx,
            stylesheet,
            input,
            output,
        })
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    fn needs_expansion(&self) -> bool {
        let config = self.ctx.pipeline.config();
        config.tailwind_expand_env_vars || !config.tailwind_sources.is_empty()
    }

    pub fn expanded_path(&self) -> PathBuf {
        let mut name = self.input.clone().into_os_string();
        name.push(EXPANDED_SUFFIX);
        PathBuf::from(name)
    }

    /// Create the input stylesheet when missing.
    pub fn ensure_input(&self) -> Result<()> {
        if self.input.exists() {
            return Ok(());
        }
        if let Some(parent) = self.input.parent() {
            fs::create_dir_all(parent).map_err(|e| BuilderError::io(parent, e))?;
        }
        fs::write(&self.input, DEFAULT_INPUT).map_err(|e| BuilderError::io(&self.input, e))?;
        tracing::info!("created {}", self.input.display());
        Ok(())
    }

    /// Path handed to the CLI, writing the expanded stylesheet first when needed.
    pub fn expand(&self) -> Result<PathBuf> {
        if !self.needs_expansion() {
            return Ok(self.input.clone());
        }

        let config = self.ctx.pipeline.config();
        let mut source =
            fs::read_to_string(&self.input).map_err(|e| BuilderError::io(&self.input, e))?;
        if config.tailwind_expand_env_vars {
            source = expand_env_vars(&source);
        }
        if !config.tailwind_sources.is_empty() {
            source = insert_sources(&source, &config.tailwind_sources);
        }

        let expanded = self.expanded_path();
        fs::write(&expanded, source).map_err(|e| BuilderError::io(&expanded, e))?;
        tracing::debug!("expanded {} to {}", self.input.display(), expanded.display());
        Ok(expanded)
    }

    fn content_globs(&self) -> String {
        let layout = self.ctx.pipeline.layout();
        let mut globs = vec![
            format!("{}/**/*.html", layout.template_folder.display()),
            format!("{}/**/*.js", layout.assets_folder.display()),
        ];
        globs.extend(self.ctx.pipeline.config().tailwind_suggested_content.iter().cloned());
        globs.join(";")
    }

    /// Command line compiling `input`.
    pub fn command(&self, input: &Path, dev: bool, watch: bool) -> Result<BuildCommand> {
        let config = self.ctx.pipeline.config();
        let mut cmd = BuildCommand::from_argv(&config.tailwind_bin.to_vec(), &self.ctx.pipeline.layout().root)
            .ok_or_else(|| BuilderError::EmptyCommand {
                builder: "tailwind".to_string(),
            })?
            .arg("-i")
            .arg(input.display().to_string())
            .arg("-o")
            .arg(self.output.display().to_string());
        if !dev {
            cmd = cmd.arg("--minify");
        }
        if watch {
            cmd = cmd.arg("--watch");
        }

        Ok(cmd
            .args(config.tailwind_args.iter().cloned())
            .env("TAILWIND_CONTENT", self.content_globs())
            .env("TAILWIND_INPUT", input.display().to_string())
            .env("TAILWIND_OUTPUT", self.output.display().to_string()))
    }

    fn remove_expanded(&self) -> Result<()> {
        let expanded = self.expanded_path();
        if expanded.exists() {
            fs::remove_file(&expanded).map_err(|e| BuilderError::io(&expanded, e))?;
        }
        Ok(())
    }
}

#[async_trait]
impl Builder for TailwindBuilder {
    fn name(&self) -> &'static str {
        "tailwind"
    }

    fn prefix(&self) -> &str {
        "[tailwind]"
    }

    fn matchline(&self) -> Option<&Regex> {
        Some(&*DONE)
    }

    async fn prepare(&self) -> Result<()> {
        self.ensure_input()
    }

    fn dev_command(&self, build_only: bool) -> Result<Option<BuildCommand>> {
        let input = self.expand()?;
        self.command(&input, true, !build_only).map(Some)
    }

    async fn on_dev_output(&self) -> Result<()> {
        self.ctx.ping();
        Ok(())
    }

    fn watch_paths(&self) -> Vec<PathBuf> {
        if self.needs_expansion() {
            vec![self.input.clone()]
        } else {
            Vec::new()
        }
    }

    /// Re-expand the input; the CLI picks the new file up and reports `Done in`.
    async fn on_file_changed(&self, path: &Path) -> Result<bool> {
        if path == self.input {
            self.expand()?;
        }
        Ok(false)
    }

    async fn cleanup(&self) -> Result<()> {
        self.remove_expanded()
    }

    async fn build(&self, _manifest: &mut Manifest, ignore: &mut Vec<String>) -> Result<()> {
        self.ensure_input()?;
        let input = self.expand()?;
        let result = self.command(&input, false, false)?.run(self.prefix()).await;
        self.remove_expanded()?;
        result?;

        ignore.push(self.stylesheet.clone());
        Ok(())
    }
}
