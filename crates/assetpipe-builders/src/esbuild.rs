//! esbuild integration.
//!
//! esbuild is driven either directly through its CLI or through a node
//! script receiving the same settings as `ESBUILD_*` environment variables.
//! Both write a metafile that is converted into mapping entries.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use assetpipe_core::{Argv, ConvertedMetafile, Manifest};
use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use tempfile::TempPath;

use crate::builder::{BuildContext, Builder};
use crate::error::{BuilderError, Result};
use crate::worker::BuildCommand;

/// Output names, relative to the outbase, with a content hash.
const NAMES_TEMPLATE: &str = "[dir]/[name]-[hash]";

/// Starter build script reading its settings from the `ESBUILD_*` variables.
pub const SCRIPT_TEMPLATE: &str = r#"import * as esbuild from "esbuild";

const env = process.env;
const list = (value, sep = ";") => (value ? value.split(sep).filter(Boolean) : []);

const entryPoints = list(env.ESBUILD_ENTRYPOINTS).map((entry) => {
  const [out, path] = entry.includes("=") ? entry.split("=", 2) : [null, entry];
  return out ? { in: path, out } : path;
});

const alias = Object.fromEntries(list(env.ESBUILD_ALIASES).map((pair) => pair.split("=", 2)));
const dev = env.ESBUILD_DEV === "1";

const options = {
  entryPoints,
  bundle: true,
  format: "esm",
  assetNames: "[dir]/[name]-[hash]",
  chunkNames: "[dir]/[name]-[hash]",
  entryNames: "[dir]/[name]-[hash]",
  outbase: env.ESBUILD_OUTBASE,
  outdir: env.ESBUILD_OUTDIR,
  splitting: env.ESBUILD_SPLITTING === "1",
  target: list(env.ESBUILD_TARGET, ","),
  alias,
  external: list(env.ESBUILD_EXTERNAL),
  metafile: true,
  sourcemap: dev,
  minify: !dev,
  logLevel: "info",
  plugins: [],
};

const writeMetafile = {
  name: "write-metafile",
  setup(build) {
    build.onEnd(async (result) => {
      if (result.metafile && env.ESBUILD_METAFILE) {
        const fs = await import("node:fs/promises");
        await fs.writeFile(env.ESBUILD_METAFILE, JSON.stringify(result.metafile));
      }
    });
  },
};
options.plugins.push(writeMetafile);

if (env.ESBUILD_WATCH === "1") {
  const ctx = await esbuild.context(options);
  await ctx.watch();
} else {
  await esbuild.build(options);
}
"#;

static WATCH_FINISHED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[watch\] build finished").expect("esbuild matchline is valid"));

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

pub struct EsbuildBuilder {
    ctx: BuildContext,
    metafile: Mutex<Option<TempPath>>,
    metafile_path: PathBuf,
}

impl EsbuildBuilder {
    /// Create the builder and reserve a temporary metafile.
    pub fn new(ctx: BuildContext) -> Result<Self> {
        let metafile = tempfile::Builder::new()
            .prefix("assetpipe-metafile-")
            .suffix(".json")
            .tempfile()
            .map_err(|e| BuilderError::io(std::env::temp_dir(), e))?
            .into_temp_path();

        Ok(Self {
            ctx,
            metafile_path: metafile.to_path_buf(),
            metafile: Mutex::new(Some(metafile)),
        })
    }

    pub fn metafile_path(&self) -> &Path {
        &self.metafile_path
    }

    fn is_script(&self) -> bool {
        self.ctx.pipeline.config().esbuild_script.is_some()
    }

    /// Whether there is anything to run.
    pub fn is_enabled(&self) -> bool {
        self.is_script() || self.ctx.pipeline.has_bundles()
    }

    /// Command line for a build.
    pub fn command(&self, dev: bool, watch: bool) -> Result<BuildCommand> {
        let pipeline = &self.ctx.pipeline;
        let config = pipeline.config();
        let layout = pipeline.layout();
        let bundles = pipeline.bundles();
        let files: Vec<_> = bundles
            .files(None)?
            .into_iter()
            .filter(|file| !file.is_abs_url())
            .collect();

        let inputs: Vec<String> = files
            .iter()
            .map(|file| file.resolve_path(&layout.assets_folder).display().to_string())
            .collect();
        let entrypoints: Vec<String> = files
            .iter()
            .map(|file| file.entrypoint_arg(&layout.assets_folder))
            .collect();
        let aliases = pipeline.esbuild_aliases();

        let argv = match &config.esbuild_script {
            Some(Argv::One(script)) => vec!["node".to_string(), script.clone()],
            Some(Argv::Many(argv)) => argv.clone(),
            None => config.esbuild_bin.to_vec(),
        };
        let mut cmd = BuildCommand::from_argv(&argv, &layout.root).ok_or_else(|| {
            BuilderError::EmptyCommand {
                builder: "esbuild".to_string(),
            }
        })?;

        if !self.is_script() {
            cmd = cmd
                .args(entrypoints.iter().cloned())
                .arg("--bundle")
                .arg("--format=esm")
                .arg(format!("--asset-names={}", NAMES_TEMPLATE))
                .arg(format!("--chunk-names={}", NAMES_TEMPLATE))
                .arg(format!("--entry-names={}", NAMES_TEMPLATE))
                .arg(format!("--outbase={}", layout.assets_folder.display()))
                .arg(format!("--outdir={}", layout.output_folder.display()))
                .args(aliases.iter().map(|(k, v)| format!("--alias:{}={}", k, v)))
                .args(config.esbuild_external.iter().map(|e| format!("--external:{}", e)));
            if config.esbuild_splitting {
                cmd = cmd.arg("--splitting");
            }
            if !config.esbuild_target.is_empty() {
                cmd = cmd.arg(format!("--target={}", config.esbuild_target.join(",")));
            }
            cmd = cmd
                .arg(format!("--metafile={}", self.metafile_path.display()))
                .arg(if dev { "--sourcemap" } else { "--minify" });
            if watch {
                cmd = cmd.arg("--watch");
            }
        }

        Ok(cmd
            .args(config.esbuild_args.iter().cloned())
            .env("NODE_PATH", layout.node_modules_path.display().to_string())
            .env("ESBUILD_DEV", flag(dev))
            .env("ESBUILD_WATCH", flag(watch))
            .env("ESBUILD_INPUTS", inputs.join(";"))
            .env("ESBUILD_ENTRYPOINTS", entrypoints.join(";"))
            .env("ESBUILD_OUTBASE", layout.assets_folder.display().to_string())
            .env("ESBUILD_OUTDIR", layout.output_folder.display().to_string())
            .env("ESBUILD_METAFILE", self.metafile_path.display().to_string())
            .env("ESBUILD_SPLITTING", flag(config.esbuild_splitting))
            .env("ESBUILD_TARGET", config.esbuild_target.join(","))
            .env(
                "ESBUILD_ALIASES",
                aliases
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(";"),
            )
            .env("ESBUILD_EXTERNAL", config.esbuild_external.join(";")))
    }

    /// Command running the configured script directly, with `extra` arguments.
    pub fn script_command(&self, extra: &[String]) -> Result<BuildCommand> {
        if !self.is_script() {
            return Err(BuilderError::NoScript);
        }
        Ok(self.command(false, false)?.args(extra.iter().cloned()))
    }

    /// Convert the metafile of the last run.
    pub fn convert_metafile(&self) -> Result<ConvertedMetafile> {
        Ok(self.ctx.pipeline.convert_metafile(&self.metafile_path)?)
    }
}

#[async_trait]
impl Builder for EsbuildBuilder {
    fn name(&self) -> &'static str {
        "esbuild"
    }

    fn prefix(&self) -> &str {
        if self.is_script() {
            "[script]"
        } else {
            "[esbuild]"
        }
    }

    fn matchline(&self) -> Option<&Regex> {
        Some(&*WATCH_FINISHED)
    }

    fn dev_command(&self, build_only: bool) -> Result<Option<BuildCommand>> {
        if !self.is_enabled() {
            return Ok(None);
        }
        self.command(true, !build_only).map(Some)
    }

    /// Replace the mapping file with the fresh metafile's mapping.
    async fn on_dev_output(&self) -> Result<()> {
        let converted = self.convert_metafile()?;
        self.ctx
            .pipeline
            .write_mapping_file(&converted.manifest, None, false)?;
        self.ctx.ping();
        Ok(())
    }

    async fn cleanup(&self) -> Result<()> {
        let metafile = self.metafile.lock().take();
        if let Some(metafile) = metafile {
            metafile
                .close()
                .map_err(|e| BuilderError::io(&self.metafile_path, e))?;
        }
        Ok(())
    }

    async fn build(&self, manifest: &mut Manifest, ignore: &mut Vec<String>) -> Result<()> {
        if !self.is_enabled() {
            tracing::debug!("no bundles declared, skipping esbuild");
            return Ok(());
        }

        let cmd = self.command(false, false)?;
        cmd.run(self.prefix()).await?;

        let converted = self.convert_metafile()?;
        manifest.extend(converted.manifest);
        ignore.extend(converted.inputs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetpipe_core::{AssetsPipeline, BundleSpec, ManifestEntry, PipelineConfig};
    use indexmap::IndexMap;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn builder(temp: &TempDir, config: PipelineConfig) -> EsbuildBuilder {
        let pipeline = AssetsPipeline::new(PipelineConfig {
            root_path: temp.path().to_path_buf(),
            debug: true,
            ..config
        })
        .unwrap();
        EsbuildBuilder::new(BuildContext::new(Arc::new(pipeline))).unwrap()
    }

    #[test]
    fn test_cli_command_line() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(
            &temp,
            PipelineConfig {
                bundles: Some(BundleSpec::List(vec![
                    "app.js".to_string(),
                    "admin.js=admin/main".to_string(),
                    "https://esm.sh/lit".to_string(),
                ])),
                esbuild_target: vec!["es2020".to_string(), "chrome58".to_string()],
                esbuild_external: vec!["*.png".to_string()],
                esbuild_aliases: [("ui".to_string(), "/src/ui".to_string())]
                    .into_iter()
                    .collect::<IndexMap<_, _>>(),
                esbuild_args: vec!["--log-level=info".to_string()],
                ..PipelineConfig::default()
            },
        );

        let cmd = esbuild.command(true, true).unwrap();
        let statics = temp.path().join("static");
        let dist = statics.join("dist");

        assert_eq!(cmd.program, "npx");
        assert_eq!(
            cmd.args,
            vec![
                "esbuild".to_string(),
                statics.join("app.js").display().to_string(),
                format!("admin/main={}", statics.join("admin.js").display()),
                "--bundle".to_string(),
                "--format=esm".to_string(),
                "--asset-names=[dir]/[name]-[hash]".to_string(),
                "--chunk-names=[dir]/[name]-[hash]".to_string(),
                "--entry-names=[dir]/[name]-[hash]".to_string(),
                format!("--outbase={}", statics.display()),
                format!("--outdir={}", dist.display()),
                "--alias:ui=/src/ui".to_string(),
                "--external:*.png".to_string(),
                "--splitting".to_string(),
                "--target=es2020,chrome58".to_string(),
                format!("--metafile={}", esbuild.metafile_path().display()),
                "--sourcemap".to_string(),
                "--watch".to_string(),
                "--log-level=info".to_string(),
            ]
        );
        assert_eq!(cmd.cwd, temp.path());
        assert_eq!(cmd.env["ESBUILD_DEV"], "1");
        assert_eq!(cmd.env["ESBUILD_WATCH"], "1");
        assert_eq!(cmd.env["ESBUILD_TARGET"], "es2020,chrome58");
        assert_eq!(cmd.env["ESBUILD_ALIASES"], "ui=/src/ui");
        assert_eq!(
            cmd.env["ESBUILD_INPUTS"],
            format!(
                "{};{}",
                statics.join("app.js").display(),
                statics.join("admin.js").display()
            )
        );
    }

    #[test]
    fn test_production_command_minifies() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(
            &temp,
            PipelineConfig {
                bundles: Some(BundleSpec::List(vec!["app.js".to_string()])),
                esbuild_splitting: false,
                esbuild_bin: Argv::One("esbuild".to_string()),
                ..PipelineConfig::default()
            },
        );

        let cmd = esbuild.command(false, false).unwrap();
        assert_eq!(cmd.program, "esbuild");
        assert!(cmd.args.contains(&"--minify".to_string()));
        assert!(!cmd.args.contains(&"--splitting".to_string()));
        assert!(!cmd.args.contains(&"--watch".to_string()));
        assert_eq!(cmd.env["ESBUILD_SPLITTING"], "0");
        assert_eq!(esbuild.prefix(), "[esbuild]");
    }

    #[test]
    fn test_script_command() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(
            &temp,
            PipelineConfig {
                esbuild_script: Some(Argv::One("esbuild.mjs".to_string())),
                esbuild_args: vec!["--analyze".to_string()],
                ..PipelineConfig::default()
            },
        );

        assert!(esbuild.is_enabled());
        let cmd = esbuild.dev_command(true).unwrap().unwrap();
        assert_eq!(cmd.program, "node");
        assert_eq!(cmd.args, vec!["esbuild.mjs", "--analyze"]);
        assert_eq!(cmd.env["ESBUILD_WATCH"], "0");
        assert_eq!(
            cmd.env["ESBUILD_METAFILE"],
            esbuild.metafile_path().display().to_string()
        );
        assert_eq!(esbuild.prefix(), "[script]");

        let cmd = esbuild.script_command(&["--verbose".to_string()]).unwrap();
        assert_eq!(cmd.args, vec!["esbuild.mjs", "--analyze", "--verbose"]);
        assert_eq!(cmd.env["ESBUILD_DEV"], "0");
    }

    #[test]
    fn test_script_command_requires_script() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(&temp, PipelineConfig::default());
        assert!(matches!(
            esbuild.script_command(&[]),
            Err(BuilderError::NoScript)
        ));
        assert!(SCRIPT_TEMPLATE.contains("process.env"));
    }

    #[test]
    fn test_disabled_without_bundles() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(&temp, PipelineConfig::default());
        assert!(esbuild.dev_command(false).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dev_output_rewrites_mapping_and_cleanup_removes_metafile() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(
            &temp,
            PipelineConfig {
                bundles: Some(BundleSpec::List(vec!["app.js".to_string()])),
                ..PipelineConfig::default()
            },
        );

        std::fs::write(
            esbuild.metafile_path(),
            r#"{"outputs": {"static/dist/app-AB12.js": {"entryPoint": "static/app.js", "imports": []}}}"#,
        )
        .unwrap();

        let mut stale = Manifest::new();
        stale.push("img/logo.svg", ManifestEntry::Url("/static/img/logo-0011223344.svg".into()));
        stale.write(&temp.path().join("assets.json"), false).unwrap();

        esbuild.on_dev_output().await.unwrap();

        let mapping = Manifest::try_read(&temp.path().join("assets.json")).unwrap();
        assert_eq!(mapping.get("app.js").unwrap()[0].url(), "/static/dist/app-AB12.js");
        assert!(mapping.get("img/logo.svg").is_none());

        let path = esbuild.metafile_path().to_path_buf();
        esbuild.cleanup().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_dev_output_with_broken_metafile_is_an_error() {
        let temp = TempDir::new().unwrap();
        let esbuild = builder(
            &temp,
            PipelineConfig {
                bundles: Some(BundleSpec::List(vec!["app.js".to_string()])),
                ..PipelineConfig::default()
            },
        );
        std::fs::write(esbuild.metafile_path(), "{").unwrap();
        assert!(esbuild.on_dev_output().await.is_err());
        assert!(!temp.path().join("assets.json").exists());
    }
}
