//! Custom esbuild scripts.
//!
//! `generate-esbuild-script` writes a node script that reproduces the
//! default esbuild invocation from `ESBUILD_*` environment variables, to
//! be extended with plugins. `esbuild-script` runs the configured script
//! with those variables set.

use std::fs;

use assetpipe_builders::{BuildContext, Builder, EsbuildBuilder, SCRIPT_TEMPLATE};

use crate::cli::{EsbuildScriptArgs, GenerateScriptArgs, ProjectArgs};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;

pub async fn generate(project: &ProjectArgs, args: GenerateScriptArgs) -> Result<()> {
    let path = project.root_dir()?.join(&args.filename);
    if path.exists() && !args.force {
        return Err(CliError::InvalidArgument(format!(
            "{} already exists, use --force to overwrite it",
            path.display()
        )));
    }

    fs::write(&path, SCRIPT_TEMPLATE).context(format!("Failed to write {}", path.display()))?;

    ui::success(&format!("Created {}", path.display()));
    ui::info(&format!(
        "Set esbuild_script = \"{}\" in your configuration to use it",
        args.filename.display()
    ));
    Ok(())
}

pub async fn execute(project: &ProjectArgs, args: EsbuildScriptArgs) -> Result<()> {
    let pipeline = project.pipeline()?;
    let esbuild = EsbuildBuilder::new(BuildContext::new(pipeline))?;

    let result = match esbuild.script_command(&args.args) {
        Ok(command) => command.run(esbuild.prefix()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = esbuild.cleanup().await {
        tracing::warn!("esbuild cleanup failed: {}", e);
    }
    Ok(result?)
}
