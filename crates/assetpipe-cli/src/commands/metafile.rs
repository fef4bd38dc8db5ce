//! esbuild metafile conversion.

use crate::cli::{ConvertMetafileArgs, ProjectArgs};
use crate::error::{CliError, Result};
use crate::ui;

pub async fn execute(project: &ProjectArgs, args: ConvertMetafileArgs) -> Result<()> {
    let root = project.root_dir()?;
    let filename = root.join(&args.filename);
    if !filename.is_file() {
        return Err(CliError::FileNotFound(filename));
    }

    let pipeline = project.pipeline()?;
    let converted = pipeline.convert_metafile(&filename)?;
    let out = args.out.as_ref().map(|out| root.join(out));
    pipeline.write_mapping_file(&converted.manifest, out.as_deref(), args.merge)?;

    let written = out.unwrap_or_else(|| pipeline.layout().mapping_file.clone());
    ui::success(&format!(
        "Mapped {} assets into {}",
        converted.manifest.len(),
        written.display()
    ));
    Ok(())
}
