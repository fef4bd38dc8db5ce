//! Inline asset extraction.

use std::sync::Arc;

use assetpipe_core::TemplateAssets;

use crate::cli::ProjectArgs;
use crate::error::Result;
use crate::ui;

pub async fn execute(project: &ProjectArgs) -> Result<()> {
    let pipeline = project.pipeline()?;
    if !pipeline.config().inline {
        ui::warning("inline is disabled in the configuration, extracted assets will not be included");
    }

    let templates = TemplateAssets::from_pipeline(Arc::clone(&pipeline));
    let assets = templates.extract_all(true)?;
    for asset in &assets {
        tracing::info!("extracted inline asset for {}", asset.reference());
    }

    ui::success(&format!("Extracted {} inline assets", assets.len()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn test_extracts_inline_script() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("templates")).unwrap();
        fs::write(temp.path().join("assets.toml"), "inline = true\n").unwrap();
        fs::write(
            temp.path().join("templates/index.html"),
            "<p>hi</p>\n<script bundle>console.log('hi')</script>\n",
        )
        .unwrap();

        let project = ProjectArgs {
            root: Some(temp.path().to_path_buf()),
            ..ProjectArgs::default()
        };
        execute(&project).await.unwrap();

        let written = fs::read_to_string(temp.path().join("static/index.js")).unwrap();
        assert!(written.contains("console.log('hi')"));
    }
}
