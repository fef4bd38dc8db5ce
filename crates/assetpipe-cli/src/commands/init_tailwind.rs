//! Tailwind input stylesheet scaffolding.

use assetpipe_builders::{BuildContext, TailwindBuilder};

use crate::cli::ProjectArgs;
use crate::error::{CliError, Result};
use crate::ui;

pub async fn execute(project: &ProjectArgs) -> Result<()> {
    let pipeline = project.pipeline()?;
    let Some(tailwind) = TailwindBuilder::new(BuildContext::new(pipeline)) else {
        return Err(CliError::Config(
            "tailwind is not configured, set tailwind = \"main.css\" first".to_string(),
        ));
    };

    if tailwind.input_path().exists() {
        ui::info(&format!(
            "{} already exists",
            tailwind.input_path().display()
        ));
        return Ok(());
    }

    tailwind.ensure_input()?;
    ui::success(&format!("Created {}", tailwind.input_path().display()));
    Ok(())
}
