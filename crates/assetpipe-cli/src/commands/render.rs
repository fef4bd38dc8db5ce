//! Render a template with its asset tags.

use std::sync::Arc;

use assetpipe_core::TemplateAssets;
use serde_json::Value;

use crate::cli::{ProjectArgs, RenderArgs};
use crate::error::{CliError, Result, ResultExt};

/// Parse the `--context` JSON object.
pub fn parse_context(context: Option<&str>) -> Result<Value> {
    let Some(context) = context else {
        return Ok(Value::Object(Default::default()));
    };
    let value: Value = serde_json::from_str(context).context("Invalid --context")?;
    if !value.is_object() {
        return Err(CliError::InvalidArgument(
            "--context must be a JSON object".to_string(),
        ));
    }
    Ok(value)
}

pub async fn execute(project: &ProjectArgs, args: RenderArgs) -> Result<()> {
    let context = parse_context(args.context.as_deref())?;
    let pipeline = project.pipeline()?;

    let templates = TemplateAssets::from_pipeline(Arc::clone(&pipeline));
    let env = templates.environment();
    let page = pipeline.page();

    let html = templates.render_page(&env, &args.template, context, &page)?;
    println!("{}", html);
    Ok(())
}
