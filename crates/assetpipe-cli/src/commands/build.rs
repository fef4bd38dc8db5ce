//! Production build.
//!
//! Builders run in order: node packages are vendored, inline assets
//! extracted, bundles built with esbuild and the stylesheet with tailwind.
//! A separate assets folder is then copied (stamped) into the static
//! folder, the cache worker written and the mapping file replaced.

use std::sync::Arc;
use std::time::Instant;

use assetpipe_builders::{
    BuildContext, Builder, CacheWorkerBuilder, EsbuildBuilder, NodeDepsBuilder, TailwindBuilder,
    TemplatesBuilder,
};
use assetpipe_core::{AssetsPipeline, Manifest, ManifestEntry, TemplateAssets};

use crate::cli::ProjectArgs;
use crate::error::Result;
use crate::ui;

/// Builders shared by `build` and `dev`, in run order.
pub fn pipeline_builders(
    ctx: &BuildContext,
    templates: TemplatesBuilder,
) -> Result<Vec<Arc<dyn Builder>>> {
    let mut builders: Vec<Arc<dyn Builder>> = vec![
        Arc::new(NodeDepsBuilder::new(ctx.clone())),
        Arc::new(templates),
        Arc::new(EsbuildBuilder::new(ctx.clone())?),
    ];
    if let Some(tailwind) = TailwindBuilder::new(ctx.clone()) {
        builders.push(Arc::new(tailwind));
    }
    Ok(builders)
}

/// Mapping entries of copied assets. Scripts are also mapped in the import map under their source name.
pub fn copied_assets_manifest(static_url_path: &str, copied: &[(String, String)]) -> Manifest {
    let mut manifest = Manifest::new();
    for (src, dest) in copied {
        let url = format!("{}/{}", static_url_path.trim_end_matches('/'), dest);
        let entry = if dest.ends_with(".js") {
            ManifestEntry::with_meta(url, "map_as", src.as_str())
        } else {
            ManifestEntry::Url(url)
        };
        manifest.insert(src.as_str(), vec![entry]);
    }
    manifest
}

/// Run every builder and return the mapping to write.
pub async fn build_assets(pipeline: &Arc<AssetsPipeline>) -> Result<Manifest> {
    let ctx = BuildContext::new(Arc::clone(pipeline));
    let templates = TemplatesBuilder::new(ctx.clone(), TemplateAssets::from_pipeline(Arc::clone(pipeline)));

    let mut manifest = Manifest::new();
    let mut ignore: Vec<String> = Vec::new();

    for builder in pipeline_builders(&ctx, templates)? {
        tracing::debug!("running {} builder", builder.name());
        let result = builder.build(&mut manifest, &mut ignore).await;
        if let Err(e) = builder.cleanup().await {
            tracing::warn!("{} cleanup failed: {}", builder.name(), e);
        }
        result?;
    }

    let layout = pipeline.layout();
    if layout.has_separate_assets_folder() {
        let copied: Vec<(String, String)> =
            pipeline.copy_assets_to_static(&ignore)?.into_iter().collect();
        tracing::info!(
            "copied {} assets to {}",
            copied.len(),
            layout.static_folder.display()
        );
        manifest.extend(copied_assets_manifest(&layout.static_url_path, &copied));
    }

    CacheWorkerBuilder::new(ctx)
        .build(&mut manifest, &mut ignore)
        .await?;

    Ok(manifest)
}

pub async fn execute(project: &ProjectArgs) -> Result<()> {
    let started = Instant::now();
    let pipeline = project.pipeline()?;

    ui::info("Building assets for production...");
    let manifest = build_assets(&pipeline).await?;
    pipeline.write_mapping_file(&manifest, None, false)?;

    ui::print_mapping_summary(&manifest, started.elapsed());
    ui::success(&format!(
        "Wrote {}",
        pipeline.layout().mapping_file.display()
    ));
    Ok(())
}
