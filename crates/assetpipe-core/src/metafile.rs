//! Conversion of esbuild metafiles into mapping entries.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::bundle::BundleFile;
use crate::error::{Error, Result};
use crate::manifest::{Manifest, ManifestEntry};

#[derive(Debug, Deserialize)]
struct Metafile {
    outputs: IndexMap<String, MetaOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaOutput {
    entry_point: Option<String>,
    css_bundle: Option<String>,
    #[serde(default)]
    imports: Vec<MetaImport>,
}

#[derive(Debug, Deserialize)]
struct MetaImport {
    path: String,
    kind: String,
}

/// Folders and URL needed to turn esbuild output paths into URLs.
#[derive(Debug, Clone)]
pub struct MetafileContext<'a> {
    /// Working directory esbuild ran in; metafile paths are relative to it
    pub root: &'a Path,
    pub assets_folder: &'a Path,
    pub output_folder: &'a Path,
    pub output_url: &'a str,
}

impl MetafileContext<'_> {
    fn output_prefix(&self) -> String {
        let relative = self
            .output_folder
            .strip_prefix(self.root)
            .unwrap_or(self.output_folder);
        relative.to_string_lossy().replace('\\', "/")
    }

    fn to_url(&self, prefix: &str, output: &str) -> Result<String> {
        let rest = output.strip_prefix(prefix).ok_or_else(|| {
            Error::InvalidMetafile(format!("output {} is outside of {}", output, prefix))
        })?;
        Ok(format!("{}{}", self.output_url.trim_end_matches('/'), rest))
    }
}

/// Converted metafile: declared input filenames and the mapping entries.
#[derive(Debug, Default)]
pub struct ConvertedMetafile {
    /// Entry filenames consumed by esbuild, skipped when copying assets
    pub inputs: Vec<String>,
    pub manifest: Manifest,
}

/// Convert an esbuild metafile for the given entrypoints.
///
/// The JS output of each entrypoint is mapped as an `import`, its CSS bundle
/// as a plain URL and every statically imported chunk as a `modulepreload`.
pub fn convert_metafile(
    json: &str,
    entrypoints: &[&BundleFile],
    ctx: &MetafileContext<'_>,
) -> Result<ConvertedMetafile> {
    let meta: Metafile = serde_json::from_str(json)?;
    let prefix = ctx.output_prefix();

    let by_path: IndexMap<PathBuf, &BundleFile> = entrypoints
        .iter()
        .filter(|file| !file.is_abs_url())
        .map(|file| (path_clean::clean(file.resolve_path(ctx.assets_folder)), *file))
        .collect();

    let mut converted = ConvertedMetafile::default();

    for (output, info) in &meta.outputs {
        let Some(entry_point) = &info.entry_point else {
            continue;
        };
        let path = path_clean::clean(ctx.root.join(entry_point));
        let Some(file) = by_path.get(&path) else {
            continue;
        };

        if !converted.inputs.contains(&file.filename) {
            converted.inputs.push(file.filename.clone());
        }

        let url = ctx.to_url(&prefix, output)?;
        let entry = if url.ends_with(".js") {
            ManifestEntry::with_modifier(url, "import")
        } else {
            ManifestEntry::Url(url)
        };
        converted.manifest.push(&file.path, entry);

        if let Some(css) = &info.css_bundle {
            let url = ctx.to_url(&prefix, css)?;
            converted.manifest.push(&file.path, ManifestEntry::Url(url));
        }

        for import in info.imports.iter().filter(|i| i.kind == "import-statement") {
            let url = ctx.to_url(&prefix, &import.path)?;
            converted
                .manifest
                .push(&file.path, ManifestEntry::with_modifier(url, "modulepreload"));
        }
    }

    Ok(converted)
}

/// Read and convert a metafile from disk.
pub fn convert_metafile_file(
    path: &Path,
    entrypoints: &[&BundleFile],
    ctx: &MetafileContext<'_>,
) -> Result<ConvertedMetafile> {
    let json = std::fs::read_to_string(path).map_err(|e| Error::path_io(path, e))?;
    convert_metafile(&json, entrypoints, ctx)
}
