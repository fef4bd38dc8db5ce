//! Process-wide pipeline state.
//!
//! [`AssetsPipeline`] owns the declared bundles, the global include list,
//! the import map and the loaded manifest. Pages get their own
//! [`PageAssets`] through [`AssetsPipeline::page`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::bundle::{BundleFile, BundleRegistry, Scope};
use crate::config::{BundleSpec, Layout, PipelineConfig};
use crate::copy::copy_assets;
use crate::error::{Error, Result};
use crate::import_map::ImportMap;
use crate::include::{IncludeList, DEFAULT_PRIORITY};
use crate::inline::InlineAsset;
use crate::manifest::Manifest;
use crate::metafile::{convert_metafile_file, ConvertedMetafile, MetafileContext};
use crate::page::PageAssets;
use crate::resolver::{AssetResolver, ResolvedAsset};
use crate::tags::{render_tags, TagOptions};

#[derive(Debug, Default)]
struct PipelineState {
    bundles: BundleRegistry,
    include: IncludeList,
    import_map: ImportMap,
    manifest: Arc<Manifest>,
    esbuild_aliases: IndexMap<String, String>,
}

impl PipelineState {
    fn bundle(&mut self, files: &[String], name: Option<&str>, scope: Option<Scope<'_>>) -> Vec<String> {
        match name {
            Some(name) => {
                self.bundles.declare(name, files, scope);
                vec![name.to_string()]
            }
            None => self.bundles.declare_each(files, scope),
        }
    }
}

#[derive(Debug)]
pub struct AssetsPipeline {
    config: PipelineConfig,
    layout: Layout,
    resolver: AssetResolver,
    state: RwLock<PipelineState>,
}

impl AssetsPipeline {
    /// Validate the configuration, load the mapping file and register
    /// configured bundles, includes and packages.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let layout = config.layout();
        let resolver = AssetResolver::new(&layout);
        let manifest = Manifest::read(&layout.mapping_file);

        if !config.debug
            && (config.bundles.is_some()
                || config.tailwind.is_some()
                || layout.has_separate_assets_folder())
            && manifest.is_empty()
        {
            tracing::warn!("no assets mapping found, run 'assetpipe build' to generate it");
        }

        let mut state = PipelineState {
            esbuild_aliases: config.esbuild_aliases.clone(),
            ..PipelineState::default()
        };
        for (name, url) in &config.import_map {
            state.import_map.insert(name.clone(), url.clone());
        }
        state.import_map.extend_from_manifest(&manifest);
        state.manifest = Arc::new(manifest);

        let pipeline = Self {
            config,
            layout,
            resolver,
            state: RwLock::new(state),
        };

        if let Some(spec) = pipeline.config.bundles.clone() {
            pipeline.bundle_spec(&spec, pipeline.config.include.is_none(), DEFAULT_PRIORITY);
        }
        if let Some(include) = pipeline.config.include.clone() {
            pipeline.include(&include, DEFAULT_PRIORITY);
        }

        pipeline.state.write().import_map.expose_node_packages(
            &pipeline.config.expose_node_packages,
            &pipeline.layout.output_url,
        );

        tracing::debug!(
            "assets pipeline ready: {} bundles, {} includes",
            pipeline.state.read().bundles.len(),
            pipeline.state.read().include.len()
        );

        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn resolver(&self) -> &AssetResolver {
        &self.resolver
    }

    pub fn is_debug(&self) -> bool {
        self.config.debug
    }

    /// Declare bundles from a file list. Without a name, each file is its own bundle.
    pub fn bundle(
        &self,
        files: &[String],
        name: Option<&str>,
        include: bool,
        priority: i32,
    ) -> Vec<String> {
        let mut state = self.state.write();
        let names = state.bundle(files, name, None);
        if include {
            let PipelineState {
                bundles,
                include: includes,
                ..
            } = &mut *state;
            includes.include(&names, priority, bundles);
        }
        names
    }

    /// Declare bundles from configuration.
    pub fn bundle_spec(&self, spec: &BundleSpec, include: bool, priority: i32) -> Vec<String> {
        let mut state = self.state.write();
        let names = state.bundles.declare_spec(spec, None, None);
        if include {
            let PipelineState {
                bundles,
                include: includes,
                ..
            } = &mut *state;
            includes.include(&names, priority, bundles);
        }
        names
    }

    /// Declare `@scope`, a bundle whose files live in `assets_folder` and
    /// whose outputs go under `scope/`.
    pub fn scoped_bundle(
        &self,
        scope: &str,
        assets_folder: &Path,
        files: &[String],
        include: bool,
    ) -> String {
        let name = format!("@{}", scope);
        let scope = Scope {
            assets_folder,
            output_prefix: scope,
        };

        let mut state = self.state.write();
        state.bundle(files, Some(&name), Some(scope));
        if include {
            let PipelineState {
                bundles,
                include: includes,
                ..
            } = &mut *state;
            includes.include(&[name.as_str()], DEFAULT_PRIORITY, bundles);
        }
        name
    }

    /// Snapshot of the declared bundles.
    pub fn bundles(&self) -> BundleRegistry {
        self.state.read().bundles.clone()
    }

    pub fn has_bundles(&self) -> bool {
        !self.state.read().bundles.is_empty()
    }

    /// Expose a local folder to esbuild under an import alias (its name by default).
    pub fn package_from_path(&self, path: &Path, alias: Option<&str>) -> Result<()> {
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    Error::invalid_config("package path", format!("{} has no name", path.display()))
                })?,
        };
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            path_clean::clean(self.layout.root.join(path))
        };
        self.state
            .write()
            .esbuild_aliases
            .insert(alias, absolute.to_string_lossy().into_owned());
        Ok(())
    }

    pub fn esbuild_aliases(&self) -> IndexMap<String, String> {
        self.state.read().esbuild_aliases.clone()
    }

    /// Include references on every page.
    pub fn include<S: AsRef<str>>(&self, refs: &[S], priority: i32) {
        let mut state = self.state.write();
        let PipelineState {
            bundles, include, ..
        } = &mut *state;
        include.include(refs, priority, bundles);
    }

    /// Expand references into a page include list.
    pub(crate) fn include_into<S: AsRef<str>>(&self, list: &mut IncludeList, refs: &[S], priority: i32) {
        list.include(refs, priority, &self.state.read().bundles);
    }

    /// Snapshot of the global include list.
    pub fn includes(&self) -> IncludeList {
        self.state.read().include.clone()
    }

    pub fn map_import(&self, name: impl Into<String>, url: impl Into<String>) {
        self.state.write().import_map.insert(name, url);
    }

    pub fn import_map(&self) -> ImportMap {
        self.state.read().import_map.clone()
    }

    /// Current manifest. Re-read from disk in debug mode.
    pub fn manifest(&self) -> Arc<Manifest> {
        if self.config.debug {
            Arc::new(self.read_mapping())
        } else {
            Arc::clone(&self.state.read().manifest)
        }
    }

    pub fn read_mapping(&self) -> Manifest {
        Manifest::read(&self.layout.mapping_file)
    }

    /// Re-read the mapping file and map its aliases.
    pub fn reload_mapping(&self) {
        let manifest = self.read_mapping();
        let mut state = self.state.write();
        state.import_map.extend_from_manifest(&manifest);
        state.manifest = Arc::new(manifest);
    }

    /// Write a manifest to the mapping file (or `out`).
    pub fn write_mapping_file(&self, manifest: &Manifest, out: Option<&Path>, merge: bool) -> Result<()> {
        let path = out.unwrap_or(&self.layout.mapping_file);
        manifest.write(path, merge)
    }

    /// Convert an esbuild metafile against the declared bundles.
    pub fn convert_metafile(&self, path: &Path) -> Result<ConvertedMetafile> {
        let bundles = self.bundles();
        let files = bundles.files(None)?;
        convert_metafile_file(
            path,
            &files,
            &MetafileContext {
                root: &self.layout.root,
                assets_folder: &self.layout.assets_folder,
                output_folder: &self.layout.output_folder,
                output_url: &self.layout.output_url,
            },
        )
    }

    /// Per-request asset state.
    pub fn page(self: &Arc<Self>) -> PageAssets {
        PageAssets::new(Arc::clone(self))
    }

    /// URL of the tailwind stylesheet, when tailwind is configured.
    pub fn tailwind_url(&self) -> Option<String> {
        self.config
            .tailwind
            .as_ref()
            .map(|input| format!("{}/{}", self.layout.output_url.trim_end_matches('/'), input))
    }

    /// First URL of a reference.
    pub fn url(&self, reference: &str, external: bool) -> Option<String> {
        self.resolver
            .resolve(reference, &self.manifest(), external)
            .into_iter()
            .next()
            .map(|asset| asset.url)
    }

    pub fn urls<S: AsRef<str>>(&self, refs: &[S], external: bool) -> Vec<ResolvedAsset> {
        self.resolver.resolve_all(refs, &self.manifest(), external)
    }

    /// Tags for the global include list.
    pub fn tags(&self, nonce: Option<&str>) -> String {
        let includes = self.includes();
        self.tags_for(&includes.ordered(), nonce)
    }

    /// Tags for explicit references.
    pub fn tags_for<S: AsRef<str>>(&self, refs: &[S], nonce: Option<&str>) -> String {
        self.render(&self.urls(refs, false), nonce)
    }

    /// URL of the cache service worker. Only registered outside debug mode.
    pub fn cache_worker_url(&self) -> Option<String> {
        (self.config.cache_worker && !self.config.debug).then(|| {
            format!(
                "{}/{}",
                self.layout.output_url.trim_end_matches('/'),
                self.config.cache_worker_filename
            )
        })
    }

    pub(crate) fn render(&self, assets: &[ResolvedAsset], nonce: Option<&str>) -> String {
        let import_map = self.import_map();
        let service_worker = self.cache_worker_url();
        render_tags(
            assets,
            TagOptions {
                import_map: Some(&import_map),
                livereload_port: self.config.debug.then_some(self.config.livereload_port),
                service_worker: service_worker.as_deref(),
                nonce,
            },
        )
    }

    /// Copy the assets folder to the static folder.
    ///
    /// Bundle sources, the tailwind input and `ignore` are skipped.
    pub fn copy_assets_to_static(&self, ignore: &[String]) -> Result<IndexMap<String, String>> {
        let mut ignore = ignore.to_vec();
        {
            let state = self.state.read();
            for file in state.bundles.files(None)? {
                ignore.push(file.filename.clone());
            }
        }
        if let Some(tailwind) = &self.config.tailwind {
            ignore.push(tailwind.clone());
        }

        copy_assets(
            &self.layout.assets_folder,
            &self.layout.static_folder,
            self.config.stamp_assets,
            &ignore,
        )
    }

    /// Register an asset extracted from a template.
    ///
    /// The asset joins its bundle when declared. An undeclared `@scope`
    /// bundle is declared with the asset's file; any other undeclared name
    /// becomes both the bundle and the file. Without a bundle name the file
    /// is its own bundle. New bundles are included globally unless inline
    /// assets are included on demand. With `write`, the content is written
    /// under the assets folder and the written path is returned.
    pub fn register_inline_asset(&self, asset: &InlineAsset, write: bool) -> Result<Option<PathBuf>> {
        let filename = {
            let mut state = self.state.write();
            let name = asset.reference();

            if state.bundles.contains(name) {
                state
                    .bundles
                    .append(name, BundleFile::parse(&asset.filename))?;
                asset.filename.clone()
            } else {
                let filename = if name.starts_with('@') {
                    asset.filename.clone()
                } else {
                    name.to_string()
                };
                state
                    .bundles
                    .declare(name, std::slice::from_ref(&filename), None);
                if !self.config.include_inline_on_demand {
                    let PipelineState {
                        bundles,
                        include: includes,
                        ..
                    } = &mut *state;
                    includes.include(&[name], DEFAULT_PRIORITY, bundles);
                }
                filename
            }
        };

        if !write {
            return Ok(None);
        }
        let path = self.layout.assets_folder.join(&filename);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::path_io(parent, e))?;
        }
        std::fs::write(&path, &asset.content).map_err(|e| Error::path_io(&path, e))?;
        tracing::debug!("wrote inline asset {}", path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;
    use tempfile::TempDir;

    fn config(root: &Path) -> PipelineConfig {
        PipelineConfig {
            root_path: root.to_path_buf(),
            ..PipelineConfig::default()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_configured_bundles_are_included() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(PipelineConfig {
            bundles: Some(BundleSpec::List(strings(&["app.js", "site.css"]))),
            ..config(temp.path())
        })
        .unwrap();

        assert!(pipeline.has_bundles());
        assert_eq!(pipeline.includes().ordered(), vec!["app.js", "site.css"]);
    }

    #[test]
    fn test_explicit_include_disables_bundle_autoinclude() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(PipelineConfig {
            bundles: Some(BundleSpec::List(strings(&["app.js", "admin.js"]))),
            include: Some(strings(&["app.js"])),
            ..config(temp.path())
        })
        .unwrap();
        assert_eq!(pipeline.includes().ordered(), vec!["app.js"]);
    }

    #[test]
    fn test_manifest_aliases_and_exposed_packages() {
        let temp = TempDir::new().unwrap();
        let mut manifest = Manifest::new();
        manifest.push(
            "lib/util.js",
            ManifestEntry::with_meta("/static/lib/util-1234567890.js", "map_as", "util"),
        );
        manifest.write(&temp.path().join("assets.json"), false).unwrap();

        let pipeline = AssetsPipeline::new(PipelineConfig {
            expose_node_packages: strings(&["htmx.org"]),
            ..config(temp.path())
        })
        .unwrap();

        let map = pipeline.import_map();
        assert_eq!(map.get("util"), Some("/static/lib/util-1234567890.js"));
        assert_eq!(map.get("htmx.org"), Some("/static/dist/vendor/htmx.org.js"));
    }

    #[test]
    fn test_url_and_tags() {
        let temp = TempDir::new().unwrap();
        let mut manifest = Manifest::new();
        manifest.push("app.js", ManifestEntry::with_modifier("/static/dist/app-X.js", "import"));
        manifest.write(&temp.path().join("assets.json"), false).unwrap();

        let pipeline = AssetsPipeline::new(PipelineConfig {
            bundles: Some(BundleSpec::List(strings(&["app.js"]))),
            ..config(temp.path())
        })
        .unwrap();

        assert_eq!(pipeline.url("app.js", false).as_deref(), Some("/static/dist/app-X.js"));
        assert_eq!(
            pipeline.tags(None),
            r#"<script src="/static/dist/app-X.js" type="module"></script>"#
        );
    }

    #[test]
    fn test_debug_rereads_mapping_and_adds_livereload() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(PipelineConfig {
            debug: true,
            ..config(temp.path())
        })
        .unwrap();
        assert_eq!(pipeline.url("app.js", false).as_deref(), Some("/static/app.js"));

        let mut manifest = Manifest::new();
        manifest.push("app.js", "/static/dist/app-NEW.js".into());
        pipeline.write_mapping_file(&manifest, None, false).unwrap();
        assert_eq!(pipeline.url("app.js", false).as_deref(), Some("/static/dist/app-NEW.js"));

        assert!(pipeline.tags_for(&["app.js"], None).contains("EventSource('http://localhost:7878')"));
    }

    #[test]
    fn test_cache_worker_registered_in_production_only() {
        let temp = TempDir::new().unwrap();
        let production = AssetsPipeline::new(PipelineConfig {
            cache_worker: true,
            ..config(temp.path())
        })
        .unwrap();
        assert_eq!(
            production.cache_worker_url().as_deref(),
            Some("/static/dist/cache-worker.js")
        );
        assert!(production
            .tags_for(&["app.js"], None)
            .contains("navigator.serviceWorker.register('/static/dist/cache-worker.js')"));

        let debug = AssetsPipeline::new(PipelineConfig {
            cache_worker: true,
            debug: true,
            ..config(temp.path())
        })
        .unwrap();
        assert!(debug.cache_worker_url().is_none());
    }

    #[test]
    fn test_scoped_bundle_and_package_alias() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(config(temp.path())).unwrap();

        let admin = temp.path().join("admin/static");
        let name = pipeline.scoped_bundle("admin", &admin, &strings(&["admin.js"]), true);
        assert_eq!(name, "@admin");

        let bundles = pipeline.bundles();
        let files = bundles.files(Some("@admin")).unwrap();
        assert_eq!(files[0].outfile.as_deref(), Some("admin/admin"));
        assert_eq!(
            pipeline.includes().ordered(),
            vec![admin.join("admin.js").to_string_lossy().to_string()]
        );

        pipeline.package_from_path(Path::new("frontend/ui"), None).unwrap();
        assert_eq!(
            pipeline.esbuild_aliases()["ui"],
            temp.path().join("frontend/ui").to_string_lossy()
        );
    }

    #[test]
    fn test_register_inline_asset() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(config(temp.path())).unwrap();

        let asset = InlineAsset {
            bundle: None,
            filename: "pages/home.js".to_string(),
            content: "console.log(1)".to_string(),
        };
        pipeline.register_inline_asset(&asset, true).unwrap();
        assert!(pipeline.bundles().contains("pages/home.js"));
        assert_eq!(pipeline.includes().ordered(), vec!["pages/home.js"]);
        assert_eq!(
            std::fs::read_to_string(temp.path().join("static/pages/home.js")).unwrap(),
            "console.log(1)"
        );

        let joined = InlineAsset {
            bundle: Some("pages/home.js".to_string()),
            filename: "pages/other.js".to_string(),
            content: String::new(),
        };
        pipeline.register_inline_asset(&joined, false).unwrap();
        assert_eq!(
            pipeline.bundles().entrypoints(Some("pages/home.js")).unwrap(),
            vec!["pages/home.js", "pages/other.js"]
        );
    }

    #[test]
    fn test_inline_asset_named_bundle_is_its_own_file() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(config(temp.path())).unwrap();

        let home = InlineAsset {
            bundle: Some("widgets.js".to_string()),
            filename: "pages/home.js".to_string(),
            content: "export const a = 1;".to_string(),
        };
        let written = pipeline.register_inline_asset(&home, true).unwrap();
        assert_eq!(written, Some(temp.path().join("static/widgets.js")));
        assert_eq!(
            pipeline.bundles().entrypoints(Some("widgets.js")).unwrap(),
            vec!["widgets.js"]
        );
        assert_eq!(pipeline.includes().ordered(), vec!["widgets.js"]);
        assert!(!temp.path().join("static/pages/home.js").exists());

        let scoped = InlineAsset {
            bundle: Some("@admin".to_string()),
            filename: "pages/admin.js".to_string(),
            content: String::new(),
        };
        let written = pipeline.register_inline_asset(&scoped, true).unwrap();
        assert_eq!(written, Some(temp.path().join("static/pages/admin.js")));
        assert_eq!(
            pipeline.bundles().entrypoints(Some("@admin")).unwrap(),
            vec!["pages/admin.js"]
        );
    }

    #[test]
    fn test_inline_on_demand_skips_global_include() {
        let temp = TempDir::new().unwrap();
        let pipeline = AssetsPipeline::new(PipelineConfig {
            include_inline_on_demand: true,
            ..config(temp.path())
        })
        .unwrap();
        let asset = InlineAsset {
            bundle: Some("@widgets".to_string()),
            filename: "widgets.js".to_string(),
            content: String::new(),
        };
        pipeline.register_inline_asset(&asset, false).unwrap();
        assert!(pipeline.bundles().contains("@widgets"));
        assert!(pipeline.includes().is_empty());
    }

    #[test]
    fn test_copy_assets_to_static_skips_bundles() {
        let temp = TempDir::new().unwrap();
        let assets = temp.path().join("assets");
        std::fs::create_dir_all(&assets).unwrap();
        std::fs::write(assets.join("app.js"), "x").unwrap();
        std::fs::write(assets.join("logo.svg"), "<svg/>").unwrap();
        std::fs::write(assets.join("main.css"), "@import \"tailwindcss\";").unwrap();

        let pipeline = AssetsPipeline::new(PipelineConfig {
            assets_folder: Some(PathBuf::from("assets")),
            bundles: Some(BundleSpec::List(strings(&["app.js"]))),
            tailwind: Some("main.css".to_string()),
            stamp_assets: false,
            debug: true,
            ..config(temp.path())
        })
        .unwrap();

        let copied = pipeline.copy_assets_to_static(&[]).unwrap();
        assert_eq!(copied.keys().collect::<Vec<_>>(), vec!["logo.svg"]);
        assert!(temp.path().join("static/logo.svg").exists());
    }
}
