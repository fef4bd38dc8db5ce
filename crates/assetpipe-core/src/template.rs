//! minijinja integration.
//!
//! Templates get four functions:
//!
//! - `include_asset(ref, priority=1)` adds references to the page,
//! - `asset_url(ref, external=false)` returns the first URL of a reference,
//! - `static_url(file)` returns a URL in the static folder,
//! - `asset_tags(nonce=none)` renders the page's tags.
//!
//! `{% asset_tags %}` is accepted as a statement. Its output is produced
//! once the whole template ran, so `include_asset` calls made after it (in
//! blocks or included templates) still make it into the tags.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use minijinja::value::Kwargs;
use minijinja::{Environment, ErrorKind, State, Value};
use regex::Regex;
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::include::DEFAULT_PRIORITY;
use crate::inline::{extract_inline_assets, has_inline_assets, InlineAsset};
use crate::page::PageAssets;
use crate::pipeline::AssetsPipeline;

/// Placeholder emitted by `asset_tags` and replaced after rendering.
pub const ASSET_TAGS_MARKER: &str = "<!--assetpipe:asset-tags-->";

/// Context variable holding the page being rendered.
const PAGE_VAR: &str = "__assetpipe_page";

static ASSET_TAGS_STMT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{%-?\s*asset_tags\b\s*(.*?)\s*-?%\}").expect("asset_tags regex is valid")
});

/// A template found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Name relative to its folder, `/`-separated
    pub name: String,
    pub path: PathBuf,
}

/// Templates of a pipeline, looked up in a list of folders.
#[derive(Debug, Clone)]
pub struct TemplateAssets {
    pipeline: Arc<AssetsPipeline>,
    folders: Vec<PathBuf>,
}

impl TemplateAssets {
    pub fn new(pipeline: Arc<AssetsPipeline>, folders: Vec<PathBuf>) -> Self {
        Self { pipeline, folders }
    }

    /// Template folder of the layout plus configured extra folders.
    pub fn from_pipeline(pipeline: Arc<AssetsPipeline>) -> Self {
        let layout = pipeline.layout();
        let mut folders = vec![layout.template_folder.clone()];
        folders.extend(
            pipeline
                .config()
                .watch_template_folders
                .iter()
                .map(|folder| layout.root.join(folder)),
        );
        Self::new(pipeline, folders)
    }

    pub fn folders(&self) -> &[PathBuf] {
        &self.folders
    }

    pub fn pipeline(&self) -> &Arc<AssetsPipeline> {
        &self.pipeline
    }

    /// Build an environment loading templates from the folders.
    pub fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();

        let loader = self.clone();
        env.set_loader(move |name| {
            let Some(path) = loader.find(name) else {
                return Ok(None);
            };
            let source = std::fs::read_to_string(&path).map_err(|e| {
                minijinja::Error::new(ErrorKind::InvalidOperation, "could not read template")
                    .with_source(e)
            })?;
            loader
                .preprocess(name, &source, false)
                .map(Some)
                .map_err(|e| minijinja::Error::new(ErrorKind::SyntaxError, e.to_string()))
        });

        let static_url_path = self.pipeline.layout().static_url_path.clone();
        env.add_function("static_url", move |file: String| {
            format!("{}/{}", static_url_path, file.trim_start_matches('/'))
        });
        env.add_function("include_asset", include_asset);
        env.add_function("asset_url", asset_url);
        env.add_function("asset_tags", asset_tags);

        env
    }

    /// Rewrite `{% asset_tags %}` statements and extract inline assets.
    pub fn preprocess(&self, name: &str, source: &str, write: bool) -> Result<String> {
        let mut source = rewrite_asset_tags(source);

        if self.pipeline.config().inline && has_inline_assets(&source) {
            let extracted = extract_inline_assets(name, &source)?;
            for asset in &extracted.assets {
                self.pipeline.register_inline_asset(asset, write)?;
            }
            source = extracted.source;
        }

        Ok(source)
    }

    /// Render a template for a page, then substitute the page's tags.
    pub fn render_page<S: Serialize>(
        &self,
        env: &Environment<'_>,
        name: &str,
        ctx: S,
        page: &PageAssets,
    ) -> Result<String> {
        let template = env.get_template(name)?;
        let ctx = Value::from_serialize(&ctx);
        let mut vars: BTreeMap<String, Value> = BTreeMap::new();
        if let Ok(keys) = ctx.try_iter() {
            for key in keys {
                if let Some(name) = key.as_str() {
                    vars.insert(name.to_string(), ctx.get_item(&key)?);
                }
            }
        }
        vars.insert(PAGE_VAR.to_string(), Value::from_object(page.clone()));

        let rendered = template.render(Value::from(vars))?;

        if !rendered.contains(ASSET_TAGS_MARKER) {
            return Ok(rendered);
        }
        Ok(rendered.replace(ASSET_TAGS_MARKER, &page.tags(None)))
    }

    fn find(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        self.folders
            .iter()
            .map(|folder| folder.join(relative))
            .find(|path| path.is_file())
    }

    /// Templates whose extension is in `inline_template_exts`. The first folder wins on name clashes.
    pub fn list_templates(&self) -> Result<Vec<TemplateFile>> {
        let exts = &self.pipeline.config().inline_template_exts;
        let mut templates: Vec<TemplateFile> = Vec::new();

        for folder in self.folders.iter().filter(|f| f.is_dir()) {
            for entry in WalkDir::new(folder).sort_by_file_name() {
                let entry = entry?;
                if !entry.file_type().is_file() || !has_extension(entry.path(), exts) {
                    continue;
                }
                let name = entry
                    .path()
                    .strip_prefix(folder)
                    .unwrap_or(entry.path())
                    .to_string_lossy()
                    .replace('\\', "/");
                if templates.iter().all(|t| t.name != name) {
                    templates.push(TemplateFile {
                        name,
                        path: entry.path().to_path_buf(),
                    });
                }
            }
        }

        Ok(templates)
    }

    /// Extract and register inline assets of every template.
    pub fn extract_all(&self, write: bool) -> Result<Vec<InlineAsset>> {
        let mut assets = Vec::new();
        for template in self.list_templates()? {
            assets.extend(self.extract_file(&template, write)?);
        }
        tracing::debug!("extracted {} inline assets", assets.len());
        Ok(assets)
    }

    /// Extract and register the inline assets of one template.
    pub fn extract_file(&self, template: &TemplateFile, write: bool) -> Result<Vec<InlineAsset>> {
        let source =
            std::fs::read_to_string(&template.path).map_err(|e| Error::path_io(&template.path, e))?;
        if !has_inline_assets(&source) {
            return Ok(Vec::new());
        }

        let extracted = extract_inline_assets(&template.name, &source)?;
        for asset in &extracted.assets {
            self.pipeline.register_inline_asset(asset, write)?;
        }
        Ok(extracted.assets)
    }

    /// Template for a file path inside one of the folders.
    pub fn template_for_path(&self, path: &Path) -> Option<TemplateFile> {
        let exts = &self.pipeline.config().inline_template_exts;
        if !has_extension(path, exts) {
            return None;
        }
        self.folders.iter().find_map(|folder| {
            path.strip_prefix(folder).ok().map(|relative| TemplateFile {
                name: relative.to_string_lossy().replace('\\', "/"),
                path: path.to_path_buf(),
            })
        })
    }
}

fn has_extension(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| exts.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Turn `{% asset_tags %}` (and `{% asset_tags nonce=x %}`) into an expression.
pub fn rewrite_asset_tags(source: &str) -> String {
    ASSET_TAGS_STMT
        .replace_all(source, |caps: &regex::Captures<'_>| {
            let args = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            format!("{{{{ asset_tags({}) }}}}", args)
        })
        .into_owned()
}

fn current_page(state: &State<'_, '_>) -> std::result::Result<PageAssets, minijinja::Error> {
    state
        .lookup(PAGE_VAR)
        .and_then(|value| value.downcast_object_ref::<PageAssets>().cloned())
        .ok_or_else(|| {
            minijinja::Error::new(
                ErrorKind::InvalidOperation,
                "asset functions are only available when rendering a page",
            )
        })
}

fn references(value: &Value) -> std::result::Result<Vec<String>, minijinja::Error> {
    if let Some(reference) = value.as_str() {
        return Ok(vec![reference.to_string()]);
    }
    value
        .try_iter()?
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                minijinja::Error::new(ErrorKind::InvalidOperation, "asset references must be strings")
            })
        })
        .collect()
}

fn include_asset(
    state: &State<'_, '_>,
    reference: Value,
    priority: Option<i32>,
    kwargs: Kwargs,
) -> std::result::Result<String, minijinja::Error> {
    let priority = match kwargs.get::<Option<i32>>("priority")? {
        Some(priority) => priority,
        None => priority.unwrap_or(DEFAULT_PRIORITY),
    };
    kwargs.assert_all_used()?;

    current_page(state)?.include(&references(&reference)?, priority);
    Ok(String::new())
}

fn asset_url(
    state: &State<'_, '_>,
    reference: String,
    kwargs: Kwargs,
) -> std::result::Result<String, minijinja::Error> {
    let external = kwargs.get::<Option<bool>>("external")?.unwrap_or(false);
    kwargs.assert_all_used()?;

    let page = current_page(state)?;
    Ok(page.url(&reference, external).unwrap_or(reference))
}

fn asset_tags(state: &State<'_, '_>, kwargs: Kwargs) -> std::result::Result<Value, minijinja::Error> {
    let nonce = kwargs.get::<Option<String>>("nonce")?;
    kwargs.assert_all_used()?;

    current_page(state)?.set_nonce(nonce);
    Ok(Value::from_safe_string(ASSET_TAGS_MARKER.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use minijinja::context;
    use tempfile::TempDir;

    fn setup(config: PipelineConfig) -> (TempDir, TemplateAssets) {
        let temp = TempDir::new().unwrap();
        let pipeline = Arc::new(
            AssetsPipeline::new(PipelineConfig {
                root_path: temp.path().to_path_buf(),
                ..config
            })
            .unwrap(),
        );
        let templates = TemplateAssets::from_pipeline(pipeline);
        std::fs::create_dir_all(temp.path().join("templates")).unwrap();
        (temp, templates)
    }

    fn write(temp: &TempDir, name: &str, content: &str) {
        let path = temp.path().join("templates").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_rewrite_asset_tags() {
        assert_eq!(rewrite_asset_tags("{% asset_tags %}"), "{{ asset_tags() }}");
        assert_eq!(
            rewrite_asset_tags("<head>{%- asset_tags nonce=csp -%}</head>"),
            "<head>{{ asset_tags(nonce=csp) }}</head>"
        );
        assert_eq!(rewrite_asset_tags("{{ asset_tags() }}"), "{{ asset_tags() }}");
    }

    #[test]
    fn test_asset_tags_deferred_until_end_of_render() {
        let (temp, templates) = setup(PipelineConfig::default());
        write(&temp, "base.html", "<head>{% asset_tags %}</head>{% block body %}{% endblock %}");
        write(
            &temp,
            "page.html",
            r#"{% extends "base.html" %}{% block body %}{{ include_asset("https://esm.sh/lit") }}<p>{{ title }}</p>{% endblock %}"#,
        );

        let env = templates.environment();
        let page = templates.pipeline().page();
        let html = templates
            .render_page(&env, "page.html", context! { title => "Hi" }, &page)
            .unwrap();
        assert_eq!(
            html,
            r#"<head><script src="https://esm.sh/lit" crossorigin="anonymous"></script></head><p>Hi</p>"#
        );
    }

    #[test]
    fn test_asset_url_and_static_url() {
        let (temp, templates) = setup(PipelineConfig::default());
        write(&temp, "urls.html", r#"{{ asset_url("app.js") }} {{ static_url("img/logo.png") }}"#);

        let env = templates.environment();
        let page = templates.pipeline().page();
        let html = templates.render_page(&env, "urls.html", context! {}, &page).unwrap();
        assert_eq!(html, "/static/app.js /static/img/logo.png");
    }

    #[test]
    fn test_functions_require_a_page() {
        let (temp, templates) = setup(PipelineConfig::default());
        write(&temp, "plain.html", r#"{{ include_asset("app.js") }}"#);
        let env = templates.environment();
        let template = env.get_template("plain.html").unwrap();
        assert!(template.render(context! {}).is_err());
    }

    #[test]
    fn test_inline_assets_extracted_on_load() {
        let (temp, templates) = setup(PipelineConfig {
            inline: true,
            include_inline_on_demand: true,
            ..PipelineConfig::default()
        });
        write(
            &temp,
            "home.html",
            "{% asset_tags %}<script bundle>console.log(1)</script>",
        );

        let env = templates.environment();
        let page = templates.pipeline().page();
        let html = templates.render_page(&env, "home.html", context! {}, &page).unwrap();
        assert_eq!(html, r#"<script src="/static/home.js"></script>"#);
        assert!(templates.pipeline().bundles().contains("home.js"));
        // rendering never writes inline assets
        assert!(!temp.path().join("static/home.js").exists());
    }

    #[test]
    fn test_extract_all_writes_assets() {
        let (temp, templates) = setup(PipelineConfig {
            inline: true,
            ..PipelineConfig::default()
        });
        write(&temp, "pages/a.html", "<style bundle>body{}</style>");
        write(&temp, "pages/b.html", "<p>no assets</p>");
        write(&temp, "notes.txt", "<script bundle>x</script>");

        let assets = templates.extract_all(true).unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].filename, "pages/a.css");
        assert_eq!(
            std::fs::read_to_string(temp.path().join("static/pages/a.css")).unwrap(),
            "body{}"
        );
        assert_eq!(templates.pipeline().includes().ordered(), vec!["pages/a.css"]);
    }

    #[test]
    fn test_list_templates_and_path_lookup() {
        let (temp, templates) = setup(PipelineConfig::default());
        write(&temp, "a.html", "");
        write(&temp, "sub/b.HTML", "");
        write(&temp, "c.txt", "");

        let names: Vec<_> = templates
            .list_templates()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["a.html", "sub/b.HTML"]);

        let found = templates
            .template_for_path(&temp.path().join("templates/sub/b.HTML"))
            .unwrap();
        assert_eq!(found.name, "sub/b.HTML");
        assert!(templates.template_for_path(&temp.path().join("other/x.html")).is_none());
        assert!(templates.find("../secrets.html").is_none());
    }
}
