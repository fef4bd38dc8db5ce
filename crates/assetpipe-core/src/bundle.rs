//! Bundle declarations submitted to esbuild.
//!
//! A bundle file is written as `path`, `path=outfile` or an absolute URL.
//! Scoped bundles (named `@scope`) resolve their files against their own
//! folder and emit their outputs under `scope/`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::config::BundleSpec;
use crate::directive::is_abs_url;
use crate::error::{Error, Result};

/// Folder and output prefix of a scoped bundle.
#[derive(Debug, Clone, Copy)]
pub struct Scope<'a> {
    pub assets_folder: &'a Path,
    pub output_prefix: &'a str,
}

/// A single file of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFile {
    /// Logical name: the include reference and the manifest key
    pub path: String,
    /// Output name handed to esbuild as `outfile=path`
    pub outfile: Option<String>,
    /// Name relative to the folder it was declared in
    pub filename: String,
}

impl BundleFile {
    /// Parse a plain bundle file reference.
    pub fn parse(raw: &str) -> Self {
        if is_abs_url(raw) {
            return Self {
                path: raw.to_string(),
                outfile: None,
                filename: raw.to_string(),
            };
        }

        let (path, outfile) = match raw.split_once('=') {
            Some((path, outfile)) => (path, Some(outfile.to_string())),
            None => (raw, None),
        };

        Self {
            path: path.to_string(),
            outfile,
            filename: path.to_string(),
        }
    }

    /// Parse a file reference declared inside a scope.
    pub fn scoped(raw: &str, scope: Scope<'_>) -> Self {
        let mut file = Self::parse(raw);
        if file.is_abs_url() {
            return file;
        }

        if Path::new(&file.path).is_relative() {
            let absolute = path_clean::clean(scope.assets_folder.join(&file.path));
            if file.outfile.is_none() {
                file.outfile = Some(strip_extension(&file.path).to_string());
            }
            file.path = absolute.to_string_lossy().into_owned();
        }

        let outfile = file
            .outfile
            .take()
            .unwrap_or_else(|| strip_extension(&file.filename).to_string());
        file.outfile = Some(format!(
            "{}/{}",
            scope.output_prefix.trim_end_matches('/'),
            outfile
        ));
        file
    }

    pub fn is_abs_url(&self) -> bool {
        is_abs_url(&self.path)
    }

    /// Location handed to esbuild: URLs and absolute paths as is, else under `assets_folder`.
    pub fn resolve_path(&self, assets_folder: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if self.is_abs_url() || path.is_absolute() {
            path.to_path_buf()
        } else {
            assets_folder.join(path)
        }
    }

    /// Entry point argument for esbuild (`outfile=path` when an outfile is declared).
    pub fn entrypoint_arg(&self, assets_folder: &Path) -> String {
        let path = self.resolve_path(assets_folder);
        match &self.outfile {
            Some(outfile) => format!("{}={}", outfile, path.display()),
            None => path.display().to_string(),
        }
    }
}

fn strip_extension(path: &str) -> &str {
    match path.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() && !stem.ends_with('/') => stem,
        _ => path,
    }
}

/// Named bundles in declaration order. Names are unique keys.
#[derive(Debug, Clone, Default)]
pub struct BundleRegistry {
    bundles: IndexMap<String, Vec<BundleFile>>,
}

impl BundleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a named bundle, replacing any previous declaration.
    pub fn declare(&mut self, name: &str, files: &[String], scope: Option<Scope<'_>>) {
        let files: Vec<BundleFile> = files
            .iter()
            .map(|raw| match scope {
                Some(scope) => BundleFile::scoped(raw, scope),
                None => BundleFile::parse(raw),
            })
            .collect();

        if self.bundles.insert(name.to_string(), files).is_some() {
            tracing::debug!("bundle '{}' redeclared, replacing its files", name);
        }
    }

    /// Declare a bundle per file, each named after its file.
    pub fn declare_each(&mut self, files: &[String], scope: Option<Scope<'_>>) -> Vec<String> {
        files
            .iter()
            .map(|file| {
                self.declare(file, std::slice::from_ref(file), scope);
                file.clone()
            })
            .collect()
    }

    /// Declare bundles from configuration. Returns the declared names.
    pub fn declare_spec(
        &mut self,
        spec: &BundleSpec,
        name: Option<&str>,
        scope: Option<Scope<'_>>,
    ) -> Vec<String> {
        match (spec, name) {
            (BundleSpec::Named(bundles), _) => bundles
                .iter()
                .map(|(name, files)| {
                    self.declare(name, files, scope);
                    name.clone()
                })
                .collect(),
            (BundleSpec::List(files), Some(name)) => {
                self.declare(name, files, scope);
                vec![name.to_string()]
            }
            (BundleSpec::List(files), None) => self.declare_each(files, scope),
        }
    }

    /// Append a file to an existing bundle.
    pub fn append(&mut self, name: &str, file: BundleFile) -> Result<()> {
        self.bundles
            .get_mut(name)
            .map(|files| {
                if !files.contains(&file) {
                    files.push(file);
                }
            })
            .ok_or_else(|| Error::UnknownBundle(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bundles.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bundles.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bundles.keys().map(String::as_str)
    }

    /// Files of one bundle, or of every bundle when `name` is `None`.
    pub fn files(&self, name: Option<&str>) -> Result<Vec<&BundleFile>> {
        match name {
            Some(name) => self
                .bundles
                .get(name)
                .map(|files| files.iter().collect())
                .ok_or_else(|| Error::UnknownBundle(name.to_string())),
            None => Ok(self.bundles.values().flatten().collect()),
        }
    }

    /// Logical entry names of one bundle, or of every bundle.
    pub fn entrypoints(&self, name: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .files(name)?
            .into_iter()
            .map(|file| file.path.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_plain_and_outfile() {
        let file = BundleFile::parse("app.js");
        assert_eq!(file.path, "app.js");
        assert!(file.outfile.is_none());

        let file = BundleFile::parse("pages/home.js=home");
        assert_eq!(file.path, "pages/home.js");
        assert_eq!(file.outfile.as_deref(), Some("home"));
        assert_eq!(file.filename, "pages/home.js");
    }

    #[test]
    fn test_parse_abs_url_keeps_equals() {
        let file = BundleFile::parse("https://esm.sh/lib?dep=1");
        assert_eq!(file.path, "https://esm.sh/lib?dep=1");
        assert!(file.outfile.is_none());
        assert!(file.is_abs_url());
    }

    #[test]
    fn test_scoped_file() {
        let scope = Scope {
            assets_folder: Path::new("/app/admin/static"),
            output_prefix: "admin",
        };
        let file = BundleFile::scoped("admin.js", scope);
        assert_eq!(file.path, "/app/admin/static/admin.js");
        assert_eq!(file.outfile.as_deref(), Some("admin/admin"));
        assert_eq!(file.filename, "admin.js");
    }

    #[test]
    fn test_resolve_path() {
        let assets = Path::new("/app/assets");
        assert_eq!(
            BundleFile::parse("app.js").resolve_path(assets),
            PathBuf::from("/app/assets/app.js")
        );
        assert_eq!(
            BundleFile::parse("/abs/app.js").resolve_path(assets),
            PathBuf::from("/abs/app.js")
        );
        assert_eq!(
            BundleFile::parse("app.js=main").entrypoint_arg(assets),
            "main=/app/assets/app.js"
        );
    }

    #[test]
    fn test_declare_each_names_bundles_after_files() {
        let mut registry = BundleRegistry::new();
        let names = registry.declare_each(&strings(&["base.js", "page.js"]), None);
        assert_eq!(names, vec!["base.js", "page.js"]);
        assert_eq!(registry.entrypoints(Some("page.js")).unwrap(), vec!["page.js"]);
        assert_eq!(
            registry.entrypoints(None).unwrap(),
            vec!["base.js", "page.js"]
        );
    }

    #[test]
    fn test_declare_spec_named() {
        let mut registry = BundleRegistry::new();
        let mut map = IndexMap::new();
        map.insert("main".to_string(), strings(&["a.js", "b.css"]));
        let names = registry.declare_spec(&BundleSpec::Named(map), None, None);
        assert_eq!(names, vec!["main"]);
        assert_eq!(registry.files(Some("main")).unwrap().len(), 2);
    }

    #[test]
    fn test_redeclare_replaces_files() {
        let mut registry = BundleRegistry::new();
        registry.declare("main", &strings(&["a.js"]), None);
        registry.declare("main", &strings(&["b.js"]), None);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entrypoints(Some("main")).unwrap(), vec!["b.js"]);
    }

    #[test]
    fn test_append_and_unknown_bundle() {
        let mut registry = BundleRegistry::new();
        registry.declare("main", &strings(&["a.js"]), None);
        registry.append("main", BundleFile::parse("b.js")).unwrap();
        registry.append("main", BundleFile::parse("b.js")).unwrap();
        assert_eq!(registry.entrypoints(Some("main")).unwrap(), vec!["a.js", "b.js"]);

        let err = registry.append("missing", BundleFile::parse("c.js")).unwrap_err();
        assert!(matches!(err, Error::UnknownBundle(name) if name == "missing"));
        assert!(registry.files(Some("missing")).is_err());
    }
}
