//! Browser import map: bare module specifiers to URLs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::manifest::Manifest;
use crate::tags::escape_attr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportMap {
    imports: IndexMap<String, String>,
}

impl ImportMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.imports.insert(name.into(), url.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.imports.get(name).map(String::as_str)
    }

    /// Map every manifest entry declaring `map_as`.
    pub fn extend_from_manifest(&mut self, manifest: &Manifest) {
        for (alias, url) in manifest.aliases() {
            self.insert(alias, url);
        }
    }

    /// Map packages bundled to `{output_url}/vendor/{name}.js`.
    ///
    /// Packages are written `name` or `name:input`.
    pub fn expose_node_packages(&mut self, packages: &[String], output_url: &str) {
        for package in packages {
            let name = package_name(package);
            self.insert(
                name,
                format!("{}/vendor/{}.js", output_url.trim_end_matches('/'), name),
            );
        }
    }

    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
    }

    pub fn len(&self) -> usize {
        self.imports.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.imports.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// `{"imports": {...}}` as JSON.
    pub fn to_json(&self) -> String {
        serde_json::json!({ "imports": self.imports }).to_string()
    }

    /// Render the `<script type="importmap">` element.
    pub fn to_script(&self, nonce: Option<&str>) -> String {
        let nonce = nonce
            .map(|nonce| format!(" nonce=\"{}\"", escape_attr(nonce)))
            .unwrap_or_default();
        format!(
            "<script type=\"importmap\"{}>{}</script>",
            nonce,
            self.to_json().replace("</", "<\\/")
        )
    }
}

/// Name part of an exposed package declaration (`name` or `name:input`).
pub fn package_name(package: &str) -> &str {
    package
        .split_once(':')
        .map(|(name, _)| name)
        .unwrap_or(package)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestEntry;

    #[test]
    fn test_expose_node_packages() {
        let mut map = ImportMap::new();
        map.expose_node_packages(
            &["htmx.org".to_string(), "lit:export * from 'lit'".to_string()],
            "/static/dist/",
        );
        assert_eq!(map.get("htmx.org"), Some("/static/dist/vendor/htmx.org.js"));
        assert_eq!(map.get("lit"), Some("/static/dist/vendor/lit.js"));
    }

    #[test]
    fn test_extend_from_manifest() {
        let mut manifest = Manifest::new();
        manifest.push(
            "components/button.js",
            ManifestEntry::with_meta("/static/components/button-abc.js", "map_as", "button"),
        );
        manifest.push("app.css", "/static/app.css".into());

        let mut map = ImportMap::new();
        map.extend_from_manifest(&manifest);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("button"), Some("/static/components/button-abc.js"));
    }

    #[test]
    fn test_to_script() {
        let mut map = ImportMap::new();
        map.insert("vue", "https://esm.sh/vue@3");
        assert_eq!(
            map.to_script(None),
            r#"<script type="importmap">{"imports":{"vue":"https://esm.sh/vue@3"}}</script>"#
        );
        assert!(map.to_script(Some("r4nd")).starts_with(r#"<script type="importmap" nonce="r4nd">"#));
    }
}
