//! Resolution of include references to URLs.

use indexmap::IndexMap;

use crate::config::{AssetsEndpoint, Layout};
use crate::directive::{is_abs_url, IncludeEntry, Modifier};
use crate::manifest::{Manifest, ManifestEntry};

/// A URL ready to be rendered, with its rendering hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub url: String,
    pub modifier: Option<Modifier>,
    pub content_type: Option<String>,
    pub attributes: IndexMap<String, String>,
}

/// Turns references into URLs using the manifest and the URL layout.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    static_url_path: String,
    assets_url_path: String,
    assets_endpoint: AssetsEndpoint,
    cdn_host: Option<String>,
    base_url: Option<String>,
}

impl AssetResolver {
    pub fn new(layout: &Layout) -> Self {
        Self {
            static_url_path: layout.static_url_path.clone(),
            assets_url_path: layout.assets_url_path.clone(),
            assets_endpoint: layout.assets_endpoint,
            cdn_host: layout.cdn_host.clone(),
            base_url: layout.base_url.clone(),
        }
    }

    /// Resolve one raw reference to its URLs.
    ///
    /// Meta from the manifest overlays the directive and fragment meta.
    /// `external` prefixes the base URL to relative names when no CDN host
    /// is in use; manifest URLs that are already absolute paths stay as is.
    pub fn resolve(&self, raw: &str, manifest: &Manifest, external: bool) -> Vec<ResolvedAsset> {
        self.resolve_entry(&IncludeEntry::parse(raw), manifest, external)
    }

    pub fn resolve_entry(
        &self,
        entry: &IncludeEntry,
        manifest: &Manifest,
        external: bool,
    ) -> Vec<ResolvedAsset> {
        let mut resolved: IndexMap<String, ResolvedAsset> = IndexMap::new();

        for output in manifest.resolve(&entry.reference) {
            let mut meta = entry.clone();
            if let ManifestEntry::WithMeta(_, extra) = &output {
                for (key, value) in extra {
                    meta.apply_meta(key, value);
                }
            }

            let url = self.url_for(output.url(), meta.modifier, &mut meta.attributes, external);
            resolved.insert(
                url.clone(),
                ResolvedAsset {
                    url,
                    modifier: meta.modifier,
                    content_type: meta.content_type,
                    attributes: meta.attributes,
                },
            );
        }

        resolved.into_values().collect()
    }

    /// Resolve many references. A repeated URL keeps its first position and
    /// takes the hints of its last occurrence.
    pub fn resolve_all<S: AsRef<str>>(
        &self,
        refs: &[S],
        manifest: &Manifest,
        external: bool,
    ) -> Vec<ResolvedAsset> {
        let mut resolved: IndexMap<String, ResolvedAsset> = IndexMap::new();
        for raw in refs {
            for asset in self.resolve(raw.as_ref(), manifest, external) {
                resolved.insert(asset.url.clone(), asset);
            }
        }
        resolved.into_values().collect()
    }

    fn url_for(
        &self,
        url: &str,
        modifier: Option<Modifier>,
        attributes: &mut IndexMap<String, String>,
        external: bool,
    ) -> String {
        if is_abs_url(url) {
            attributes
                .entry("crossorigin".to_string())
                .or_insert_with(|| "anonymous".to_string());
            return url.to_string();
        }

        if url.starts_with('/') {
            return match &self.cdn_host {
                Some(host) => format!("{}{}", host, url),
                None => url.to_string(),
            };
        }

        let prefix = match (modifier, self.assets_endpoint) {
            (Some(Modifier::Static), _) | (_, AssetsEndpoint::Static) => &self.static_url_path,
            (_, AssetsEndpoint::Assets) => &self.assets_url_path,
        };
        let url = format!("{}/{}", prefix, url);

        match (&self.cdn_host, &self.base_url) {
            (Some(host), _) => format!("{}{}", host, url),
            (None, Some(base)) if external => format!("{}{}", base, url),
            _ => url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use std::path::PathBuf;

    fn resolver(config: PipelineConfig) -> AssetResolver {
        AssetResolver::new(&config.layout())
    }

    fn manifest() -> Manifest {
        serde_json::from_str(
            r#"{
                "app.js": [
                    ["/static/dist/app-AAAA.js", {"modifier": "import"}],
                    "/static/dist/app-BBBB.css"
                ],
                "logo.png": ["img/logo-1234567890.png"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_manifest_outputs_with_meta() {
        let resolved = resolver(PipelineConfig::default()).resolve("app.js", &manifest(), false);
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].url, "/static/dist/app-AAAA.js");
        assert_eq!(resolved[0].modifier, Some(Modifier::Import));
        assert_eq!(resolved[1].url, "/static/dist/app-BBBB.css");
        assert!(resolved[1].modifier.is_none());
    }

    #[test]
    fn test_relative_names_use_static_path() {
        let resolved = resolver(PipelineConfig::default()).resolve("logo.png", &manifest(), false);
        assert_eq!(resolved[0].url, "/static/img/logo-1234567890.png");

        let resolved = resolver(PipelineConfig::default()).resolve("css/site.css", &Manifest::new(), false);
        assert_eq!(resolved[0].url, "/static/css/site.css");
    }

    #[test]
    fn test_separate_assets_folder_in_debug() {
        let config = PipelineConfig {
            root_path: PathBuf::from("/app"),
            assets_folder: Some(PathBuf::from("assets")),
            debug: true,
            ..PipelineConfig::default()
        };
        let resolver = resolver(config);
        let empty = Manifest::new();
        assert_eq!(resolver.resolve("app.js", &empty, false)[0].url, "/static/assets/app.js");
        assert_eq!(resolver.resolve("static robots.txt", &empty, false)[0].url, "/static/robots.txt");
    }

    #[test]
    fn test_abs_url_gets_crossorigin() {
        let resolved = resolver(PipelineConfig::default()).resolve(
            "import https://esm.sh/htmx.org",
            &Manifest::new(),
            false,
        );
        assert_eq!(resolved[0].url, "https://esm.sh/htmx.org");
        assert_eq!(resolved[0].attributes["crossorigin"], "anonymous");

        let resolved = resolver(PipelineConfig::default()).resolve(
            "https://esm.sh/lit#crossorigin=use-credentials",
            &Manifest::new(),
            false,
        );
        assert_eq!(resolved[0].attributes["crossorigin"], "use-credentials");
    }

    #[test]
    fn test_cdn_host_and_external() {
        let config = PipelineConfig {
            cdn_host: Some("https://cdn.example.com".to_string()),
            base_url: Some("https://example.com".to_string()),
            ..PipelineConfig::default()
        };
        let resolved = resolver(config.clone()).resolve("app.js", &manifest(), true);
        assert_eq!(resolved[0].url, "https://cdn.example.com/static/dist/app-AAAA.js");

        let debug = PipelineConfig {
            debug: true,
            ..config
        };
        let resolved = resolver(debug.clone()).resolve("site.css", &Manifest::new(), true);
        assert_eq!(resolved[0].url, "https://example.com/static/site.css");
        let resolved = resolver(debug.clone()).resolve("site.css", &Manifest::new(), false);
        assert_eq!(resolved[0].url, "/static/site.css");

        // Built URLs are absolute paths already
        let resolved = resolver(debug.clone()).resolve("app.js", &manifest(), true);
        assert_eq!(resolved[0].url, "/static/dist/app-AAAA.js");
        let resolved = resolver(debug).resolve("logo.png", &manifest(), true);
        assert_eq!(resolved[0].url, "https://example.com/static/img/logo-1234567890.png");
    }

    #[test]
    fn test_resolve_all_dedupes() {
        let resolved = resolver(PipelineConfig::default()).resolve_all(
            &["app.js", "prefetch /static/dist/app-BBBB.css", "app.js"],
            &manifest(),
            false,
        );
        let urls: Vec<_> = resolved.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["/static/dist/app-AAAA.js", "/static/dist/app-BBBB.css"]);
        assert_eq!(resolved[0].modifier, Some(Modifier::Import));
        assert!(resolved[1].modifier.is_none());
    }

    #[test]
    fn test_repeated_url_takes_last_hints() {
        let resolved = resolver(PipelineConfig::default()).resolve_all(
            &["app.js", "site.css", "preload app.js"],
            &Manifest::new(),
            false,
        );
        let urls: Vec<_> = resolved.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(urls, vec!["/static/app.js", "/static/site.css"]);
        assert_eq!(resolved[0].modifier, Some(Modifier::Preload));
        assert_eq!(resolved[0].content_type.as_deref(), Some("script"));
    }
}
