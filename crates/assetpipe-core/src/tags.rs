//! HTML tag rendering for resolved assets.

use std::fmt::Write as _;

use crate::directive::Modifier;
use crate::import_map::ImportMap;
use crate::resolver::ResolvedAsset;

/// Client connecting to the live-reload server. Reloads 200ms after the last change event.
const LIVERELOAD_SCRIPT: &str = r#"<script{nonce}>
let livereloadTimeout;
new EventSource('http://localhost:{port}').addEventListener('change', () => {
    if (livereloadTimeout) {
        clearTimeout(livereloadTimeout);
    }
    livereloadTimeout = setTimeout(() => {
        window.location.reload();
    }, 200);
});
</script>"#;

const SERVICE_WORKER_SCRIPT: &str = "<script{nonce}>if ('serviceWorker' in navigator) { navigator.serviceWorker.register('{url}'); }</script>";

/// Escape a value for a double-quoted HTML attribute.
pub fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn nonce_attr(nonce: Option<&str>) -> String {
    nonce
        .map(|nonce| format!(" nonce=\"{}\"", escape_attr(nonce)))
        .unwrap_or_default()
}

/// The live-reload client for a port.
pub fn livereload_script(port: u16, nonce: Option<&str>) -> String {
    LIVERELOAD_SCRIPT
        .replace("{nonce}", &nonce_attr(nonce))
        .replace("{port}", &port.to_string())
}

/// Registration of the cache service worker.
pub fn service_worker_script(url: &str, nonce: Option<&str>) -> String {
    SERVICE_WORKER_SCRIPT
        .replace("{nonce}", &nonce_attr(nonce))
        .replace("{url}", &url.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Inputs of [`render_tags`] beyond the assets themselves.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagOptions<'a> {
    pub import_map: Option<&'a ImportMap>,
    /// Port of the live-reload server, set in debug mode
    pub livereload_port: Option<u16>,
    /// URL of the cache service worker to register
    pub service_worker: Option<&'a str>,
    /// CSP nonce for inline scripts
    pub nonce: Option<&'a str>,
}

/// Render assets as HTML, one tag per line.
///
/// Preload links come first, then the import map, then scripts and
/// stylesheets in order, then the service worker registration and the
/// live-reload client.
pub fn render_tags(assets: &[ResolvedAsset], options: TagOptions<'_>) -> String {
    let mut pre = Vec::new();
    let mut tags = Vec::new();

    if let Some(import_map) = options.import_map.filter(|map| !map.is_empty()) {
        tags.push(import_map.to_script(options.nonce));
    }

    for asset in assets {
        let url = escape_attr(&asset.url);
        let mut attrs = String::new();
        for (key, value) in asset.attributes.iter().filter(|(_, v)| !v.is_empty()) {
            let _ = write!(attrs, " {}=\"{}\"", key, escape_attr(value));
        }

        match asset.modifier {
            Some(Modifier::Prefetch) => {
                pre.push(format!("<link rel=\"prefetch\" href=\"{}\"{}>", url, attrs));
            }
            Some(Modifier::Preload) => {
                let content_type = asset.content_type.as_deref().unwrap_or("fetch");
                pre.push(format!(
                    "<link rel=\"preload\" href=\"{}\" as=\"{}\"{}>",
                    url,
                    escape_attr(content_type),
                    attrs
                ));
            }
            Some(Modifier::ModulePreload) => {
                pre.push(format!("<link rel=\"modulepreload\" href=\"{}\"{}>", url, attrs));
            }
            Some(Modifier::Import) => {
                tags.push(format!(
                    "<script src=\"{}\" type=\"module\"{}></script>",
                    url, attrs
                ));
            }
            _ if asset.url.ends_with(".css") || asset.content_type.as_deref() == Some("style") => {
                tags.push(format!("<link rel=\"stylesheet\" href=\"{}\"{}>", url, attrs));
            }
            _ => tags.push(format!("<script src=\"{}\"{}></script>", url, attrs)),
        }
    }

    if let Some(url) = options.service_worker {
        tags.push(service_worker_script(url, options.nonce));
    }
    if let Some(port) = options.livereload_port {
        tags.push(livereload_script(port, options.nonce));
    }

    pre.extend(tags);
    pre.join("\n")
}
