//! Include entries: asset references with an optional directive prefix.
//!
//! A reference like `preload as font fonts/inter.woff2#crossorigin=anonymous`
//! carries three things: the directive (`preload`), an explicit preload type
//! (`font`) and fragment attributes rendered onto the HTML tag.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

static DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(static|import|prefetch|modulepreload|preload(?: as ([a-z]+))?) ")
        .expect("directive regex is valid")
});

static ABS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.\-]*:)?//").expect("absolute URL regex is valid")
});

/// Meta keys that steer rendering and never become HTML attributes.
pub const MODIFIER_KEY: &str = "modifier";
pub const CONTENT_TYPE_KEY: &str = "content_type";
pub const MAP_AS_KEY: &str = "map_as";

/// Whether a reference is an absolute (or protocol-relative) URL.
pub fn is_abs_url(reference: &str) -> bool {
    ABS_URL_RE.is_match(reference)
}

/// How an include entry is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    /// Resolve against the static folder even when a separate assets folder is served
    Static,
    /// `<script type="module">`
    Import,
    /// `<link rel="prefetch">`
    Prefetch,
    /// `<link rel="modulepreload">`
    ModulePreload,
    /// `<link rel="preload" as="...">`
    Preload,
}

impl Modifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modifier::Static => "static",
            Modifier::Import => "import",
            Modifier::Prefetch => "prefetch",
            Modifier::ModulePreload => "modulepreload",
            Modifier::Preload => "preload",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(Modifier::Static),
            "import" => Some(Modifier::Import),
            "prefetch" => Some(Modifier::Prefetch),
            "modulepreload" => Some(Modifier::ModulePreload),
            "preload" => Some(Modifier::Preload),
            _ => None,
        }
    }

    /// Rendered as a `<link>` ahead of scripts and stylesheets.
    pub fn is_preload_like(&self) -> bool {
        matches!(
            self,
            Modifier::Prefetch | Modifier::ModulePreload | Modifier::Preload
        )
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Infer the `as` attribute of a preload link from a file extension.
pub fn preload_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "css" => "style",
        "js" => "script",
        "png" | "jpg" | "jpeg" | "gif" | "webp" | "svg" => "image",
        "woff" | "woff2" | "ttf" | "otf" => "font",
        "mp4" | "webm" | "ogg" => "video",
        "mp3" | "wav" | "flac" | "aac" => "audio",
        _ => "fetch",
    }
}

/// A parsed include reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeEntry {
    /// Logical asset name, path or URL without directive and fragment
    pub reference: String,
    pub modifier: Option<Modifier>,
    /// Preload `as` type
    pub content_type: Option<String>,
    /// Extra HTML attributes (crossorigin, integrity, nonce...)
    pub attributes: IndexMap<String, String>,
}

impl IncludeEntry {
    /// Parse a raw include string.
    ///
    /// ```
    /// use assetpipe_core::directive::{IncludeEntry, Modifier};
    ///
    /// let entry = IncludeEntry::parse("preload fonts/inter.woff2#crossorigin=anonymous");
    /// assert_eq!(entry.reference, "fonts/inter.woff2");
    /// assert_eq!(entry.modifier, Some(Modifier::Preload));
    /// assert_eq!(entry.content_type.as_deref(), Some("font"));
    /// assert_eq!(entry.attributes["crossorigin"], "anonymous");
    /// ```
    pub fn parse(raw: &str) -> Self {
        let mut modifier = None;
        let mut content_type = None;
        let mut rest = raw;

        if let Some(caps) = DIRECTIVE_RE.captures(raw) {
            let directive = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            rest = &raw[caps.get(0).map(|m| m.end()).unwrap_or_default()..];

            if let Some(explicit) = caps.get(2) {
                modifier = Some(Modifier::Preload);
                content_type = Some(explicit.as_str().to_string());
            } else {
                modifier = Modifier::parse(directive);
            }
        }

        let mut entry = Self::from_reference(rest);
        if modifier == Some(Modifier::Preload) && content_type.is_none() {
            content_type = Some(preload_type_for(&entry.reference).to_string());
        }
        entry.modifier = modifier;
        entry.content_type = content_type;
        entry
    }

    /// Build an entry from a reference and explicit meta, bypassing directive parsing.
    ///
    /// Meta keys `modifier` and `content_type` are lifted into their fields,
    /// everything else becomes an attribute.
    pub fn with_meta(reference: &str, meta: &IndexMap<String, String>) -> Self {
        let mut entry = Self::from_reference(reference);
        for (key, value) in meta {
            entry.apply_meta(key, value);
        }
        entry
    }

    /// Overlay a single meta key.
    pub fn apply_meta(&mut self, key: &str, value: &str) {
        match key {
            MODIFIER_KEY => {
                self.modifier = Modifier::parse(value);
                if self.modifier == Some(Modifier::Preload) && self.content_type.is_none() {
                    self.content_type = Some(preload_type_for(&self.reference).to_string());
                }
            }
            CONTENT_TYPE_KEY => self.content_type = Some(value.to_string()),
            MAP_AS_KEY => {}
            _ => {
                self.attributes.insert(key.to_string(), value.to_string());
            }
        }
    }

    fn from_reference(reference: &str) -> Self {
        let (reference, attributes) = match reference.split_once('#') {
            Some((path, fragment)) => {
                let attributes = url::form_urlencoded::parse(fragment.as_bytes())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                (path, attributes)
            }
            None => (reference, IndexMap::new()),
        };

        Self {
            reference: reference.to_string(),
            modifier: None,
            content_type: None,
            attributes,
        }
    }
}
