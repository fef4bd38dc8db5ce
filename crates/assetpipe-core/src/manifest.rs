//! The mapping file: logical asset names to built URLs.
//!
//! ```json
//! {
//!   "app.js": [
//!     ["/static/dist/app-5FGHS2.js", {"modifier": "import"}],
//!     "/static/dist/app-K2LQ7A.css"
//!   ]
//! }
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::directive::{MAP_AS_KEY, MODIFIER_KEY};
use crate::error::{Error, Result};

/// One built output of a logical asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestEntry {
    Url(String),
    WithMeta(String, IndexMap<String, String>),
}

impl ManifestEntry {
    pub fn with_meta(url: impl Into<String>, key: &str, value: impl Into<String>) -> Self {
        let mut meta = IndexMap::new();
        meta.insert(key.to_string(), value.into());
        ManifestEntry::WithMeta(url.into(), meta)
    }

    pub fn with_modifier(url: impl Into<String>, modifier: &str) -> Self {
        Self::with_meta(url, MODIFIER_KEY, modifier)
    }

    pub fn url(&self) -> &str {
        match self {
            ManifestEntry::Url(url) | ManifestEntry::WithMeta(url, _) => url,
        }
    }

    pub fn meta(&self) -> Option<&IndexMap<String, String>> {
        match self {
            ManifestEntry::Url(_) => None,
            ManifestEntry::WithMeta(_, meta) => Some(meta),
        }
    }

    /// Import map alias declared with `map_as`.
    pub fn map_as(&self) -> Option<&str> {
        self.meta()
            .and_then(|meta| meta.get(MAP_AS_KEY))
            .map(String::as_str)
            .filter(|alias| !alias.is_empty())
    }
}

impl From<&str> for ManifestEntry {
    fn from(url: &str) -> Self {
        ManifestEntry::Url(url.to_string())
    }
}

/// Ordered mapping of logical names to their built outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, Vec<ManifestEntry>>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a mapping file. A missing or unreadable file yields an empty manifest.
    pub fn read(path: &Path) -> Self {
        match Self::try_read(path) {
            Ok(manifest) => manifest,
            Err(err) => {
                tracing::debug!("no usable mapping file at {}: {}", path.display(), err);
                Self::default()
            }
        }
    }

    /// Read a mapping file, failing on I/O or JSON errors.
    pub fn try_read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::path_io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write as pretty JSON. With `merge`, entries overlay the existing file.
    pub fn write(&self, path: &Path, merge: bool) -> Result<()> {
        let merged;
        let manifest = if merge {
            let mut existing = Self::read(path);
            existing.extend(self.clone());
            merged = existing;
            &merged
        } else {
            self
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::path_io(parent, e))?;
        }

        let json = serde_json::to_string_pretty(manifest)?;
        std::fs::write(path, json).map_err(|e| Error::path_io(path, e))?;
        tracing::debug!("wrote {} mapping entries to {}", manifest.len(), path.display());
        Ok(())
    }

    /// Built outputs of `name`, or `name` itself when unmapped.
    pub fn resolve(&self, name: &str) -> Vec<ManifestEntry> {
        self.entries
            .get(name)
            .cloned()
            .unwrap_or_else(|| vec![ManifestEntry::Url(name.to_string())])
    }

    pub fn get(&self, name: &str) -> Option<&[ManifestEntry]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// `(alias, url)` pairs of entries carrying `map_as`.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .flatten()
            .filter_map(|entry| entry.map_as().map(|alias| (alias, entry.url())))
    }

    /// Every URL in the manifest, in order.
    pub fn urls(&self) -> impl Iterator<Item = &str> {
        self.entries.values().flatten().map(ManifestEntry::url)
    }

    pub fn insert(&mut self, name: impl Into<String>, entries: Vec<ManifestEntry>) {
        self.entries.insert(name.into(), entries);
    }

    /// Append an output to `name`.
    pub fn push(&mut self, name: &str, entry: ManifestEntry) {
        self.entries.entry(name.to_string()).or_default().push(entry);
    }

    /// Overlay another manifest; its keys replace existing ones.
    pub fn extend(&mut self, other: Manifest) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ManifestEntry])> {
        self.entries
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
