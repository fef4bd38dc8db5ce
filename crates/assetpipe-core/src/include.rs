//! Prioritized include lists.

use crate::bundle::BundleRegistry;

/// Default priority of included assets.
pub const DEFAULT_PRIORITY: i32 = 1;

/// References to render, each with a priority. Higher priorities render first.
#[derive(Debug, Clone, Default)]
pub struct IncludeList {
    items: Vec<(i32, String)>,
}

impl IncludeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include references. Bundle names expand to their entry files.
    pub fn include<S: AsRef<str>>(&mut self, refs: &[S], priority: i32, bundles: &BundleRegistry) {
        for reference in refs {
            let reference = reference.as_ref();
            match bundles.entrypoints(Some(reference)) {
                Ok(files) => self
                    .items
                    .extend(files.into_iter().map(|file| (priority, file))),
                Err(_) => self.push(priority, reference),
            }
        }
    }

    pub fn push(&mut self, priority: i32, reference: impl Into<String>) {
        self.items.push((priority, reference.into()));
    }

    /// References by descending priority; equal priorities keep insertion order.
    pub fn ordered(&self) -> Vec<&str> {
        let mut items: Vec<&(i32, String)> = self.items.iter().collect();
        items.sort_by(|a, b| b.0.cmp(&a.0));
        items.into_iter().map(|(_, reference)| reference.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, &str)> {
        self.items.iter().map(|(p, r)| (*p, r.as_str()))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
