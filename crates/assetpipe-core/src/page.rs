//! Per-request asset state.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::include::{IncludeList, DEFAULT_PRIORITY};
use crate::manifest::Manifest;
use crate::pipeline::AssetsPipeline;
use crate::resolver::ResolvedAsset;

#[derive(Debug, Default)]
struct PageState {
    include: IncludeList,
    /// Manifest snapshot, read once per page
    manifest: Option<Arc<Manifest>>,
    nonce: Option<String>,
}

/// Assets of a single page render.
///
/// Starts from the global include list (plus the tailwind stylesheet) and
/// collects what the page includes while rendering. Clones share state.
#[derive(Debug, Clone)]
pub struct PageAssets {
    pipeline: Arc<AssetsPipeline>,
    state: Arc<Mutex<PageState>>,
}

impl PageAssets {
    pub(crate) fn new(pipeline: Arc<AssetsPipeline>) -> Self {
        let mut include = pipeline.includes();
        if let Some(url) = pipeline.tailwind_url() {
            include.push(DEFAULT_PRIORITY, url);
        }

        Self {
            pipeline,
            state: Arc::new(Mutex::new(PageState {
                include,
                ..PageState::default()
            })),
        }
    }

    pub fn pipeline(&self) -> &Arc<AssetsPipeline> {
        &self.pipeline
    }

    /// Include references on this page only.
    pub fn include<S: AsRef<str>>(&self, refs: &[S], priority: i32) {
        let mut state = self.state.lock();
        self.pipeline.include_into(&mut state.include, refs, priority);
    }

    /// References included so far, in render order.
    pub fn included(&self) -> Vec<String> {
        self.state
            .lock()
            .include
            .ordered()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// The manifest snapshot used for the whole page.
    pub fn manifest(&self) -> Arc<Manifest> {
        let mut state = self.state.lock();
        Arc::clone(
            state
                .manifest
                .get_or_insert_with(|| self.pipeline.manifest()),
        )
    }

    pub fn url(&self, reference: &str, external: bool) -> Option<String> {
        self.pipeline
            .resolver()
            .resolve(reference, &self.manifest(), external)
            .into_iter()
            .next()
            .map(|asset| asset.url)
    }

    /// Resolved URLs of everything included on the page.
    pub fn urls(&self, external: bool) -> Vec<ResolvedAsset> {
        let refs = self.included();
        self.pipeline
            .resolver()
            .resolve_all(&refs, &self.manifest(), external)
    }

    /// Remember the CSP nonce for [`PageAssets::tags`].
    pub fn set_nonce(&self, nonce: Option<String>) {
        if nonce.is_some() {
            self.state.lock().nonce = nonce;
        }
    }

    pub fn nonce(&self) -> Option<String> {
        self.state.lock().nonce.clone()
    }

    /// Render the page's tags. Without an explicit nonce, the remembered one is used.
    pub fn tags(&self, nonce: Option<&str>) -> String {
        let remembered = self.nonce();
        let nonce = nonce.or(remembered.as_deref());
        self.pipeline.render(&self.urls(false), nonce)
    }
}

impl minijinja::value::Object for PageAssets {}
