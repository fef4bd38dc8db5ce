//! Service worker precaching the built assets.

use std::fs;
use std::path::PathBuf;

use assetpipe_core::Manifest;
use async_trait::async_trait;

use crate::builder::{BuildContext, Builder};
use crate::error::{BuilderError, Result};

const HEADER: &str = "/* AUTO-GENERATED SERVICE WORKER */";

const WORKER_BODY: &str = r#"
self.addEventListener('install', (event) => {
    event.waitUntil(
        caches.open(CACHE_NAME).then((cache) => cache.addAll(CACHE_URLS))
    );
    self.skipWaiting();
});

self.addEventListener('activate', (event) => {
    event.waitUntil(
        caches.keys().then((names) => Promise.all(
            names.filter((name) => name !== CACHE_NAME).map((name) => caches.delete(name))
        ))
    );
    self.clients.claim();
});

self.addEventListener('fetch', (event) => {
    if (event.request.method !== 'GET') {
        return;
    }
    event.respondWith(
        caches.match(event.request).then((cached) => cached || fetch(event.request))
    );
});
"#;

/// Render the worker script.
pub fn render_worker(name: &str, urls: &[String]) -> Result<String> {
    Ok(format!(
        "{}\n\nconst CACHE_NAME = {};\nconst CACHE_URLS = {};\n{}",
        HEADER,
        serde_json::to_string(name)?,
        serde_json::to_string(urls)?,
        WORKER_BODY
    ))
}

/// Fresh cache name, so every build invalidates the previous cache.
pub fn generated_cache_name() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("assets-{}", &id[..8])
}

pub struct CacheWorkerBuilder {
    ctx: BuildContext,
}

impl CacheWorkerBuilder {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx }
    }

    pub fn is_enabled(&self) -> bool {
        self.ctx.pipeline.config().cache_worker
    }

    pub fn output_path(&self) -> PathBuf {
        self.ctx
            .pipeline
            .layout()
            .output_folder
            .join(&self.ctx.pipeline.config().cache_worker_filename)
    }

    /// URLs to precache: every mapped URL, the tailwind stylesheet and configured extras.
    pub fn urls(&self, manifest: &Manifest) -> Vec<String> {
        let pipeline = &self.ctx.pipeline;
        let mut urls: Vec<String> = Vec::new();
        let extra = pipeline.tailwind_url().into_iter();
        let configured = pipeline.config().cache_worker_urls.iter().cloned();

        for url in manifest.urls().map(str::to_string).chain(extra).chain(configured) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    /// Write the worker for `manifest`.
    pub fn write(&self, manifest: &Manifest) -> Result<PathBuf> {
        let name = self
            .ctx
            .pipeline
            .config()
            .cache_worker_name
            .clone()
            .unwrap_or_else(generated_cache_name);
        let script = render_worker(&name, &self.urls(manifest))?;

        let path = self.output_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuilderError::io(parent, e))?;
        }
        fs::write(&path, script).map_err(|e| BuilderError::io(&path, e))?;
        tracing::info!("wrote cache worker {} ({})", path.display(), name);
        Ok(path)
    }
}

#[async_trait]
impl Builder for CacheWorkerBuilder {
    fn name(&self) -> &'static str {
        "cache-worker"
    }

    fn prefix(&self) -> &str {
        "[cache-worker]"
    }

    /// Runs last: precaches what the other builders mapped.
    async fn build(&self, manifest: &mut Manifest, _ignore: &mut Vec<String>) -> Result<()> {
        if self.is_enabled() {
            self.write(manifest)?;
        }
        Ok(())
    }
}
