//! # assetpipe-core
//!
//! Front-end asset resolution for server-rendered applications.
//!
//! Bundles are declared once, pages include bundles, files and URLs while
//! rendering, and everything is resolved against the mapping file written
//! by the build to produce `<script>`, `<link>` and import map tags.
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use assetpipe_core::{AssetsPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::load(Path::new("."), None)?;
//! let pipeline = Arc::new(AssetsPipeline::new(config)?);
//!
//! let page = pipeline.page();
//! page.include(&["app.js", "preload fonts/inter.woff2"], 1);
//! println!("{}", page.tags(None));
//! # Ok::<(), assetpipe_core::Error>(())
//! ```

pub mod bundle;
pub mod config;
pub mod copy;
pub mod directive;
pub mod error;
pub mod import_map;
pub mod include;
pub mod inline;
pub mod manifest;
pub mod metafile;
pub mod page;
pub mod pipeline;
pub mod resolver;
pub mod tags;
pub mod template;

pub use bundle::{BundleFile, BundleRegistry, Scope};
pub use config::{Argv, AssetsEndpoint, BundleSpec, Layout, PipelineConfig};
pub use directive::{IncludeEntry, Modifier};
pub use error::{Error, Result};
pub use import_map::ImportMap;
pub use include::{IncludeList, DEFAULT_PRIORITY};
pub use inline::{extract_inline_assets, InlineAsset};
pub use manifest::{Manifest, ManifestEntry};
pub use metafile::{convert_metafile, ConvertedMetafile, MetafileContext};
pub use page::PageAssets;
pub use pipeline::AssetsPipeline;
pub use resolver::{AssetResolver, ResolvedAsset};
pub use tags::{render_tags, TagOptions};
pub use template::{TemplateAssets, TemplateFile};
