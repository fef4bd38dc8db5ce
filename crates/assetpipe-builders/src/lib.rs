//! # assetpipe-builders
//!
//! Build steps of the asset pipeline. Each step implements [`Builder`]:
//! it contributes to the mapping file during `build` and may run a
//! long-lived worker (esbuild or tailwind in watch mode) during `dev`.
//!
//! Steps run in this order:
//!
//! 1. [`NodeDepsBuilder`] vendors exposed node packages
//! 2. [`TemplatesBuilder`] extracts inline assets from templates
//! 3. [`EsbuildBuilder`] bundles and maps entry points
//! 4. [`TailwindBuilder`] compiles the stylesheet
//! 5. [`CacheWorkerBuilder`] writes the precaching service worker

pub mod builder;
pub mod cache_worker;
pub mod error;
pub mod esbuild;
pub mod node_deps;
pub mod reload;
pub mod tailwind;
pub mod templates;
pub mod worker;

pub use builder::{BuildContext, Builder};
pub use cache_worker::CacheWorkerBuilder;
pub use error::{BuilderError, Result};
pub use esbuild::{EsbuildBuilder, SCRIPT_TEMPLATE};
pub use node_deps::{NodeDepsBuilder, NodePackage};
pub use reload::Broker;
pub use tailwind::TailwindBuilder;
pub use templates::TemplatesBuilder;
pub use worker::{spawn_worker, BuildCommand, Worker};
