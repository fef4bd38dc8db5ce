//! Command implementations.
//!
//! Each command lives in its own module and exposes an `execute` function
//! taking the project arguments and the parsed command arguments.

pub mod build;
pub mod dev;
pub mod esbuild_script;
pub mod extract;
pub mod init_tailwind;
pub mod livereload;
pub mod metafile;
pub mod render;
pub mod tags;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;
pub use esbuild_script::execute as esbuild_script_execute;
pub use esbuild_script::generate as generate_esbuild_script_execute;
pub use extract::execute as extract_execute;
pub use init_tailwind::execute as init_tailwind_execute;
pub use livereload::execute as livereload_execute;
pub use metafile::execute as convert_metafile_execute;
pub use render::execute as render_execute;
pub use tags::execute as tags_execute;
