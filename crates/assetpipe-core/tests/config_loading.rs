//! Integration tests for configuration loading.
//!
//! Priority ordering: environment > file > defaults.

use std::fs;

use assetpipe_core::{Argv, BundleSpec, PipelineConfig};
use serial_test::serial;
use tempfile::TempDir;

#[test]
#[serial]
fn test_defaults_without_config_file() {
    let temp = TempDir::new().unwrap();
    let config = PipelineConfig::load(temp.path(), None).unwrap();

    assert_eq!(config.root_path, temp.path());
    assert_eq!(config.livereload_port, 7878);
    assert!(config.bundles.is_none());
}

#[test]
#[serial]
fn test_toml_config_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("assets.toml"),
        r#"
bundles = ["app.js", "site.css"]
tailwind = "main.css"
assets_folder = "assets"
esbuild_bin = "esbuild"
esbuild_target = ["es2020", "chrome58"]

[import_map]
vue = "https://esm.sh/vue@3"
"#,
    )
    .unwrap();

    let config = PipelineConfig::load(temp.path(), None).unwrap();
    assert_eq!(
        config.bundles,
        Some(BundleSpec::List(vec!["app.js".into(), "site.css".into()]))
    );
    assert_eq!(config.tailwind.as_deref(), Some("main.css"));
    assert_eq!(config.esbuild_bin, Argv::One("esbuild".into()));
    assert_eq!(config.import_map["vue"], "https://esm.sh/vue@3");

    let layout = config.layout();
    assert_eq!(layout.assets_folder, temp.path().join("assets"));
}

#[test]
#[serial]
fn test_explicit_json_config_path() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("assets.toml"), "livereload_port = 1111").unwrap();
    let json = temp.path().join("custom.json");
    fs::write(
        &json,
        r#"{"livereload_port": 2222, "bundles": {"main": ["a.js", "b.js"]}}"#,
    )
    .unwrap();

    let config = PipelineConfig::load(temp.path(), Some(&json)).unwrap();
    assert_eq!(config.livereload_port, 2222);
    match config.bundles {
        Some(BundleSpec::Named(bundles)) => assert_eq!(bundles["main"], vec!["a.js", "b.js"]),
        other => panic!("expected named bundles, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_env_overrides_file() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("assets.toml"),
        "livereload_port = 1111\ncdn_host = \"https://file.example.com\"",
    )
    .unwrap();

    unsafe { std::env::set_var("ASSETS_LIVERELOAD_PORT", "9000"); }
    unsafe { std::env::set_var("ASSETS_CDN_HOST", "https://env.example.com"); }
    let config = PipelineConfig::load(temp.path(), None);
    unsafe { std::env::remove_var("ASSETS_LIVERELOAD_PORT"); }
    unsafe { std::env::remove_var("ASSETS_CDN_HOST"); }

    let config = config.unwrap();
    assert_eq!(config.livereload_port, 9000);
    assert_eq!(config.cdn_host.as_deref(), Some("https://env.example.com"));
}

#[test]
#[serial]
fn test_invalid_value_is_a_load_error() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("assets.toml"), "livereload_port = \"soon\"").unwrap();
    assert!(PipelineConfig::load(temp.path(), None).is_err());
}
