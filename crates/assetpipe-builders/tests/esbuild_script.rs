//! Integration tests driving the esbuild builder with a stand-in script.
//!
//! The script receives the same `ESBUILD_*` environment a real esbuild
//! script would and writes the metafile and outputs itself.
#![cfg(unix)]

use std::fs;
use std::sync::Arc;

use assetpipe_builders::{spawn_worker, BuildContext, Broker, Builder, EsbuildBuilder};
use assetpipe_core::{Argv, AssetsPipeline, BundleSpec, Manifest, PipelineConfig};
use tempfile::TempDir;

const FAKE_ESBUILD: &str = r#"
mkdir -p "$ESBUILD_OUTDIR"
echo "console.log('app')" > "$ESBUILD_OUTDIR/app-H4SH.js"
cat > "$ESBUILD_METAFILE" <<EOF
{"outputs": {"static/dist/app-H4SH.js": {"entryPoint": "static/app.js", "imports": []}}}
EOF
echo "entrypoints: $ESBUILD_ENTRYPOINTS"
if [ "$ESBUILD_WATCH" = "1" ]; then
  echo "[watch] build finished"
fi
"#;

fn pipeline(temp: &TempDir, debug: bool) -> Arc<AssetsPipeline> {
    fs::write(temp.path().join("fake-esbuild.sh"), FAKE_ESBUILD).unwrap();
    Arc::new(
        AssetsPipeline::new(PipelineConfig {
            root_path: temp.path().to_path_buf(),
            bundles: Some(BundleSpec::List(vec!["app.js".to_string()])),
            esbuild_script: Some(Argv::Many(vec![
                "sh".to_string(),
                "fake-esbuild.sh".to_string(),
            ])),
            debug,
            ..PipelineConfig::default()
        })
        .unwrap(),
    )
}

#[tokio::test]
async fn test_build_maps_script_outputs() {
    let temp = TempDir::new().unwrap();
    let esbuild = EsbuildBuilder::new(BuildContext::new(pipeline(&temp, false))).unwrap();

    let mut manifest = Manifest::new();
    let mut ignore = Vec::new();
    esbuild.build(&mut manifest, &mut ignore).await.unwrap();

    assert_eq!(ignore, vec!["app.js"]);
    assert_eq!(
        manifest.get("app.js").unwrap()[0].url(),
        "/static/dist/app-H4SH.js"
    );
    assert!(temp.path().join("static/dist/app-H4SH.js").exists());

    esbuild.cleanup().await.unwrap();
    assert!(!esbuild.metafile_path().exists());
}

#[tokio::test]
async fn test_dev_worker_writes_mapping_and_pings() {
    let temp = TempDir::new().unwrap();
    let broker = Arc::new(Broker::new());
    let mut events = broker.subscribe();

    let ctx = BuildContext::new(pipeline(&temp, true)).with_broker(Arc::clone(&broker));
    let esbuild = Arc::new(EsbuildBuilder::new(ctx).unwrap());

    let cmd = esbuild.dev_command(false).unwrap().unwrap();
    let mut worker = spawn_worker(esbuild.clone(), &cmd).unwrap();
    worker.wait().await.unwrap();

    assert_eq!(events.recv().await, Some("ok"));
    let mapping = Manifest::try_read(&temp.path().join("assets.json")).unwrap();
    assert_eq!(
        mapping.get("app.js").unwrap()[0].url(),
        "/static/dist/app-H4SH.js"
    );
}
