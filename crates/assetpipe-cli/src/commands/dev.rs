//! Development mode.
//!
//! Runs every builder's worker in watch mode, re-extracts inline assets
//! when templates change and serves live reload events until Ctrl+C.

use std::future;
use std::sync::Arc;

use assetpipe_builders::{spawn_worker, BuildContext, Broker, Builder, TemplatesBuilder, Worker};
use assetpipe_core::TemplateAssets;
use tokio::signal;
use tokio::task::JoinHandle;

use crate::cli::{DevArgs, ProjectArgs};
use crate::commands::build::pipeline_builders;
use crate::dev::{spawn_builder_watcher, spawn_reload_watcher, LivereloadServer};
use crate::error::Result;
use crate::ui;

async fn cleanup(builders: &[Arc<dyn Builder>]) {
    for builder in builders {
        if let Err(e) = builder.cleanup().await {
            tracing::warn!("{} cleanup failed: {}", builder.name(), e);
        }
    }
}

/// Wait for every worker to exit, then process its output once.
async fn run_once(workers: &mut [(Arc<dyn Builder>, Worker)]) -> Result<()> {
    for (builder, worker) in workers.iter_mut() {
        worker.wait().await?;
        builder.on_dev_output().await?;
    }
    Ok(())
}

pub async fn execute(project: &ProjectArgs, args: DevArgs) -> Result<()> {
    let project = ProjectArgs {
        debug: true,
        ..project.clone()
    };
    let pipeline = project.pipeline()?;
    let config = pipeline.config();
    let layout = pipeline.layout();

    let broker = Arc::new(Broker::new());
    let mut ctx = BuildContext::new(Arc::clone(&pipeline));
    if args.livereload_enabled() {
        ctx = ctx.with_broker(Arc::clone(&broker));
    }

    let mut folders = TemplateAssets::from_pipeline(Arc::clone(&pipeline))
        .folders()
        .to_vec();
    folders.extend(args.watch_template_folders.iter().map(|f| layout.root.join(f)));
    let templates = TemplatesBuilder::new(
        ctx.clone(),
        TemplateAssets::new(Arc::clone(&pipeline), folders),
    )
    .with_reload(args.reload_templates());

    let builders = pipeline_builders(&ctx, templates)?;
    for builder in &builders {
        builder.prepare().await?;
    }

    let mut workers = Vec::new();
    for builder in &builders {
        if let Some(command) = builder.dev_command(args.build_only)? {
            let worker = spawn_worker(Arc::clone(builder), &command)?;
            workers.push((Arc::clone(builder), worker));
        }
    }

    if args.build_only {
        let result = run_once(&mut workers).await;
        cleanup(&builders).await;
        result?;
        ui::success("Development build finished");
        return Ok(());
    }

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    for builder in &builders {
        if let Some(task) = spawn_builder_watcher(Arc::clone(builder), ctx.clone())? {
            tasks.push(task);
        }
    }

    if args.livereload_enabled() {
        let paths: Vec<_> = args.watch_paths.iter().map(|p| layout.root.join(p)).collect();
        if !paths.is_empty() {
            tasks.push(spawn_reload_watcher(paths, None, Arc::clone(&broker))?);
        }
        if args.watch_app {
            tasks.push(spawn_reload_watcher(
                vec![layout.root.clone()],
                Some(config.watch_app_extensions.clone()),
                Arc::clone(&broker),
            )?);
        }
    }

    let mut server = if args.livereload_enabled() {
        let server = LivereloadServer::new(config.livereload_port, Arc::clone(&broker));
        ui::info(&format!("Live reload on http://{}", server.addr()));
        Some(tokio::spawn(server.start()))
    } else {
        None
    };

    ui::info("Watching for changes, press Ctrl+C to stop");

    let outcome = tokio::select! {
        _ = signal::ctrl_c() => {
            ui::info("Shutting down...");
            Ok(())
        }
        joined = async {
            match server.as_mut() {
                Some(handle) => handle.await,
                None => future::pending().await,
            }
        } => match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!("live reload task stopped: {}", e);
                Ok(())
            }
        },
    };

    for (_, worker) in workers.iter_mut() {
        worker.terminate().await;
    }
    for task in tasks {
        task.abort();
    }
    if let Some(handle) = server {
        handle.abort();
    }
    cleanup(&builders).await;

    outcome
}
