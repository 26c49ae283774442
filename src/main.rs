//! Binary entrypoint for the spatial photo viewer.
//!
//! Wires the CLI and config into the mesh task and hands the main
//! thread to the windowing shell; all behaviour lives in the library.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use spatial_viewer::events::SetSource;
use spatial_viewer::render::viewer;
use spatial_viewer::source::ImageSource;
use spatial_viewer::tasks::mesh;

#[derive(Debug, Parser)]
#[command(name = "spatial-viewer", about = "Stereoscopic photo viewer")]
struct Cli {
    /// Spatial photo to open (a layered stereo container); more can
    /// be dropped onto the window later.
    photo: Option<PathBuf>,

    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("spatial_viewer={level}").parse()?)
        .add_directive("wgpu=warn".parse()?)
        .add_directive("winit=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => spatial_viewer::config::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => spatial_viewer::config::Configuration::default(),
    };
    cfg.validate().context("validating configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building async runtime")?;

    let cancel = CancellationToken::new();
    let (source_tx, source_rx) = mpsc::channel::<SetSource>(16);
    let (mesh_tx, mesh_rx) = crossbeam_channel::unbounded();
    let (gpu_tx, gpu_rx) = oneshot::channel();

    if let Some(photo) = cli.photo {
        info!(photo = %photo.display(), "opening photo from command line");
        source_tx
            .try_send(SetSource(Some(ImageSource::from(photo))))
            .expect("fresh channel accepts the initial source");
    }

    let mesh_cfg = cfg.clone();
    let mesh_cancel = cancel.clone();
    let mesh_task = runtime.spawn(async move {
        // The texture provisioner arrives once the window has a GPU.
        let Ok(provisioner) = gpu_rx.await else {
            return Ok(());
        };
        mesh::run(
            mesh_cfg,
            source_rx,
            Arc::new(provisioner),
            mesh_tx,
            mesh_cancel,
        )
        .await
    });

    // The windowing shell owns the main thread until exit.
    viewer::run(cfg, source_tx, mesh_rx, gpu_tx, cancel.clone())?;

    cancel.cancel();
    let _ = runtime.block_on(mesh_task);
    Ok(())
}
