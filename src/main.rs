//! Runs one visualization session.
//!
//! Usage: `htm-viewer <image> [config.json]`. Logging follows `RUST_LOG` (default `info`).

use anyhow::{bail, Context, Result};
use htm_viewer::{
    config::AppConfig,
    core::spatial_pooler::SpatialPooler,
    viewer::{
        present::{Headless, PngSequence},
        Viewer,
    },
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(image_path) = args.next() else {
        bail!("usage: htm-viewer <image> [config.json]");
    };
    let config = match args.next() {
        Some(path) => AppConfig::load(&path).with_context(|| format!("failed to read config {}", path))?,
        None => AppConfig::default(),
    };

    let learner = SpatialPooler::new(config.pooler.clone()).context("failed to build the spatial pooler")?;
    let mut viewer = Viewer::open(config.viewer.clone(), &image_path, learner)
        .with_context(|| format!("failed to prepare {}", image_path))?;

    let outcome = match &config.viewer.frames_dir {
        Some(dir) => viewer.run(PngSequence::create(dir, config.viewer.frame_every)?)?,
        None => viewer.run(Headless::new())?,
    };

    info!(
        epochs = outcome.summary.epochs,
        steps = outcome.summary.steps,
        frames = outcome.frames,
        "done"
    );
    Ok(())
}
