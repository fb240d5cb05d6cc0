//! Ten by ten grid of quads under a perspective camera.

use quadgrid_engine::device::GpuInit;
use quadgrid_engine::logging::{init_logging, LoggingConfig};
use quadgrid_engine::scene::{GridScene, SceneConfig};
use quadgrid_engine::window::{Runtime, RuntimeConfig};

fn main() {
    init_logging(LoggingConfig::default());
    log::info!("quad-grid v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let scene = GridScene::new(SceneConfig::grid())?;
    Runtime::run(
        RuntimeConfig::new("Quad Grid", 1024.0, 768.0),
        GpuInit::default(),
        scene,
    )
}
