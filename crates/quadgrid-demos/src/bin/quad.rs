//! A single orange quad drawn straight in clip space.

use quadgrid_engine::device::GpuInit;
use quadgrid_engine::logging::{init_logging, LoggingConfig};
use quadgrid_engine::scene::{GridScene, SceneConfig};
use quadgrid_engine::window::{Runtime, RuntimeConfig};

fn main() {
    init_logging(LoggingConfig::default());
    log::info!("quad v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let scene = GridScene::new(SceneConfig::single_quad())?;
    Runtime::run(
        RuntimeConfig::new("Quad", 640.0, 480.0),
        GpuInit::default(),
        scene,
    )
}
