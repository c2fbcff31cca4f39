//! Animated solar system: a scene graph of orbiting planets drawn with wgpu.
//!
//! Controls: W/S/A/D move, left-drag looks around, Space pauses orbits,
//! 1 toon shading, 7 grayscale, 8/9 mirror, 0 blur, Escape quits.

mod app;
mod config;
mod controls;
mod meshes;
mod solar;

use anyhow::Result;
use clap::Parser;
use orrery_engine::device::GpuInit;
use orrery_engine::logging::init_logging;
use orrery_engine::window::Runtime;

use crate::app::SolarApp;
use crate::config::SolarConfig;

fn main() -> Result<()> {
    let config = SolarConfig::parse();
    init_logging(config.logging_config());

    log::info!("orrery-solar starting (resources: {})", config.resources.display());

    let runtime_config = config.runtime_config();
    Runtime::run(runtime_config, GpuInit::default(), SolarApp::new(config))
}
