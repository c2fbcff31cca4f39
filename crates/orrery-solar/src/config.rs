use std::path::{Path, PathBuf};

use clap::Parser;
use orrery_engine::logging::LoggingConfig;
use orrery_engine::window::RuntimeConfig;
use winit::dpi::LogicalSize;

/// Skybox faces under `<resources>/textures/skybox/`, in +X, -X, +Y, -Y, +Z, -Z order.
///
/// The bundled skybox images label their +Y face `bottom` and their -Y face `top`.
pub const SKYBOX_FACES: [&str; 6] = ["right", "left", "bottom", "top", "front", "back"];

/// Animated solar system rendered with wgpu.
#[derive(Debug, Clone, Parser)]
#[command(name = "orrery-solar")]
#[command(about = "Animated solar system scene graph rendered with wgpu")]
pub struct SolarConfig {
    /// Directory holding `textures/` and `textures/skybox/`
    #[arg(long, default_value = "resources")]
    pub resources: PathBuf,

    /// Initial window width in logical pixels
    #[arg(long, default_value_t = 1280.0)]
    pub width: f64,

    /// Initial window height in logical pixels
    #[arg(long, default_value_t = 720.0)]
    pub height: f64,

    /// Skip texture files; bodies use their flat colors
    #[arg(long)]
    pub untextured: bool,

    /// Log filter in env_logger syntax (overrides RUST_LOG)
    #[arg(long)]
    pub log: Option<String>,
}

impl SolarConfig {
    pub fn runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            title: "orrery solar".to_string(),
            initial_size: LogicalSize::new(self.width.max(1.0), self.height.max(1.0)),
        }
    }

    pub fn logging_config(&self) -> LoggingConfig {
        match &self.log {
            Some(filter) => LoggingConfig::with_filter(filter.clone()),
            None => LoggingConfig::default(),
        }
    }

    fn texture_dir(&self) -> PathBuf {
        self.resources.join("textures")
    }

    /// `<resources>/textures/<body>.png`
    pub fn texture_path(&self, body: &str) -> PathBuf {
        self.texture_dir().join(format!("{body}.png"))
    }

    pub fn skybox_paths(&self) -> [PathBuf; 6] {
        let dir = self.texture_dir().join("skybox");
        SKYBOX_FACES.map(|face| face_path(&dir, face))
    }
}

fn face_path(dir: &Path, face: &str) -> PathBuf {
    dir.join(format!("{face}.png"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> SolarConfig {
        SolarConfig::try_parse_from(std::iter::once("orrery-solar").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let cfg = parse(&[]);
        assert_eq!(cfg.resources, PathBuf::from("resources"));
        assert_eq!((cfg.width, cfg.height), (1280.0, 720.0));
        assert!(!cfg.untextured);
        assert!(cfg.log.is_none());
        assert!(cfg.logging_config().env_filter.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = parse(&[
            "--resources",
            "/tmp/assets",
            "--width",
            "640",
            "--height",
            "480",
            "--untextured",
            "--log",
            "debug",
        ]);
        assert_eq!(cfg.resources, PathBuf::from("/tmp/assets"));
        assert!(cfg.untextured);
        assert_eq!(cfg.logging_config().env_filter.as_deref(), Some("debug"));

        let rt = cfg.runtime_config();
        assert_eq!(rt.initial_size, LogicalSize::new(640.0, 480.0));
    }

    #[test]
    fn unknown_flag_is_rejected() {
        assert!(SolarConfig::try_parse_from(["orrery-solar", "--bogus"]).is_err());
    }

    #[test]
    fn texture_paths_follow_layout() {
        let cfg = parse(&["--resources", "res"]);
        assert_eq!(cfg.texture_path("Earth"), PathBuf::from("res/textures/Earth.png"));

        let faces = cfg.skybox_paths();
        assert_eq!(faces[0], PathBuf::from("res/textures/skybox/right.png"));
        assert_eq!(faces[5], PathBuf::from("res/textures/skybox/back.png"));
    }

    #[test]
    fn skybox_up_face_is_the_bottom_image() {
        let faces = parse(&["--resources", "res"]).skybox_paths();
        assert_eq!(faces[2], PathBuf::from("res/textures/skybox/bottom.png"));
        assert_eq!(faces[3], PathBuf::from("res/textures/skybox/top.png"));
    }
}
