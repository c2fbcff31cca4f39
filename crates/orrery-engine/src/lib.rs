//! Orrery engine crate.
//!
//! Scene graph, per-frame render pass and the platform + GPU runtime that
//! drives them.

pub mod core;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
