//! GPU rendering subsystem.
//!
//! A frame is rendered in two steps:
//! - `plan_frame` walks the scene graph on the CPU, applies orbit animation and
//!   resolves every geometry node into a `DrawItem` (uniform block, mesh,
//!   texture, draw range). It never touches the device and is unit-tested.
//! - `SceneRenderer` replays the `DrawList` into an off-screen color/depth
//!   target; `CompositeRenderer` then draws that target onto the surface
//!   through a full-screen quad with the post-process toggles applied.
//!
//! Each renderer owns its GPU resources (pipelines, buffers, bind groups) and
//! creates them lazily.
//!
//! Convention: right-handed world space, +Y up, camera looks down -Z,
//! clip depth 0..1.

mod ctx;
mod error;
mod frame;
mod mesh;
mod post;
mod scene_renderer;
mod shader;
mod texture;
mod uniforms;

pub use ctx::{RenderCtx, RenderTarget};
pub use error::RenderError;
pub use frame::{
    plan_frame, DrawItem, DrawList, DrawRange, FrameParams, AMBIENT_STRENGTH, ORBIT_SPEED,
};
pub use mesh::{MeshCatalog, MeshData, MeshInfo, MeshStore, MeshVertex, Topology};
pub use post::{CompositeRenderer, PostSettings};
pub use scene_renderer::SceneRenderer;
pub use shader::{
    ShaderRegistry, ShaderVariant, TextureSlot, UniformSlots, ORBIT, PLANET, SKYBOX, STAR,
};
pub use texture::TextureStore;
pub use uniforms::ObjectUniform;
