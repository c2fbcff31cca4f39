//! Scene graph.
//!
//! Responsibilities:
//! - own every node of the transform hierarchy in a single arena (`SceneTree`)
//! - keep parent links non-owning (`NodeId`), children ordered by insertion
//! - compose world transforms on demand by walking the parent chain
//! - track the active camera and light for the render pass (`SceneGraph`)
//!
//! Node specialisations (camera, geometry, point light) are payloads of
//! [`NodeKind`] rather than subtypes; consumers match on the kind.

mod error;
mod graph;
mod handles;
mod kinds;
mod node;
mod tree;

pub use error::SceneError;
pub use graph::SceneGraph;
pub use handles::{MeshHandle, TextureHandle};
pub use kinds::{CameraNode, GeometryNode, Motion, NodeKind, PointLightNode};
pub use node::Node;
pub use tree::SceneTree;

slotmap::new_key_type! {
    /// Identity of a node inside a [`SceneTree`].
    ///
    /// Keys are generational: an id whose node was destroyed never aliases a
    /// node inserted later.
    pub struct NodeId;
}
