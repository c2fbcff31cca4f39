use glam::Mat4;

use super::kinds::{CameraNode, GeometryNode, NodeKind, PointLightNode};
use super::NodeId;

/// One element of the transform hierarchy.
///
/// Structure (`parent`, `children`, `depth`) is maintained by
/// [`SceneTree`](super::SceneTree); a freshly constructed node is detached.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: String,
    pub(super) depth: u32,
    local: Mat4,
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            depth: 0,
            local: Mat4::IDENTITY,
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// Plain transform holder.
    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn camera(name: impl Into<String>, camera: CameraNode) -> Self {
        Self::new(name, NodeKind::Camera(camera))
    }

    pub fn geometry(name: impl Into<String>, geometry: GeometryNode) -> Self {
        Self::new(name, NodeKind::Geometry(geometry))
    }

    pub fn point_light(name: impl Into<String>, light: PointLightNode) -> Self {
        Self::new(name, NodeKind::PointLight(light))
    }

    pub fn with_local_transform(mut self, local: Mat4) -> Self {
        self.local = local;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Distance from the top of the tree this node is attached to (0 when detached).
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in insertion (= traversal) order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Transform relative to the parent.
    pub fn local_transform(&self) -> Mat4 {
        self.local
    }

    /// Replaces the local transform. Children and world transforms are not touched;
    /// world transforms are always recomputed from the current locals.
    pub fn set_local_transform(&mut self, local: Mat4) {
        self.local = local;
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_camera(&self) -> Option<&CameraNode> {
        match &self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_camera_mut(&mut self) -> Option<&mut CameraNode> {
        match &mut self.kind {
            NodeKind::Camera(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&GeometryNode> {
        match &self.kind {
            NodeKind::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_light(&self) -> Option<&PointLightNode> {
        match &self.kind {
            NodeKind::PointLight(l) => Some(l),
            _ => None,
        }
    }
}
