use super::{CameraNode, NodeId, PointLightNode, SceneTree};

const OUTLINE_HEADER: &str = "------------ SceneGraph ------------";
const INDENT_WIDTH: usize = 2;

/// A named scene: the node arena plus the ids the render pass needs in O(1).
///
/// Created by the host at startup and passed by reference. `root`, `camera`
/// and `light` are non-owning; setting them does not check that the node is
/// attached under the current root.
#[derive(Debug, Default)]
pub struct SceneGraph {
    name: String,
    tree: SceneTree,
    root: Option<NodeId>,
    camera: Option<NodeId>,
    light: Option<NodeId>,
}

impl SceneGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn tree(&self) -> &SceneTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut SceneTree {
        &mut self.tree
    }

    /// Replaces the root. The previous root's subtree stays in the arena.
    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_camera(&mut self, camera: NodeId) {
        self.camera = Some(camera);
    }

    pub fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    pub fn set_directional_light(&mut self, light: NodeId) {
        self.light = Some(light);
    }

    pub fn directional_light(&self) -> Option<NodeId> {
        self.light
    }

    /// Camera payload of the active camera, if it is set and is a camera node.
    pub fn camera_node(&self) -> Option<&CameraNode> {
        self.tree.node(self.camera?)?.as_camera()
    }

    pub fn camera_node_mut(&mut self) -> Option<&mut CameraNode> {
        let id = self.camera?;
        self.tree.node_mut(id)?.as_camera_mut()
    }

    /// Light payload of the active light, if it is set and is a point light node.
    pub fn light_node(&self) -> Option<&PointLightNode> {
        self.tree.node(self.light?)?.as_light()
    }

    /// Indented listing of the tree below the root, bracketed by separator lines.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        out.push_str(OUTLINE_HEADER);
        out.push('\n');

        if let Some(root) = self.root.and_then(|id| self.tree.node(id).map(|n| (id, n))) {
            out.push_str(root.1.name());
            out.push('\n');
            self.tree.traverse(root.0, |_, node| {
                let indent = node.depth() as usize * INDENT_WIDTH;
                out.extend(std::iter::repeat_n(' ', indent));
                out.push_str(node.name());
                out.push('\n');
            });
        }

        out.push_str(&"-".repeat(OUTLINE_HEADER.len()));
        out.push('\n');
        out
    }

    /// Logs [`outline`](Self::outline) line by line at `info` level.
    pub fn print_graph(&self) {
        for line in self.outline().lines() {
            log::info!("{line}");
        }
    }
}
