use glam::Mat4;
use slotmap::SlotMap;

use super::{Node, NodeId, SceneError};

/// Arena owning every node of a scene.
///
/// Ownership is top-down: a node's lifetime ends when it (or an ancestor) is
/// destroyed or when the arena is dropped. Parent links are plain ids used for
/// upward walks only.
///
/// Nodes not reachable from any root are "detached" subtrees; they keep living
/// in the arena until re-attached or destroyed.
#[derive(Debug, Default, Clone)]
pub struct SceneTree {
    nodes: SlotMap<NodeId, Node>,
}

impl SceneTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `node` into the arena as a detached node and returns its id.
    pub fn insert(&mut self, mut node: Node) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.depth = 0;
        self.nodes.insert(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Attaches `child` as the last child of `parent`.
    ///
    /// A child that is attached elsewhere is moved. Depth is renumbered for the
    /// whole moved subtree. Attaching a node under itself or one of its
    /// descendants is rejected and leaves the tree unchanged.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let parent_depth = self
            .nodes
            .get(parent)
            .ok_or(SceneError::UnknownNode(parent))?
            .depth;
        if !self.nodes.contains_key(child) {
            return Err(SceneError::UnknownNode(child));
        }

        if parent == child {
            return Err(SceneError::SelfParent {
                name: self.nodes[child].name().to_string(),
            });
        }

        if self.is_ancestor(child, parent) {
            return Err(SceneError::Cycle {
                parent: self.nodes[parent].name().to_string(),
                child: self.nodes[child].name().to_string(),
            });
        }

        self.unlink(child);

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        self.renumber(child, parent_depth + 1);

        Ok(())
    }

    /// Detaches the first direct child of `parent` named `name`.
    ///
    /// The detached node gets depth 0 and no parent; its id is returned so the
    /// caller can re-attach or destroy the subtree. Returns `None` if no direct
    /// child has that name.
    pub fn remove_child(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        let child = self.child(parent, name)?;
        self.unlink(child);
        self.renumber(child, 0);
        Some(child)
    }

    /// First direct child of `parent` named `name`. Grandchildren are not searched.
    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.nodes
            .get(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes.get(c).is_some_and(|n| n.name() == name))
    }

    pub fn local_transform(&self, id: NodeId) -> Option<Mat4> {
        self.nodes.get(id).map(Node::local_transform)
    }

    pub fn set_local_transform(&mut self, id: NodeId, local: Mat4) -> Result<(), SceneError> {
        let node = self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))?;
        node.set_local_transform(local);
        Ok(())
    }

    /// World transform of `id`: the parent's world transform composed on the left
    /// of the local transform, bottoming out at a node without parent.
    ///
    /// Recomputed on every call (O(depth)); never stale with respect to local edits.
    pub fn world_transform(&self, id: NodeId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        let mut world = node.local_transform();
        let mut current = node.parent;

        while let Some(pid) = current {
            let Some(parent) = self.nodes.get(pid) else { break };
            world = parent.local_transform() * world;
            current = parent.parent;
        }

        Some(world)
    }

    /// Calls `visitor` for every descendant of `from` (not `from` itself) in
    /// pre-order, siblings in insertion order.
    ///
    /// The visitor only gets shared access; use [`descendants`](Self::descendants)
    /// to walk while mutating transforms.
    pub fn traverse<F>(&self, from: NodeId, mut visitor: F)
    where
        F: FnMut(NodeId, &Node),
    {
        let Some(start) = self.nodes.get(from) else { return };

        let mut stack: Vec<NodeId> = start.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else { continue };
            visitor(id, node);
            stack.extend(node.children.iter().rev().copied());
        }
    }

    /// Descendants of `from` in the same order [`traverse`](Self::traverse) visits them.
    pub fn descendants(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.traverse(from, |id, _| out.push(id));
        out
    }

    /// True if `ancestor` appears strictly above `node` in its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Slash-separated names from the top of the node's tree down to the node.
    pub fn path(&self, id: NodeId) -> Option<String> {
        let mut names = vec![self.nodes.get(id)?.name()];
        let mut current = self.nodes[id].parent;
        while let Some(pid) = current {
            let Some(parent) = self.nodes.get(pid) else { break };
            names.push(parent.name());
            current = parent.parent;
        }
        names.reverse();
        Some(names.join("/"))
    }

    /// Detaches `id` and frees it together with its whole subtree.
    ///
    /// Returns the number of nodes freed (0 if `id` is unknown).
    pub fn destroy(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(id) {
            return 0;
        }
        self.unlink(id);

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// Removes `id` from its parent's child list and clears the back link.
    fn unlink(&mut self, id: NodeId) {
        let Some(parent) = self.nodes.get_mut(id).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|&c| c != id);
        }
    }

    /// Sets `id` to `depth` and every descendant to its distance below it.
    fn renumber(&mut self, id: NodeId, depth: u32) {
        let mut stack = vec![(id, depth)];
        while let Some((next, d)) = stack.pop() {
            let Some(node) = self.nodes.get_mut(next) else { continue };
            node.depth = d;
            stack.extend(node.children.iter().map(|&c| (c, d + 1)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec3, Vec4};

    fn tree_with(names: &[&str]) -> (SceneTree, Vec<NodeId>) {
        let mut tree = SceneTree::new();
        let ids = names.iter().map(|n| tree.insert(Node::group(*n))).collect();
        (tree, ids)
    }

    fn assert_depth_invariant(tree: &SceneTree, root: NodeId) {
        assert_eq!(tree.node(root).unwrap().depth(), 0);
        tree.traverse(root, |_, node| {
            let parent = tree.node(node.parent().unwrap()).unwrap();
            assert_eq!(node.depth(), parent.depth() + 1, "depth of '{}'", node.name());
        });
    }

    // ── add_child / depth ─────────────────────────────────────────────────

    #[test]
    fn add_child_sets_parent_depth_and_order() {
        let (mut tree, ids) = tree_with(&["root", "a", "b"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[0], ids[2]).unwrap();

        let root = tree.node(ids[0]).unwrap();
        assert_eq!(root.children(), &[ids[1], ids[2]]);
        assert_eq!(tree.node(ids[1]).unwrap().parent(), Some(ids[0]));
        assert_eq!(tree.node(ids[2]).unwrap().depth(), 1);
    }

    #[test]
    fn attaching_a_subtree_renumbers_descendants() {
        let (mut tree, ids) = tree_with(&["root", "holder", "geo", "moon"]);
        // Build holder -> geo -> moon while detached, then hang it under root.
        tree.add_child(ids[1], ids[2]).unwrap();
        tree.add_child(ids[2], ids[3]).unwrap();
        assert_eq!(tree.node(ids[3]).unwrap().depth(), 2);

        tree.add_child(ids[0], ids[1]).unwrap();
        assert_eq!(tree.node(ids[3]).unwrap().depth(), 3);
        assert_depth_invariant(&tree, ids[0]);
    }

    #[test]
    fn reattaching_moves_node_between_parents() {
        let (mut tree, ids) = tree_with(&["root", "a", "b", "leaf"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        tree.add_child(ids[0], ids[3]).unwrap();

        tree.add_child(ids[2], ids[3]).unwrap();

        assert_eq!(tree.node(ids[0]).unwrap().children(), &[ids[1]]);
        assert_eq!(tree.node(ids[2]).unwrap().children(), &[ids[3]]);
        assert_eq!(tree.node(ids[3]).unwrap().depth(), 3);
        assert_depth_invariant(&tree, ids[0]);
    }

    #[test]
    fn add_child_rejects_self_and_cycles() {
        let (mut tree, ids) = tree_with(&["root", "a", "b"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();

        assert!(matches!(
            tree.add_child(ids[1], ids[1]),
            Err(SceneError::SelfParent { .. })
        ));
        assert!(matches!(
            tree.add_child(ids[2], ids[0]),
            Err(SceneError::Cycle { .. })
        ));

        // Unchanged.
        assert_eq!(tree.node(ids[0]).unwrap().parent(), None);
        assert_eq!(tree.node(ids[2]).unwrap().depth(), 2);
        assert_depth_invariant(&tree, ids[0]);
    }

    #[test]
    fn add_child_rejects_unknown_ids() {
        let (mut tree, ids) = tree_with(&["root", "gone"]);
        tree.destroy(ids[1]);
        assert_eq!(
            tree.add_child(ids[0], ids[1]),
            Err(SceneError::UnknownNode(ids[1]))
        );
    }

    // ── remove_child ──────────────────────────────────────────────────────

    #[test]
    fn remove_child_detaches_and_resets_depth() {
        let (mut tree, ids) = tree_with(&["root", "holder", "geo"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();

        let removed = tree.remove_child(ids[0], "holder");
        assert_eq!(removed, Some(ids[1]));

        let holder = tree.node(ids[1]).unwrap();
        assert_eq!(holder.depth(), 0);
        assert_eq!(holder.parent(), None);
        assert_eq!(tree.node(ids[2]).unwrap().depth(), 1);
        assert!(tree.node(ids[0]).unwrap().children().is_empty());
        // Still owned by the arena until destroyed.
        assert!(tree.contains(ids[2]));
    }

    #[test]
    fn remove_child_missing_name_is_none() {
        let (mut tree, ids) = tree_with(&["root", "a"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        assert_eq!(tree.remove_child(ids[0], "b"), None);
        assert_eq!(tree.node(ids[0]).unwrap().children(), &[ids[1]]);
    }

    #[test]
    fn detach_then_reattach_updates_world_transform() {
        let (mut tree, ids) = tree_with(&["root", "left", "right", "geo"]);
        for &h in &ids[1..3] {
            tree.add_child(ids[0], h).unwrap();
        }
        tree.set_local_transform(ids[1], Mat4::from_translation(Vec3::new(-10.0, 0.0, 0.0)))
            .unwrap();
        tree.set_local_transform(ids[2], Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)))
            .unwrap();
        tree.add_child(ids[1], ids[3]).unwrap();

        let geo = tree.remove_child(ids[1], "geo").unwrap();
        assert_eq!(tree.world_transform(geo), Some(Mat4::IDENTITY));

        tree.add_child(ids[2], geo).unwrap();
        assert_eq!(tree.node(geo).unwrap().depth(), 2);
        let pos = tree.world_transform(geo).unwrap() * Vec4::W;
        assert_eq!(pos, Vec4::new(10.0, 0.0, 0.0, 1.0));
    }

    // ── child lookup ──────────────────────────────────────────────────────

    #[test]
    fn child_searches_direct_children_only() {
        let (mut tree, ids) = tree_with(&["root", "X", "holder", "Y", "X"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[0], ids[2]).unwrap();
        tree.add_child(ids[2], ids[3]).unwrap();
        tree.add_child(ids[0], ids[4]).unwrap();

        // First match wins.
        assert_eq!(tree.child(ids[0], "X"), Some(ids[1]));
        // Grandchild is not found from the root.
        assert_eq!(tree.child(ids[0], "Y"), None);
        assert_eq!(tree.child(ids[0], "missing"), None);
        assert_eq!(tree.child(ids[2], "Y"), Some(ids[3]));
    }

    // ── world transform ───────────────────────────────────────────────────

    #[test]
    fn world_transform_composes_three_levels() {
        let (mut tree, ids) = tree_with(&["root", "holder", "geo"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();

        let r = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let h = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let g = Mat4::from_translation(Vec3::new(0.0, 0.0, 3.0));
        tree.set_local_transform(ids[0], r).unwrap();
        tree.set_local_transform(ids[1], h).unwrap();
        tree.set_local_transform(ids[2], g).unwrap();

        assert_eq!(tree.world_transform(ids[0]), Some(r));
        assert_eq!(tree.world_transform(ids[1]), Some(r * h));
        assert_eq!(tree.world_transform(ids[2]), Some(r * h * g));
    }

    #[test]
    fn rotating_holder_moves_geometry_around_y() {
        let (mut tree, ids) = tree_with(&["Root", "Earth Holder", "Earth Geometry"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        let translate = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        tree.set_local_transform(ids[2], translate).unwrap();

        let pos = tree.world_transform(ids[2]).unwrap() * Vec4::W;
        assert_eq!(pos, Vec4::new(5.0, 0.0, 0.0, 1.0));

        let theta = 0.7_f32;
        tree.set_local_transform(ids[1], Mat4::from_rotation_y(theta)).unwrap();
        let pos = tree.world_transform(ids[2]).unwrap() * Vec4::W;
        let expected = Mat4::from_rotation_y(theta) * translate * Vec4::W;
        assert!(pos.abs_diff_eq(expected, 1e-5), "{pos} != {expected}");
        assert!((pos.x - 5.0 * theta.cos()).abs() < 1e-5);
        assert!((pos.z + 5.0 * theta.sin()).abs() < 1e-5);
    }

    #[test]
    fn rotating_earth_holder_moves_the_moon() {
        let names = ["Root", "Earth Holder", "Earth Geometry", "Moon Holder", "Moon Geometry"];
        let (mut tree, ids) = tree_with(&names);
        for pair in ids.windows(2) {
            tree.add_child(pair[0], pair[1]).unwrap();
        }
        tree.set_local_transform(ids[2], Mat4::from_translation(Vec3::X * 5.0)).unwrap();
        tree.set_local_transform(ids[4], Mat4::from_translation(Vec3::X * 2.0)).unwrap();

        let before = tree.world_transform(ids[4]).unwrap() * Vec4::W;
        assert_eq!(before, Vec4::new(7.0, 0.0, 0.0, 1.0));

        tree.set_local_transform(ids[1], Mat4::from_rotation_y(std::f32::consts::FRAC_PI_2))
            .unwrap();
        let after = tree.world_transform(ids[4]).unwrap() * Vec4::W;
        assert!(after.abs_diff_eq(Vec4::new(0.0, 0.0, -7.0, 1.0), 1e-5), "{after}");
    }

    #[test]
    fn set_local_transform_assigns_the_matrix() {
        let (mut tree, ids) = tree_with(&["n"]);
        let m = Mat4::from_scale(Vec3::splat(3.0));
        tree.set_local_transform(ids[0], m).unwrap();
        assert_eq!(tree.local_transform(ids[0]), Some(m));
    }

    // ── traversal ─────────────────────────────────────────────────────────

    #[test]
    fn traverse_is_preorder_and_excludes_start() {
        //      root
        //     /    \
        //    a      d
        //   / \
        //  b   c
        let (mut tree, ids) = tree_with(&["root", "a", "b", "c", "d"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        tree.add_child(ids[1], ids[3]).unwrap();
        tree.add_child(ids[0], ids[4]).unwrap();

        let mut seen = Vec::new();
        tree.traverse(ids[0], |_, n| seen.push(n.name().to_string()));
        assert_eq!(seen, ["a", "b", "c", "d"]);
        assert_eq!(tree.descendants(ids[0]).len(), tree.len() - 1);
    }

    #[test]
    fn traverse_of_leaf_visits_nothing() {
        let (tree, ids) = tree_with(&["leaf"]);
        let mut count = 0;
        tree.traverse(ids[0], |_, _| count += 1);
        assert_eq!(count, 0);
    }

    // ── misc ──────────────────────────────────────────────────────────────

    #[test]
    fn path_joins_names_from_the_top() {
        let (mut tree, ids) = tree_with(&["Root", "Earth Holder", "Earth Geometry"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        assert_eq!(
            tree.path(ids[2]).as_deref(),
            Some("Root/Earth Holder/Earth Geometry")
        );
    }

    #[test]
    fn destroy_frees_whole_subtree() {
        let (mut tree, ids) = tree_with(&["root", "a", "b", "c"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        tree.add_child(ids[1], ids[2]).unwrap();
        tree.add_child(ids[0], ids[3]).unwrap();

        assert_eq!(tree.destroy(ids[1]), 2);
        assert!(!tree.contains(ids[2]));
        assert_eq!(tree.node(ids[0]).unwrap().children(), &[ids[3]]);
        assert_eq!(tree.destroy(ids[1]), 0);
    }

    #[test]
    fn insert_always_yields_a_detached_node() {
        let (mut tree, ids) = tree_with(&["root", "a"]);
        tree.add_child(ids[0], ids[1]).unwrap();
        let copy = tree.node(ids[1]).unwrap().clone();
        let id = tree.insert(copy);
        let n = tree.node(id).unwrap();
        assert_eq!(n.parent(), None);
        assert_eq!(n.depth(), 0);
    }
}
