use std::sync::Arc;

use bytemuck::Zeroable;
use glam::{Mat4, Vec3, Vec4};

use crate::scene::{MeshHandle, Motion, NodeId, SceneGraph, SceneTree, TextureHandle};

use super::error::RenderError;
use super::mesh::{MeshCatalog, Topology};
use super::shader::{ShaderRegistry, ShaderVariant, TextureSlot};
use super::uniforms::ObjectUniform;

/// Angular speed of orbit holders around +Y, in radians per second.
pub const ORBIT_SPEED: f32 = 0.6;

/// Ambient strength of geometry that is not the light source's own body.
pub const AMBIENT_STRENGTH: f32 = 0.2;

const AMBIENT_COLOR: Vec3 = Vec3::ONE;

/// Per-frame inputs to [`plan_frame`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameParams {
    /// Clamped frame delta in seconds.
    pub dt: f32,
    /// Whether orbit holders advance this frame.
    pub rotating: bool,
    pub toon_shading: bool,
}

impl Default for FrameParams {
    fn default() -> Self {
        Self {
            dt: 0.0,
            rotating: true,
            toon_shading: false,
        }
    }
}

/// How a draw consumes its mesh.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawRange {
    /// Mesh has an index buffer.
    Indexed { count: u32 },
    Vertices { count: u32 },
}

/// One resolved geometry node, ready for the GPU.
#[derive(Debug, Clone)]
pub struct DrawItem {
    pub node: NodeId,
    pub shader: Arc<str>,
    pub mesh: MeshHandle,
    pub topology: Topology,
    pub texture_slot: TextureSlot,
    /// The node's own texture. `None` with a sampling variant binds the default.
    pub texture: Option<TextureHandle>,
    pub range: DrawRange,
    pub uniform: ObjectUniform,
}

/// Draws of one frame in traversal order.
#[derive(Debug, Default)]
pub struct DrawList {
    items: Vec<DrawItem>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops all items but keeps the allocation.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawItem> {
        self.items.iter()
    }
}

/// Ids the render pass needs, checked once per frame.
#[derive(Debug, Copy, Clone)]
struct Actors {
    root: NodeId,
    camera: NodeId,
    light: NodeId,
}

/// Animates and resolves one frame of `graph` into `out`.
///
/// Descendants of the root are visited in pre-order. For each geometry node,
/// first its orbit animation is applied (when `params.rotating` and the node's
/// motion is [`Motion::Orbit`], the parent holder's local transform is
/// post-multiplied by a rotation of `dt × ORBIT_SPEED` about +Y), then its
/// draw is recorded. World transforms are recomputed per draw, so a holder
/// rotated earlier in the walk is already reflected in later draws.
///
/// `out` is cleared first. On error it holds the draws recorded before the
/// failing node; callers must not submit it.
pub fn plan_frame<C>(
    graph: &mut SceneGraph,
    shaders: &ShaderRegistry,
    meshes: &C,
    params: FrameParams,
    out: &mut DrawList,
) -> Result<(), RenderError>
where
    C: MeshCatalog + ?Sized,
{
    out.clear();
    let actors = check_preconditions(graph)?;

    let ids = graph.tree().descendants(actors.root);
    for id in ids {
        if params.rotating {
            advance_orbit(graph.tree_mut(), id, params.dt);
        }
        if let Some(item) = resolve_draw(graph, shaders, meshes, params, actors, id)? {
            out.items.push(item);
        }
    }

    Ok(())
}

fn check_preconditions(graph: &SceneGraph) -> Result<Actors, RenderError> {
    let tree = graph.tree();

    let root = graph
        .root()
        .filter(|&r| tree.contains(r))
        .ok_or(RenderError::MissingRoot)?;
    let camera = graph
        .camera()
        .filter(|_| graph.camera_node().is_some())
        .ok_or(RenderError::MissingCamera)?;
    let light = graph
        .directional_light()
        .filter(|_| graph.light_node().is_some())
        .ok_or(RenderError::MissingLight)?;

    debug_assert!(
        tree.is_ancestor(root, camera),
        "active camera is not attached under the root"
    );
    debug_assert!(
        tree.is_ancestor(root, light),
        "active light is not attached under the root"
    );

    Ok(Actors { root, camera, light })
}

fn advance_orbit(tree: &mut SceneTree, id: NodeId, dt: f32) {
    let Some(node) = tree.node(id) else { return };
    let orbiting = node
        .as_geometry()
        .is_some_and(|g| g.motion() == Motion::Orbit);
    let Some(parent) = node.parent().filter(|_| orbiting) else { return };

    if let Some(holder) = tree.node_mut(parent) {
        let local = holder.local_transform() * Mat4::from_rotation_y(dt * ORBIT_SPEED);
        holder.set_local_transform(local);
    }
}

fn resolve_draw<C>(
    graph: &SceneGraph,
    shaders: &ShaderRegistry,
    meshes: &C,
    params: FrameParams,
    actors: Actors,
    id: NodeId,
) -> Result<Option<DrawItem>, RenderError>
where
    C: MeshCatalog + ?Sized,
{
    let tree = graph.tree();
    let Some(node) = tree.node(id) else { return Ok(None) };
    let Some(geometry) = node.as_geometry() else { return Ok(None) };

    let variant = shaders
        .get(geometry.shader())
        .ok_or_else(|| RenderError::UnknownShader {
            node: node.name().to_string(),
            shader: geometry.shader().to_string(),
        })?;
    let mesh = meshes
        .mesh_info(geometry.mesh())
        .ok_or_else(|| RenderError::UnknownMesh {
            node: node.name().to_string(),
        })?;

    let world = tree.world_transform(id).unwrap_or(Mat4::IDENTITY);
    let camera_world = tree.world_transform(actors.camera).unwrap_or(Mat4::IDENTITY);
    let light_world = tree.world_transform(actors.light).unwrap_or(Mat4::IDENTITY);
    let view = camera_world.inverse();

    let projection = graph
        .camera_node()
        .map(|c| c.projection())
        .ok_or(RenderError::MissingCamera)?;
    let light = graph.light_node().ok_or(RenderError::MissingLight)?;

    let ambient_strength = if node.parent() == Some(actors.light) {
        light.intensity()
    } else {
        AMBIENT_STRENGTH
    };

    let resolved = Resolved {
        world,
        view,
        projection,
        color: geometry.color(),
        ambient_strength,
        light_position: light_world * Vec4::W,
        light_radiance: light.radiance(),
        camera_position: camera_world * Vec4::W,
        toon: params.toon_shading,
        has_texture: geometry.texture().is_some(),
    };

    let texture = if variant.texture == TextureSlot::None {
        None
    } else {
        geometry.texture()
    };

    let range = match mesh.index_count {
        Some(count) => DrawRange::Indexed { count },
        None => DrawRange::Vertices {
            count: mesh.vertex_count,
        },
    };

    Ok(Some(DrawItem {
        node: id,
        shader: Arc::clone(&variant.name),
        mesh: geometry.mesh(),
        topology: mesh.topology,
        texture_slot: variant.texture,
        texture,
        range,
        uniform: fill_uniform(variant, &resolved),
    }))
}

/// Everything a draw could upload, before slot filtering.
struct Resolved {
    world: Mat4,
    view: Mat4,
    projection: Mat4,
    color: Vec3,
    ambient_strength: f32,
    light_position: Vec4,
    light_radiance: Vec3,
    camera_position: Vec4,
    toon: bool,
    has_texture: bool,
}

/// Normal matrix for view-space normals: inverse transpose of model-view.
pub(crate) fn normal_matrix(view: Mat4, model: Mat4) -> Mat4 {
    (view * model).inverse().transpose()
}

fn fill_uniform(variant: &ShaderVariant, r: &Resolved) -> ObjectUniform {
    let slots = variant.uniforms;
    let mut u = ObjectUniform::zeroed();

    if slots.model {
        u.model = r.world.to_cols_array_2d();
    }
    if slots.normal {
        u.normal = normal_matrix(r.view, r.world).to_cols_array_2d();
    }
    if slots.view {
        u.view = r.view.to_cols_array_2d();
    }
    if slots.projection {
        u.projection = r.projection.to_cols_array_2d();
    }
    if slots.color {
        u.color = r.color.extend(1.0).to_array();
    }
    if slots.lighting {
        u.ambient = AMBIENT_COLOR.extend(r.ambient_strength).to_array();
        u.light_position = r.light_position.to_array();
        u.light_color = r.light_radiance.extend(1.0).to_array();
    }
    if slots.camera_position {
        u.camera_position = r.camera_position.to_array();
    }
    if slots.toon {
        u.flags[0] = u32::from(r.toon);
    }
    if variant.texture != TextureSlot::None {
        u.flags[1] = u32::from(r.has_texture);
    }

    u
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mesh::MeshInfo;
    use crate::render::shader::{ORBIT, PLANET};
    use crate::scene::{CameraNode, GeometryNode, Node, PointLightNode};
    use slotmap::SlotMap;

    struct Fixture {
        graph: SceneGraph,
        catalog: SlotMap<MeshHandle, MeshInfo>,
        shaders: ShaderRegistry,
        sun: NodeId,
        earth_holder: NodeId,
        earth: NodeId,
        ring: NodeId,
        moon: NodeId,
        camera: NodeId,
    }

    /// Root ─ PointLight ─ Sun
    ///      ├ Earth Orbit (ring)
    ///      ├ Earth Holder ─ Earth ─ Moon Holder ─ Moon
    ///      └ Camera
    fn fixture() -> Fixture {
        let mut catalog = SlotMap::with_key();
        let sphere = catalog.insert(MeshInfo {
            topology: Topology::TriangleList,
            vertex_count: 4,
            index_count: Some(6),
        });
        let ring_mesh = catalog.insert(MeshInfo {
            topology: Topology::LineStrip,
            vertex_count: 129,
            index_count: None,
        });

        let mut graph = SceneGraph::new("test");
        let t = graph.tree_mut();

        let root = t.insert(Node::group("Root"));
        let light = t.insert(Node::point_light(
            "PointLight",
            PointLightNode::new(Vec3::ONE, 1.5),
        ));
        let sun = t.insert(Node::geometry(
            "Sun",
            GeometryNode::new(PLANET, sphere, Vec3::ONE).with_motion(Motion::Static),
        ));
        let ring = t.insert(
            Node::geometry(
                "Earth Orbit",
                GeometryNode::new(ORBIT, ring_mesh, Vec3::new(0.2, 0.5, 0.8))
                    .with_motion(Motion::Static),
            )
            .with_local_transform(Mat4::from_scale(Vec3::splat(5.0))),
        );
        let earth_holder = t.insert(Node::group("Earth Holder"));
        let earth = t.insert(
            Node::geometry("Earth", GeometryNode::new(PLANET, sphere, Vec3::Z))
                .with_local_transform(Mat4::from_translation(Vec3::X * 5.0)),
        );
        let moon_holder = t.insert(Node::group("Moon Holder"));
        let moon = t.insert(
            Node::geometry("Moon", GeometryNode::new(PLANET, sphere, Vec3::ONE))
                .with_local_transform(Mat4::from_translation(Vec3::X * 2.0)),
        );
        let camera = t.insert(
            Node::camera("Camera", CameraNode::perspective(1.0))
                .with_local_transform(Mat4::from_translation(Vec3::Z * 20.0)),
        );

        t.add_child(root, light).unwrap();
        t.add_child(light, sun).unwrap();
        t.add_child(root, ring).unwrap();
        t.add_child(root, earth_holder).unwrap();
        t.add_child(earth_holder, earth).unwrap();
        t.add_child(earth, moon_holder).unwrap();
        t.add_child(moon_holder, moon).unwrap();
        t.add_child(root, camera).unwrap();

        graph.set_root(root);
        graph.set_camera(camera);
        graph.set_directional_light(light);

        Fixture {
            graph,
            catalog,
            shaders: ShaderRegistry::with_builtin(),
            sun,
            earth_holder,
            earth,
            ring,
            moon,
            camera,
        }
    }

    fn plan(f: &mut Fixture, params: FrameParams) -> Result<DrawList, RenderError> {
        let mut out = DrawList::new();
        plan_frame(&mut f.graph, &f.shaders, &f.catalog, params, &mut out)?;
        Ok(out)
    }

    fn still() -> FrameParams {
        FrameParams {
            rotating: false,
            ..FrameParams::default()
        }
    }

    fn item(list: &DrawList, node: NodeId) -> &DrawItem {
        list.iter().find(|d| d.node == node).unwrap()
    }

    // ── preconditions ─────────────────────────────────────────────────────

    #[test]
    fn missing_root_camera_or_light_is_fatal() {
        let mut f = fixture();
        let mut empty = SceneGraph::new("empty");
        let mut out = DrawList::new();
        assert_eq!(
            plan_frame(&mut empty, &f.shaders, &f.catalog, still(), &mut out),
            Err(RenderError::MissingRoot)
        );

        // Camera pointing at a non-camera node.
        let earth = f.earth;
        f.graph.set_camera(earth);
        assert_eq!(plan(&mut f, still()).unwrap_err(), RenderError::MissingCamera);

        let mut f = fixture();
        let sun = f.sun;
        f.graph.set_directional_light(sun);
        assert_eq!(plan(&mut f, still()).unwrap_err(), RenderError::MissingLight);
    }

    #[test]
    fn unknown_shader_and_mesh_are_reported() {
        let mut f = fixture();
        f.shaders = ShaderRegistry::new();
        assert!(matches!(
            plan(&mut f, still()),
            Err(RenderError::UnknownShader { ref shader, .. }) if shader == PLANET
        ));

        let mut f = fixture();
        f.catalog.clear();
        assert!(matches!(
            plan(&mut f, still()),
            Err(RenderError::UnknownMesh { ref node }) if node == "Sun"
        ));
    }

    // ── draw recording ────────────────────────────────────────────────────

    #[test]
    fn one_draw_per_geometry_in_traversal_order() {
        let mut f = fixture();
        let list = plan(&mut f, still()).unwrap();
        let order: Vec<NodeId> = list.iter().map(|d| d.node).collect();
        assert_eq!(order, [f.sun, f.ring, f.earth, f.moon]);

        // Replanning reuses the list from scratch.
        let mut out = list;
        plan_frame(&mut f.graph, &f.shaders, &f.catalog, still(), &mut out).unwrap();
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn draws_share_the_variant_name() {
        let mut f = fixture();
        let list = plan(&mut f, still()).unwrap();
        let planet = f.shaders.get(PLANET).unwrap();
        assert!(Arc::ptr_eq(&item(&list, f.earth).shader, &planet.name));
        assert_eq!(&*item(&list, f.ring).shader, ORBIT);
    }

    #[test]
    fn indexed_draw_only_when_mesh_has_indices() {
        let mut f = fixture();
        let list = plan(&mut f, still()).unwrap();
        assert_eq!(item(&list, f.earth).range, DrawRange::Indexed { count: 6 });
        assert_eq!(item(&list, f.ring).range, DrawRange::Vertices { count: 129 });
        assert_eq!(item(&list, f.ring).topology, Topology::LineStrip);
    }

    #[test]
    fn undeclared_slots_stay_zeroed() {
        let mut f = fixture();
        let list = plan(&mut f, FrameParams { toon_shading: true, ..still() }).unwrap();

        let ring = &item(&list, f.ring).uniform;
        assert_eq!(ring.color, [0.2, 0.5, 0.8, 1.0]);
        assert_eq!(ring.normal, [[0.0; 4]; 4]);
        assert_eq!(ring.ambient, [0.0; 4]);
        assert_eq!(ring.flags, [0; 4]);
        assert_eq!(item(&list, f.ring).texture_slot, TextureSlot::None);

        let earth = &item(&list, f.earth).uniform;
        assert_eq!(earth.flags[0], 1);
        assert_eq!(earth.light_color, [1.5, 1.5, 1.5, 1.0]);
        assert_eq!(earth.camera_position, [0.0, 0.0, 20.0, 1.0]);
    }

    #[test]
    fn light_body_is_self_lit() {
        let mut f = fixture();
        let list = plan(&mut f, still()).unwrap();
        assert_eq!(item(&list, f.sun).uniform.ambient[3], 1.5);
        assert_eq!(item(&list, f.earth).uniform.ambient[3], AMBIENT_STRENGTH);
    }

    #[test]
    fn view_and_normal_matrices() {
        let mut f = fixture();
        // Non-uniform scale so the inverse transpose differs from the model-view.
        let earth = f.earth;
        let squash = Mat4::from_translation(Vec3::X * 5.0) * Mat4::from_scale(Vec3::new(1.0, 3.0, 1.0));
        f.graph.tree_mut().set_local_transform(earth, squash).unwrap();

        let list = plan(&mut f, still()).unwrap();
        let u = &item(&list, earth).uniform;

        let view = Mat4::from_translation(Vec3::Z * -20.0);
        assert!(Mat4::from_cols_array_2d(&u.view).abs_diff_eq(view, 1e-5));

        let model_view = view * squash;
        let normal = Mat4::from_cols_array_2d(&u.normal);
        assert!(normal.abs_diff_eq(model_view.inverse().transpose(), 1e-5));

        // A surface tangent and its normal stay perpendicular after transform.
        let tangent = Vec3::new(1.0, 1.0, 0.0);
        let n = Vec3::new(1.0, -1.0, 0.0);
        let t_view = model_view.transform_vector3(tangent);
        let n_view = normal.transform_vector3(n);
        assert!(t_view.dot(n_view).abs() < 1e-5);
    }

    // ── animation ─────────────────────────────────────────────────────────

    #[test]
    fn orbit_rotates_parent_holder_only() {
        let mut f = fixture();
        let params = FrameParams { dt: 0.5, ..FrameParams::default() };
        plan(&mut f, params).unwrap();

        let tree = f.graph.tree();
        let expected = Mat4::from_rotation_y(0.5 * ORBIT_SPEED);
        assert!(tree.local_transform(f.earth_holder).unwrap().abs_diff_eq(expected, 1e-6));
        // Geometry's own local is untouched.
        assert_eq!(
            tree.local_transform(f.earth),
            Some(Mat4::from_translation(Vec3::X * 5.0))
        );
        // Static sun leaves the light alone.
        let light = f.graph.directional_light().unwrap();
        assert_eq!(tree.local_transform(light), Some(Mat4::IDENTITY));
        // Camera is not affected.
        assert_eq!(
            tree.world_transform(f.camera),
            Some(Mat4::from_translation(Vec3::Z * 20.0))
        );
    }

    #[test]
    fn paused_rotation_leaves_transforms() {
        let mut f = fixture();
        plan(&mut f, FrameParams { dt: 1.0, ..still() }).unwrap();
        assert_eq!(
            f.graph.tree().local_transform(f.earth_holder),
            Some(Mat4::IDENTITY)
        );
    }

    #[test]
    fn holder_rotation_carries_the_moon() {
        let mut f = fixture();
        let before = plan(&mut f, still()).unwrap();
        let moon_before = Mat4::from_cols_array_2d(&item(&before, f.moon).uniform.model);

        let after = plan(&mut f, FrameParams { dt: 0.25, ..FrameParams::default() }).unwrap();
        let moon_after = Mat4::from_cols_array_2d(&item(&after, f.moon).uniform.model);

        let earth_after = Mat4::from_cols_array_2d(&item(&after, f.earth).uniform.model);

        let p0 = moon_before * Vec4::W;
        let p1 = moon_after * Vec4::W;
        assert!(p0.abs_diff_eq(Vec4::new(7.0, 0.0, 0.0, 1.0), 1e-5));
        assert!(!p0.abs_diff_eq(p1, 1e-3));
        // The moon keeps its distance to the moved earth.
        let earth = (earth_after * Vec4::W).truncate();
        assert!((earth.length() - 5.0).abs() < 1e-4);
        assert!((p1.truncate().distance(earth) - 2.0).abs() < 1e-4);
    }
}
