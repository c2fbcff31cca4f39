//! Solar system hierarchy.
//!
//! ```text
//! Root
//! ├─ PointLight ─ Sun Geometry
//! ├─ Earth Orbit
//! ├─ Earth Holder ─ Earth Geometry ─┬─ Moon Orbit
//! │                                 └─ Moon Holder ─ Moon Geometry
//! ├─ <Planet> Orbit, <Planet> Holder ─ <Planet> Geometry   (× 7)
//! ├─ Stars
//! ├─ Skybox
//! └─ Camera
//! ```
//!
//! Holders sit at the sun's position; rotating a holder carries its planet
//! (and everything below it) around the sun.

use std::collections::HashMap;

use glam::{Mat4, Vec3};
use orrery_engine::render::{ORBIT, PLANET, SKYBOX, STAR};
use orrery_engine::scene::{
    CameraNode, GeometryNode, MeshHandle, Motion, Node, NodeId, PointLightNode, SceneError,
    SceneGraph, SceneTree, TextureHandle,
};

/// Gap between consecutive planet orbits.
pub const ORBIT_SPACING: f32 = 5.0;
pub const SUN_SCALE: f32 = 3.0;
pub const MOON_SCALE: f32 = 0.5;
pub const STAR_FIELD_SCALE: f32 = 50.0;
pub const SKYBOX_SCALE: f32 = 90.0;
pub const CAMERA_START: Vec3 = Vec3::new(0.0, 0.0, 20.0);

/// A body drawn with the planet variant.
#[derive(Debug, Copy, Clone)]
pub struct Body {
    pub name: &'static str,
    pub color: Vec3,
}

const fn body(name: &'static str, r: f32, g: f32, b: f32) -> Body {
    Body {
        name,
        color: Vec3::new(r, g, b),
    }
}

pub const SUN: Body = body("Sun", 1.0, 1.0, 1.0);
pub const EARTH: Body = body("Earth", 0.2, 0.5, 0.8);
pub const MOON: Body = body("Moon", 0.75, 0.75, 0.75);

/// Planets beyond Earth's slot, innermost first. Earth keeps the first orbit
/// because it carries the moon.
pub const OUTER_PLANETS: [Body; 7] = [
    body("Mercury", 0.5, 0.5, 0.5),
    body("Venus", 0.95, 0.92, 0.84),
    body("Mars", 0.8, 0.4, 0.3),
    body("Jupiter", 0.8, 0.7, 0.6),
    body("Saturn", 0.9, 0.85, 0.75),
    body("Uranus", 0.5, 0.8, 0.9),
    body("Neptune", 0.1, 0.2, 0.9),
];

/// Cube map key in [`SolarAssets::textures`].
pub const SKYBOX_TEXTURE: &str = "Skybox";

/// Names of every body that looks up `<name>.png`.
pub fn textured_bodies() -> impl Iterator<Item = &'static str> {
    [SUN, EARTH, MOON]
        .into_iter()
        .chain(OUTER_PLANETS)
        .map(|b| b.name)
}

/// Loaded resources the scene refers to.
#[derive(Debug, Clone, Default)]
pub struct SolarAssets {
    pub sphere: MeshHandle,
    pub ring: MeshHandle,
    pub stars: MeshHandle,
    pub skybox: MeshHandle,
    /// Body name (or [`SKYBOX_TEXTURE`]) to texture. Missing entries render
    /// with the flat color / default texture.
    pub textures: HashMap<String, TextureHandle>,
}

impl SolarAssets {
    fn texture(&self, key: &str) -> Option<TextureHandle> {
        self.textures.get(key).copied()
    }

    fn planet(&self, body: Body) -> GeometryNode {
        let g = GeometryNode::new(PLANET, self.sphere, body.color);
        match self.texture(body.name) {
            Some(t) => g.with_texture(t),
            None => g,
        }
    }

    fn ring(&self, color: Vec3) -> GeometryNode {
        GeometryNode::new(ORBIT, self.ring, color).with_motion(Motion::Static)
    }
}

/// Builds the full solar system for a viewport of the given aspect ratio.
pub fn build_scene(assets: &SolarAssets, aspect: f32) -> Result<SceneGraph, SceneError> {
    let mut graph = SceneGraph::new("Solar System");
    let tree = graph.tree_mut();

    let root = tree.insert(Node::group("Root"));

    // Sun: light at the origin, self-lit body below it.
    let light = tree.insert(Node::point_light(
        "PointLight",
        PointLightNode::new(Vec3::ONE, 1.0),
    ));
    tree.add_child(root, light)?;
    let sun = tree.insert(
        Node::geometry(
            "Sun Geometry",
            assets.planet(SUN).with_motion(Motion::Static),
        )
        .with_local_transform(Mat4::from_scale(Vec3::splat(SUN_SCALE))),
    );
    tree.add_child(light, sun)?;

    // Earth and moon.
    let earth_geo = add_planet(tree, root, assets, EARTH, ORBIT_SPACING)?;

    let moon_distance = ORBIT_SPACING * MOON_SCALE;
    let moon_orbit = tree.insert(
        Node::geometry("Moon Orbit", assets.ring(MOON.color))
            .with_local_transform(Mat4::from_scale(Vec3::splat(moon_distance))),
    );
    tree.add_child(earth_geo, moon_orbit)?;
    let moon_holder = tree.insert(Node::group("Moon Holder"));
    tree.add_child(earth_geo, moon_holder)?;
    let moon = tree.insert(
        Node::geometry("Moon Geometry", assets.planet(MOON)).with_local_transform(
            Mat4::from_scale(Vec3::splat(MOON_SCALE))
                * Mat4::from_translation(Vec3::X * ORBIT_SPACING),
        ),
    );
    tree.add_child(moon_holder, moon)?;

    for (i, planet) in OUTER_PLANETS.into_iter().enumerate() {
        let distance = ORBIT_SPACING * (i as f32 + 2.0);
        add_planet(tree, root, assets, planet, distance)?;
    }

    // Backdrop.
    let stars = tree.insert(
        Node::geometry(
            "Stars",
            GeometryNode::new(STAR, assets.stars, Vec3::ONE).with_motion(Motion::Static),
        )
        .with_local_transform(Mat4::from_scale(Vec3::splat(STAR_FIELD_SCALE))),
    );
    tree.add_child(root, stars)?;

    let mut skybox_geo =
        GeometryNode::new(SKYBOX, assets.skybox, Vec3::ONE).with_motion(Motion::Static);
    skybox_geo.set_texture(assets.texture(SKYBOX_TEXTURE));
    let skybox = tree.insert(
        Node::geometry("Skybox", skybox_geo)
            .with_local_transform(Mat4::from_scale(Vec3::splat(SKYBOX_SCALE))),
    );
    tree.add_child(root, skybox)?;

    let camera = tree.insert(
        Node::camera("Camera", CameraNode::perspective(aspect))
            .with_local_transform(Mat4::from_translation(CAMERA_START)),
    );
    tree.add_child(root, camera)?;

    graph.set_root(root);
    graph.set_directional_light(light);
    graph.set_camera(camera);
    Ok(graph)
}

/// Adds `<name> Orbit` and `<name> Holder ─ <name> Geometry` under `root`.
/// Returns the geometry node.
fn add_planet(
    tree: &mut SceneTree,
    root: NodeId,
    assets: &SolarAssets,
    planet: Body,
    distance: f32,
) -> Result<NodeId, SceneError> {
    let orbit = tree.insert(
        Node::geometry(format!("{} Orbit", planet.name), assets.ring(planet.color))
            .with_local_transform(Mat4::from_scale(Vec3::splat(distance))),
    );
    tree.add_child(root, orbit)?;

    let holder = tree.insert(Node::group(format!("{} Holder", planet.name)));
    tree.add_child(root, holder)?;

    let geo = tree.insert(
        Node::geometry(format!("{} Geometry", planet.name), assets.planet(planet))
            .with_local_transform(Mat4::from_translation(Vec3::X * distance)),
    );
    tree.add_child(holder, geo)?;
    Ok(geo)
}
