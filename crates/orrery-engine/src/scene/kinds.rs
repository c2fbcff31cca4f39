use glam::{Mat4, Vec3};

use super::{MeshHandle, TextureHandle};

/// Vertical field of view used by perspective cameras, in degrees.
pub const FIELD_OF_VIEW_Y_DEG: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 200.0;

/// Payload attached to a [`Node`](super::Node).
///
/// `Group` nodes carry no rendering payload and exist to hold a transform
/// that propagates to their children (orbit holders, the root).
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NodeKind {
    #[default]
    Group,
    Camera(CameraNode),
    Geometry(GeometryNode),
    PointLight(PointLightNode),
}

// ── camera ────────────────────────────────────────────────────────────────

/// Camera payload: projection state.
///
/// Which camera is active is tracked by [`SceneGraph`](super::SceneGraph);
/// `enabled` is informational only.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraNode {
    enabled: bool,
    perspective: bool,
    /// Half of the visible height for orthographic cameras.
    ortho_half_height: f32,
    projection: Mat4,
}

impl CameraNode {
    /// Perspective camera for the given aspect ratio (width / height).
    pub fn perspective(aspect: f32) -> Self {
        Self {
            enabled: true,
            perspective: true,
            ortho_half_height: 1.0,
            projection: perspective_projection(aspect),
        }
    }

    /// Orthographic camera showing `2 * half_height` world units vertically.
    pub fn orthographic(half_height: f32, aspect: f32) -> Self {
        Self {
            enabled: true,
            perspective: false,
            ortho_half_height: half_height,
            projection: orthographic_projection(half_height, aspect),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_perspective(&self) -> bool {
        self.perspective
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Recomputes the projection for a new viewport aspect ratio.
    pub fn set_aspect(&mut self, aspect: f32) {
        self.projection = if self.perspective {
            perspective_projection(aspect)
        } else {
            orthographic_projection(self.ortho_half_height, aspect)
        };
    }
}

/// Right-handed perspective projection with a 0..1 depth range.
///
/// Degenerate aspect ratios (minimized window) are clamped to a tiny positive value.
pub fn perspective_projection(aspect: f32) -> Mat4 {
    Mat4::perspective_rh(
        FIELD_OF_VIEW_Y_DEG.to_radians(),
        sanitize_aspect(aspect),
        NEAR_PLANE,
        FAR_PLANE,
    )
}

fn orthographic_projection(half_height: f32, aspect: f32) -> Mat4 {
    let half_width = half_height * sanitize_aspect(aspect);
    Mat4::orthographic_rh(
        -half_width,
        half_width,
        -half_height,
        half_height,
        NEAR_PLANE,
        FAR_PLANE,
    )
}

fn sanitize_aspect(aspect: f32) -> f32 {
    if aspect.is_finite() && aspect > 0.0 {
        aspect
    } else {
        1.0
    }
}

// ── geometry ──────────────────────────────────────────────────────────────

/// Whether the render pass animates a geometry node's parent holder.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum Motion {
    /// Rotate the parent holder around world +Y each frame.
    #[default]
    Orbit,
    /// Never animated (light source geometry, orbit rings, backdrops).
    Static,
}

/// Drawable payload: shader variant, mesh, material.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryNode {
    shader: String,
    mesh: MeshHandle,
    color: Vec3,
    texture: Option<TextureHandle>,
    motion: Motion,
}

impl GeometryNode {
    pub fn new(shader: impl Into<String>, mesh: MeshHandle, color: Vec3) -> Self {
        Self {
            shader: shader.into(),
            mesh,
            color,
            texture: None,
            motion: Motion::default(),
        }
    }

    pub fn with_texture(mut self, texture: TextureHandle) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn with_motion(mut self, motion: Motion) -> Self {
        self.motion = motion;
        self
    }

    /// Shader-variant key into the shader registry.
    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn mesh(&self) -> MeshHandle {
        self.mesh
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn texture(&self) -> Option<TextureHandle> {
        self.texture
    }

    pub fn set_texture(&mut self, texture: Option<TextureHandle>) {
        self.texture = texture;
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }
}

// ── light ─────────────────────────────────────────────────────────────────

/// Point light payload.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointLightNode {
    color: Vec3,
    intensity: f32,
}

impl PointLightNode {
    pub fn new(color: Vec3, intensity: f32) -> Self {
        Self { color, intensity }
    }

    pub fn color(&self) -> Vec3 {
        self.color
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Color scaled by intensity, as uploaded to shaders.
    pub fn radiance(&self) -> Vec3 {
        self.color * self.intensity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perspective_camera_recomputes_on_aspect_change() {
        let mut cam = CameraNode::perspective(1.0);
        let square = cam.projection();
        cam.set_aspect(2.0);
        assert_ne!(cam.projection(), square);
        assert_eq!(cam.projection(), perspective_projection(2.0));
        assert!(cam.is_perspective());
    }

    #[test]
    fn orthographic_camera_keeps_its_mode() {
        let mut cam = CameraNode::orthographic(5.0, 1.0);
        cam.set_aspect(2.0);
        assert!(!cam.is_perspective());
        assert_eq!(cam.projection(), orthographic_projection(5.0, 2.0));
    }

    #[test]
    fn degenerate_aspect_is_finite() {
        let m = perspective_projection(0.0);
        assert!(m.is_finite());
    }

    #[test]
    fn geometry_defaults_to_orbit_without_texture() {
        let g = GeometryNode::new("planet", MeshHandle::default(), Vec3::ONE);
        assert_eq!(g.motion(), Motion::Orbit);
        assert!(g.texture().is_none());
        assert_eq!(g.shader(), "planet");
    }

    #[test]
    fn light_radiance_scales_color() {
        let l = PointLightNode::new(Vec3::new(1.0, 0.5, 0.25), 2.0);
        assert_eq!(l.radiance(), Vec3::new(2.0, 1.0, 0.5));
    }
}
