//! GPU uniform block layouts (std140-compatible, 16-byte aligned fields).

use bytemuck::{Pod, Zeroable};

// ── per-object block ──────────────────────────────────────────────────────

/// Per-draw uniform block bound at group 0 with a dynamic offset.
///
/// Matches `struct Object` in every scene shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of model-view; maps normals into view space.
    pub normal: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    /// rgb, unused.
    pub color: [f32; 4],
    /// rgb, strength.
    pub ambient: [f32; 4],
    /// World-space xyz, 1.
    pub light_position: [f32; 4],
    /// Radiance rgb (color × intensity), unused.
    pub light_color: [f32; 4],
    /// World-space xyz, 1.
    pub camera_position: [f32; 4],
    /// x: toon shading, y: node has its own texture.
    pub flags: [u32; 4],
}

impl ObjectUniform {
    pub const SIZE: u64 = std::mem::size_of::<Self>() as u64;

    /// Distance between consecutive blocks in the dynamic uniform buffer.
    pub fn stride(min_alignment: u32) -> u64 {
        align_up(Self::SIZE, u64::from(min_alignment.max(1)))
    }
}

pub(super) fn object_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(ObjectUniform::SIZE)
}

// ── composite block ───────────────────────────────────────────────────────

/// Post-process toggles for the composite pass.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(super) struct PostUniform {
    /// x: horizontal mirror, y: vertical mirror, z: blur, w: grayscale.
    pub flags: [u32; 4],
    /// 1 / source size in texels.
    pub texel_size: [f32; 2],
    pub _pad: [f32; 2],
}

pub(super) fn post_min_binding_size() -> Option<std::num::NonZeroU64> {
    std::num::NonZeroU64::new(std::mem::size_of::<PostUniform>() as u64)
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}
