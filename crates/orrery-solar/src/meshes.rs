//! Procedural meshes for the solar scene.

use std::f32::consts::{PI, TAU};

use orrery_engine::render::{MeshData, MeshVertex, Topology};
use rand::Rng;

/// Unit sphere with outward normals and equirectangular UVs.
///
/// `stacks` rings from pole to pole, `slices` segments around +Y. The seam
/// column is duplicated so UVs wrap cleanly.
pub fn uv_sphere(stacks: u32, slices: u32) -> MeshData {
    let stacks = stacks.max(2);
    let slices = slices.max(3);

    let mut vertices = Vec::with_capacity(((stacks + 1) * (slices + 1)) as usize);
    for i in 0..=stacks {
        let v = i as f32 / stacks as f32;
        let theta = v * PI;
        for j in 0..=slices {
            let u = j as f32 / slices as f32;
            let phi = u * TAU;
            let p = [theta.sin() * phi.cos(), theta.cos(), -theta.sin() * phi.sin()];
            vertices.push(MeshVertex {
                position: p,
                normal: p,
                uv: [u, v],
                color: [1.0; 3],
            });
        }
    }

    let row = slices + 1;
    let mut indices = Vec::with_capacity((stacks * slices * 6) as usize);
    for i in 0..stacks {
        for j in 0..slices {
            let a = i * row + j;
            let b = a + row;
            indices.extend_from_slice(&[a, b, a + 1, a + 1, b, b + 1]);
        }
    }

    MeshData {
        vertices,
        indices: Some(indices),
        topology: Topology::TriangleList,
    }
}

/// Unit circle in the XZ plane as a closed line strip (first point repeated).
pub fn orbit_ring(segments: u32) -> MeshData {
    let segments = segments.max(3);
    let vertices = (0..=segments)
        .map(|i| {
            let a = i as f32 / segments as f32 * TAU;
            MeshVertex::at([a.cos(), 0.0, a.sin()])
        })
        .collect();

    MeshData {
        vertices,
        indices: None,
        topology: Topology::LineStrip,
    }
}

/// `count` points in the cube [-1, 1]³ with random light tints.
pub fn star_field(count: usize, rng: &mut impl Rng) -> MeshData {
    let vertices = (0..count)
        .map(|_| MeshVertex {
            position: [
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
                rng.random_range(-1.0..=1.0),
            ],
            color: [
                rng.random_range(0.5..=1.0),
                rng.random_range(0.5..=1.0),
                rng.random_range(0.5..=1.0),
            ],
            ..MeshVertex::default()
        })
        .collect();

    MeshData {
        vertices,
        indices: None,
        topology: Topology::PointList,
    }
}

/// Cube [-1, 1]³ for the skybox; the cube map is sampled by position.
pub fn skybox_cube() -> MeshData {
    let vertices = [
        [-1.0, -1.0, -1.0],
        [1.0, -1.0, -1.0],
        [1.0, 1.0, -1.0],
        [-1.0, 1.0, -1.0],
        [-1.0, -1.0, 1.0],
        [1.0, -1.0, 1.0],
        [1.0, 1.0, 1.0],
        [-1.0, 1.0, 1.0],
    ]
    .map(MeshVertex::at)
    .to_vec();

    #[rustfmt::skip]
    let indices = vec![
        0, 1, 2, 0, 2, 3, // -z
        4, 6, 5, 4, 7, 6, // +z
        0, 3, 7, 0, 7, 4, // -x
        1, 5, 6, 1, 6, 2, // +x
        3, 2, 6, 3, 6, 7, // +y
        0, 4, 5, 0, 5, 1, // -y
    ];

    MeshData {
        vertices,
        indices: Some(indices),
        topology: Topology::TriangleList,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // ── sphere ──────────────────────────────────────────────────────────────

    #[test]
    fn sphere_counts_and_validity() {
        let mesh = uv_sphere(8, 16);
        assert_eq!(mesh.vertices.len(), 9 * 17);
        assert_eq!(mesh.indices.as_ref().map(Vec::len), Some(8 * 16 * 6));
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn sphere_normals_are_unit_positions() {
        for v in uv_sphere(6, 12).vertices {
            let p = Vec3::from(v.position);
            assert!((p.length() - 1.0).abs() < 1e-5);
            assert_eq!(v.normal, v.position);
            assert!((0.0..=1.0).contains(&v.uv[0]) && (0.0..=1.0).contains(&v.uv[1]));
        }
    }

    #[test]
    fn sphere_clamps_degenerate_resolution() {
        assert!(uv_sphere(0, 0).validate().is_ok());
    }

    // ── ring ────────────────────────────────────────────────────────────────

    #[test]
    fn ring_is_closed_unit_circle() {
        let ring = orbit_ring(64);
        assert_eq!(ring.vertices.len(), 65);
        assert!(ring.indices.is_none());
        assert_eq!(ring.topology, Topology::LineStrip);

        let first = Vec3::from(ring.vertices[0].position);
        let last = Vec3::from(ring.vertices[64].position);
        assert!(first.abs_diff_eq(last, 1e-5));
        for v in &ring.vertices {
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-5);
            assert_eq!(v.position[1], 0.0);
        }
    }

    // ── stars ───────────────────────────────────────────────────────────────

    #[test]
    fn stars_stay_in_unit_cube() {
        let mut rng = StdRng::seed_from_u64(7);
        let stars = star_field(500, &mut rng);
        assert_eq!(stars.vertices.len(), 500);
        assert_eq!(stars.topology, Topology::PointList);
        for v in &stars.vertices {
            assert!(v.position.iter().all(|c| (-1.0..=1.0).contains(c)));
            assert!(v.color.iter().all(|c| (0.5..=1.0).contains(c)));
        }
    }

    // ── skybox ──────────────────────────────────────────────────────────────

    #[test]
    fn skybox_has_twelve_triangles() {
        let cube = skybox_cube();
        assert_eq!(cube.vertices.len(), 8);
        assert_eq!(cube.indices.as_ref().map(Vec::len), Some(36));
        assert!(cube.validate().is_ok());
    }
}
