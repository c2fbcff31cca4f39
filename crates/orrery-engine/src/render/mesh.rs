use anyhow::{ensure, Context, Result};
use bytemuck::{Pod, Zeroable};
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::scene::MeshHandle;

// ── vertex ────────────────────────────────────────────────────────────────

/// Interleaved vertex shared by every mesh.
///
/// Variants ignore the attributes they do not use (stars only read position
/// and color, orbits only position).
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 3],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3, // position
        1 => Float32x3, // normal
        2 => Float32x2, // uv
        3 => Float32x3  // color
    ];

    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub(super) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

/// Primitive topology of a mesh.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum Topology {
    #[default]
    TriangleList,
    LineStrip,
    PointList,
}

impl Topology {
    pub fn to_wgpu(self) -> wgpu::PrimitiveTopology {
        match self {
            Topology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            Topology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Topology::PointList => wgpu::PrimitiveTopology::PointList,
        }
    }

    /// Strip topologies need the index format at pipeline creation.
    pub(super) fn strip_index_format(self, indexed: bool) -> Option<wgpu::IndexFormat> {
        match self {
            Topology::LineStrip if indexed => Some(wgpu::IndexFormat::Uint32),
            _ => None,
        }
    }
}

// ── CPU mesh ──────────────────────────────────────────────────────────────

/// CPU-side mesh handed to [`MeshStore::upload`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    /// `None` draws vertices in order.
    pub indices: Option<Vec<u32>>,
    pub topology: Topology,
}

impl MeshData {
    /// Checks that the mesh is drawable: non-empty and every index in range.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.vertices.is_empty(), "mesh has no vertices");
        if let Some(indices) = &self.indices {
            ensure!(!indices.is_empty(), "mesh has an empty index buffer");
            let count = self.vertices.len() as u64;
            if let Some(&bad) = indices.iter().find(|&&i| u64::from(i) >= count) {
                anyhow::bail!("index {bad} out of range for {count} vertices");
            }
        }
        Ok(())
    }

    pub fn info(&self) -> MeshInfo {
        MeshInfo {
            topology: self.topology,
            vertex_count: self.vertices.len() as u32,
            index_count: self.indices.as_ref().map(|i| i.len() as u32),
        }
    }
}

/// What the planner needs to know about a loaded mesh.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MeshInfo {
    pub topology: Topology,
    pub vertex_count: u32,
    /// `Some` when the mesh has an index buffer.
    pub index_count: Option<u32>,
}

/// Lookup of loaded meshes by handle.
pub trait MeshCatalog {
    fn mesh_info(&self, handle: MeshHandle) -> Option<MeshInfo>;
}

/// Headless catalog, e.g. for planning without a device.
impl MeshCatalog for SlotMap<MeshHandle, MeshInfo> {
    fn mesh_info(&self, handle: MeshHandle) -> Option<MeshInfo> {
        self.get(handle).copied()
    }
}

// ── GPU mesh store ────────────────────────────────────────────────────────

pub(super) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: Option<wgpu::Buffer>,
    pub info: MeshInfo,
}

/// Owner of every GPU mesh. Handles stay valid until the store is dropped.
#[derive(Default)]
pub struct MeshStore {
    meshes: SlotMap<MeshHandle, GpuMesh>,
}

impl MeshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `data` and uploads it into immutable vertex/index buffers.
    pub fn upload(
        &mut self,
        device: &wgpu::Device,
        label: &str,
        data: &MeshData,
    ) -> Result<MeshHandle> {
        data.validate().with_context(|| format!("invalid mesh '{label}'"))?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("orrery mesh vbo: {label}")),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = data.indices.as_ref().map(|indices| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("orrery mesh ibo: {label}")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            })
        });

        let info = data.info();
        log::debug!(
            "mesh '{label}': {} vertices, {:?} indices, {:?}",
            info.vertex_count,
            info.index_count,
            info.topology
        );

        Ok(self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            info,
        }))
    }

    pub(super) fn get(&self, handle: MeshHandle) -> Option<&GpuMesh> {
        self.meshes.get(handle)
    }

    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl MeshCatalog for MeshStore {
    fn mesh_info(&self, handle: MeshHandle) -> Option<MeshInfo> {
        self.meshes.get(handle).map(|m| m.info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshData {
        MeshData {
            vertices: vec![
                MeshVertex::at([0.0, 0.0, 0.0]),
                MeshVertex::at([1.0, 0.0, 0.0]),
                MeshVertex::at([0.0, 1.0, 0.0]),
            ],
            indices: Some(vec![0, 1, 2]),
            topology: Topology::TriangleList,
        }
    }

    #[test]
    fn vertex_layout_covers_the_struct() {
        let layout = MeshVertex::layout();
        assert_eq!(layout.array_stride, 44);
        assert_eq!(layout.attributes.len(), 4);
        assert_eq!(layout.attributes[3].offset, 32);
    }

    #[test]
    fn validate_accepts_in_range_indices() {
        assert!(triangle().validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_meshes() {
        let mut mesh = triangle();
        mesh.indices = Some(vec![0, 1, 3]);
        assert!(mesh.validate().is_err());

        mesh.indices = Some(vec![]);
        assert!(mesh.validate().is_err());

        assert!(MeshData::default().validate().is_err());
    }

    #[test]
    fn info_reports_index_buffer_presence() {
        let indexed = triangle().info();
        assert_eq!(indexed.index_count, Some(3));

        let mut plain = triangle();
        plain.indices = None;
        plain.topology = Topology::PointList;
        let info = plain.info();
        assert_eq!(info.index_count, None);
        assert_eq!(info.vertex_count, 3);
        assert_eq!(info.topology.to_wgpu(), wgpu::PrimitiveTopology::PointList);
    }

    #[test]
    fn strip_format_only_for_indexed_strips() {
        assert_eq!(
            Topology::LineStrip.strip_index_format(true),
            Some(wgpu::IndexFormat::Uint32)
        );
        assert_eq!(Topology::LineStrip.strip_index_format(false), None);
        assert_eq!(Topology::TriangleList.strip_index_format(true), None);
    }

    #[test]
    fn slotmap_catalog_looks_up_by_handle() {
        let mut catalog: SlotMap<MeshHandle, MeshInfo> = SlotMap::with_key();
        let h = catalog.insert(triangle().info());
        assert_eq!(catalog.mesh_info(h).map(|i| i.vertex_count), Some(3));
        catalog.remove(h);
        assert!(catalog.mesh_info(h).is_none());
    }
}
