use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;

use crate::scene::TextureHandle;

use super::frame::{DrawItem, DrawList, DrawRange};
use super::mesh::{MeshStore, MeshVertex, Topology};
use super::shader::{ShaderRegistry, TextureSlot};
use super::texture::TextureStore;
use super::uniforms::{object_min_binding_size, ObjectUniform};
use super::RenderCtx;

/// Off-screen color format; the composite pass samples it.
pub(super) const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
struct PipelineKey {
    shader: Arc<str>,
    topology: Topology,
    indexed: bool,
}

impl PipelineKey {
    fn of(item: &DrawItem) -> Self {
        Self {
            shader: Arc::clone(&item.shader),
            topology: item.topology,
            indexed: matches!(item.range, DrawRange::Indexed { .. }),
        }
    }
}

struct Targets {
    size: PhysicalSize<u32>,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    _color: wgpu::Texture,
    _depth: wgpu::Texture,
}

/// Draws a [`DrawList`] into an off-screen color + depth target.
///
/// Per-object uniform blocks share one buffer bound with a dynamic offset.
/// Pipelines are created lazily per (variant, topology) and texture bind
/// groups per texture handle.
#[derive(Default)]
pub struct SceneRenderer {
    targets: Option<Targets>,
    /// Bumped whenever the off-screen targets are recreated.
    generation: u64,

    object_bgl: Option<wgpu::BindGroupLayout>,
    texture_bgl_2d: Option<wgpu::BindGroupLayout>,
    texture_bgl_cube: Option<wgpu::BindGroupLayout>,
    sampler_repeat: Option<wgpu::Sampler>,
    sampler_clamp: Option<wgpu::Sampler>,

    object_ubo: Option<wgpu::Buffer>,
    object_bind_group: Option<wgpu::BindGroup>,
    object_capacity: usize,
    object_stride: u64,
    staging: Vec<u8>,

    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    texture_bind_groups: HashMap<TextureHandle, wgpu::BindGroup>,
}

impl SceneRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Color view of the last rendered frame, once targets exist.
    pub fn color_view(&self) -> Option<&wgpu::TextureView> {
        self.targets.as_ref().map(|t| &t.color_view)
    }

    /// Changes whenever [`color_view`](Self::color_view) is replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clears the off-screen target and replays `draws` in order.
    pub fn render(
        &mut self,
        ctx: &RenderCtx<'_>,
        encoder: &mut wgpu::CommandEncoder,
        draws: &DrawList,
        shaders: &ShaderRegistry,
        meshes: &MeshStore,
        textures: &TextureStore,
    ) -> Result<()> {
        self.ensure_targets(ctx);
        self.ensure_layouts(ctx);

        for item in draws.iter() {
            self.ensure_pipeline(ctx, shaders, item)?;
            if let Some(handle) = bound_texture(item, textures) {
                self.ensure_texture_bind_group(ctx, textures, handle)?;
            }
        }

        self.ensure_object_capacity(ctx, draws.len());
        self.write_object_uniforms(ctx, draws);

        let Some(targets) = self.targets.as_ref() else { return Ok(()) };
        let Some(object_bind_group) = self.object_bind_group.as_ref() else { return Ok(()) };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("orrery scene pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &targets.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for (i, item) in draws.iter().enumerate() {
            let pipeline = self
                .pipelines
                .get(&PipelineKey::of(item))
                .with_context(|| format!("no pipeline for shader '{}'", item.shader))?;
            let mesh = meshes
                .get(item.mesh)
                .with_context(|| format!("mesh for shader '{}' is not uploaded", item.shader))?;

            rpass.set_pipeline(pipeline);

            let offset = i as u64 * self.object_stride;
            rpass.set_bind_group(0, object_bind_group, &[offset as u32]);

            if let Some(handle) = bound_texture(item, textures) {
                if let Some(bg) = self.texture_bind_groups.get(&handle) {
                    rpass.set_bind_group(1, bg, &[]);
                }
            }

            rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            match (item.range, mesh.index_buffer.as_ref()) {
                (DrawRange::Indexed { count }, Some(ibo)) => {
                    rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..count, 0, 0..1);
                }
                (DrawRange::Indexed { count }, None) | (DrawRange::Vertices { count }, _) => {
                    rpass.draw(0..count, 0..1);
                }
            }
        }

        Ok(())
    }

    fn ensure_targets(&mut self, ctx: &RenderCtx<'_>) {
        if self.targets.as_ref().is_some_and(|t| t.size == ctx.size) {
            return;
        }

        let extent = wgpu::Extent3d {
            width: ctx.size.width,
            height: ctx.size.height,
            depth_or_array_layers: 1,
        };

        let color = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("orrery offscreen color"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let depth = ctx.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("orrery offscreen depth"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        log::debug!(
            "scene targets: {}x{}",
            ctx.size.width,
            ctx.size.height
        );

        self.targets = Some(Targets {
            size: ctx.size,
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            _color: color,
            _depth: depth,
        });
        self.generation = self.generation.wrapping_add(1);
    }

    fn ensure_layouts(&mut self, ctx: &RenderCtx<'_>) {
        if self.object_bgl.is_some() {
            return;
        }

        self.object_bgl = Some(ctx.device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("orrery object bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: true,
                        min_binding_size: object_min_binding_size(),
                    },
                    count: None,
                }],
            },
        ));

        self.texture_bgl_2d = Some(texture_bgl(ctx, wgpu::TextureViewDimension::D2));
        self.texture_bgl_cube = Some(texture_bgl(ctx, wgpu::TextureViewDimension::Cube));

        self.sampler_repeat = Some(sampler(ctx, "orrery repeat sampler", wgpu::AddressMode::Repeat));
        self.sampler_clamp = Some(sampler(
            ctx,
            "orrery clamp sampler",
            wgpu::AddressMode::ClampToEdge,
        ));

        // Layout changes invalidate everything built on top of it.
        self.pipelines.clear();
        self.texture_bind_groups.clear();
        self.object_ubo = None;
        self.object_bind_group = None;
        self.object_capacity = 0;
    }

    fn texture_bgl_for(&self, slot: TextureSlot) -> Option<&wgpu::BindGroupLayout> {
        match slot {
            TextureSlot::None => None,
            TextureSlot::D2 => self.texture_bgl_2d.as_ref(),
            TextureSlot::Cube => self.texture_bgl_cube.as_ref(),
        }
    }

    fn ensure_pipeline(
        &mut self,
        ctx: &RenderCtx<'_>,
        shaders: &ShaderRegistry,
        item: &DrawItem,
    ) -> Result<()> {
        let key = PipelineKey::of(item);
        if self.pipelines.contains_key(&key) {
            return Ok(());
        }

        let variant = shaders
            .get(&item.shader)
            .with_context(|| format!("shader variant '{}' is not registered", item.shader))?;
        let object_bgl = self.object_bgl.as_ref().context("object layout missing")?;

        let mut layouts = vec![object_bgl];
        if variant.texture != TextureSlot::None {
            layouts.push(
                self.texture_bgl_for(variant.texture)
                    .context("texture layout missing")?,
            );
        }

        let module = ctx.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("orrery {} shader", variant.name)),
            source: wgpu::ShaderSource::Wgsl(variant.source.clone()),
        });

        let pipeline_layout = ctx.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("orrery {} pipeline layout", variant.name)),
            bind_group_layouts: &layouts,
            immediate_size: 0,
        });

        let pipeline = ctx.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("orrery {} {:?} pipeline", variant.name, key.topology)),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },

            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: OFFSCREEN_FORMAT,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: key.topology.to_wgpu(),
                strip_index_format: key.topology.strip_index_format(key.indexed),
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),

            multiview_mask: None,
            cache: None,
        });

        log::debug!("pipeline: {} {:?} indexed={}", key.shader, key.topology, key.indexed);
        self.pipelines.insert(key, pipeline);
        Ok(())
    }

    fn ensure_texture_bind_group(
        &mut self,
        ctx: &RenderCtx<'_>,
        textures: &TextureStore,
        handle: TextureHandle,
    ) -> Result<()> {
        if self.texture_bind_groups.contains_key(&handle) {
            return Ok(());
        }

        let texture = textures.get(handle).context("texture handle is not loaded")?;
        let layout = self
            .texture_bgl_for(texture.slot)
            .context("texture has no sampling dimension")?;
        let sampler = match texture.slot {
            TextureSlot::Cube => self.sampler_clamp.as_ref(),
            _ => self.sampler_repeat.as_ref(),
        }
        .context("sampler missing")?;

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orrery texture bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        self.texture_bind_groups.insert(handle, bind_group);
        Ok(())
    }

    fn ensure_object_capacity(&mut self, ctx: &RenderCtx<'_>, required: usize) {
        if required <= self.object_capacity && self.object_bind_group.is_some() {
            return;
        }
        let Some(bgl) = self.object_bgl.as_ref() else { return };

        let alignment = ctx.device.limits().min_uniform_buffer_offset_alignment;
        let stride = ObjectUniform::stride(alignment);
        let capacity = required.next_power_of_two().max(16);

        let ubo = ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("orrery object ubo"),
            size: capacity as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = ctx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("orrery object bind group"),
            layout: bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &ubo,
                    offset: 0,
                    size: object_min_binding_size(),
                }),
            }],
        });

        self.object_ubo = Some(ubo);
        self.object_bind_group = Some(bind_group);
        self.object_capacity = capacity;
        self.object_stride = stride;
    }

    fn write_object_uniforms(&mut self, ctx: &RenderCtx<'_>, draws: &DrawList) {
        let Some(ubo) = self.object_ubo.as_ref() else { return };
        if draws.is_empty() {
            return;
        }

        let stride = self.object_stride as usize;
        self.staging.clear();
        self.staging.resize(draws.len() * stride, 0);
        for (i, item) in draws.iter().enumerate() {
            let start = i * stride;
            let bytes = bytemuck::bytes_of(&item.uniform);
            self.staging[start..start + bytes.len()].copy_from_slice(bytes);
        }

        ctx.queue.write_buffer(ubo, 0, &self.staging);
    }
}

/// Texture bound at group 1 for `item`: its own, else the store default.
fn bound_texture(item: &DrawItem, textures: &TextureStore) -> Option<TextureHandle> {
    if item.texture_slot == TextureSlot::None {
        return None;
    }
    item.texture
        .filter(|&h| textures.slot(h) == Some(item.texture_slot))
        .or_else(|| textures.default_for(item.texture_slot))
}

fn texture_bgl(ctx: &RenderCtx<'_>, dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayout {
    ctx.device
        .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("orrery texture bgl {dimension:?}")),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: dimension,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        })
}

fn sampler(ctx: &RenderCtx<'_>, label: &str, mode: wgpu::AddressMode) -> wgpu::Sampler {
    ctx.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: mode,
        address_mode_v: mode,
        address_mode_w: mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::shader::{ORBIT, PLANET};
    use crate::scene::{MeshHandle, NodeId};
    use bytemuck::Zeroable;

    fn item(shader: &str, topology: Topology, range: DrawRange) -> DrawItem {
        DrawItem {
            node: NodeId::default(),
            shader: shader.into(),
            mesh: MeshHandle::default(),
            topology,
            texture_slot: TextureSlot::None,
            texture: None,
            range,
            uniform: ObjectUniform::zeroed(),
        }
    }

    #[test]
    fn pipelines_are_keyed_by_variant_topology_and_indexing() {
        let a = PipelineKey::of(&item(PLANET, Topology::TriangleList, DrawRange::Indexed { count: 3 }));
        let b = PipelineKey::of(&item(PLANET, Topology::TriangleList, DrawRange::Indexed { count: 99 }));
        assert_eq!(a, b);

        let ring = PipelineKey::of(&item(ORBIT, Topology::LineStrip, DrawRange::Vertices { count: 3 }));
        assert_ne!(a, ring);
        assert!(!ring.indexed);
    }

    #[test]
    fn pipeline_key_shares_the_variant_name() {
        let draw = item(PLANET, Topology::TriangleList, DrawRange::Indexed { count: 3 });
        let key = PipelineKey::of(&draw);
        assert!(Arc::ptr_eq(&key.shader, &draw.shader));
    }

    #[test]
    fn renderer_starts_without_targets() {
        let r = SceneRenderer::new();
        assert!(r.color_view().is_none());
        assert_eq!(r.generation(), 0);
    }
}
