use std::collections::HashMap;

use anyhow::{Context, Result};
use orrery_engine::core::{App, AppControl, FrameCtx};
use orrery_engine::render::{
    plan_frame, CompositeRenderer, DrawList, FrameParams, MeshStore, SceneRenderer,
    ShaderRegistry, TextureSlot, TextureStore,
};
use orrery_engine::scene::{SceneGraph, TextureHandle};
use winit::dpi::PhysicalSize;
use winit::event::WindowEvent;
use winit::window::WindowId;

use crate::config::SolarConfig;
use crate::controls::{self, Toggles};
use crate::meshes;
use crate::solar::{self, SolarAssets, SKYBOX_TEXTURE};

const SPHERE_STACKS: u32 = 32;
const SPHERE_SLICES: u32 = 64;
const RING_SEGMENTS: u32 = 128;
const STAR_COUNT: usize = 3000;

/// Backdrop when textures are disabled.
const UNTEXTURED_SKY: [u8; 4] = [8, 8, 16, 255];

/// Everything that needs a device. Built on the first frame.
struct SolarState {
    graph: SceneGraph,
    shaders: ShaderRegistry,
    meshes: MeshStore,
    textures: TextureStore,
    draws: DrawList,
    scene_renderer: SceneRenderer,
    composite: CompositeRenderer,
}

impl SolarState {
    fn new(
        config: &SolarConfig,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        aspect: f32,
    ) -> Result<Self> {
        let mut store = MeshStore::new();
        let mut rng = rand::rng();
        let sphere = store.upload(
            device,
            "sphere",
            &meshes::uv_sphere(SPHERE_STACKS, SPHERE_SLICES),
        )?;
        let ring = store.upload(device, "orbit ring", &meshes::orbit_ring(RING_SEGMENTS))?;
        let stars = store.upload(device, "stars", &meshes::star_field(STAR_COUNT, &mut rng))?;
        let skybox = store.upload(device, "skybox", &meshes::skybox_cube())?;

        let mut textures = TextureStore::new(device, queue);
        let texture_map = if config.untextured {
            log::info!("textures disabled; using flat colors");
            untextured(&mut textures, device, queue)
        } else {
            load_textures(config, &mut textures, device, queue)?
        };

        let assets = SolarAssets {
            sphere,
            ring,
            stars,
            skybox,
            textures: texture_map,
        };
        let graph =
            solar::build_scene(&assets, aspect).context("failed to build the scene graph")?;

        Ok(Self {
            graph,
            shaders: ShaderRegistry::with_builtin(),
            meshes: store,
            textures,
            draws: DrawList::new(),
            scene_renderer: SceneRenderer::new(),
            composite: CompositeRenderer::new(),
        })
    }

    fn move_camera(&mut self, delta: glam::Mat4) {
        if delta == glam::Mat4::IDENTITY {
            return;
        }
        let Some(camera) = self.graph.camera() else { return };
        let tree = self.graph.tree_mut();
        let Some(local) = tree.local_transform(camera) else { return };
        if let Err(e) = tree.set_local_transform(camera, local * delta) {
            log::warn!("camera move ignored: {e}");
        }
    }
}

fn load_textures(
    config: &SolarConfig,
    textures: &mut TextureStore,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> Result<HashMap<String, TextureHandle>> {
    let mut map = HashMap::new();
    for body in solar::textured_bodies() {
        let handle = textures.load_2d(device, queue, config.texture_path(body))?;
        map.insert(body.to_string(), handle);
    }

    let sky = textures
        .load_cubemap(device, queue, config.skybox_paths())
        .context("failed to load the skybox")?;
    map.insert(SKYBOX_TEXTURE.to_string(), sky);

    log::info!("loaded {} textures from {}", map.len(), config.resources.display());
    Ok(map)
}

fn untextured(
    textures: &mut TextureStore,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> HashMap<String, TextureHandle> {
    textures
        .solid(device, queue, TextureSlot::Cube, UNTEXTURED_SKY)
        .map(|sky| (SKYBOX_TEXTURE.to_string(), sky))
        .into_iter()
        .collect()
}

/// Solar system application driven by the engine runtime.
pub struct SolarApp {
    config: SolarConfig,
    toggles: Toggles,
    state: Option<SolarState>,
}

impl SolarApp {
    pub fn new(config: SolarConfig) -> Self {
        Self {
            config,
            toggles: Toggles::default(),
            state: None,
        }
    }

    fn on_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let Some(state) = self.state.as_mut() else { return };
        if let Some(camera) = state.graph.camera_node_mut() {
            camera.set_aspect(size.width as f32 / size.height as f32);
        }
    }
}

impl App for SolarApp {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        if let WindowEvent::Resized(size) = event {
            self.on_resize(*size);
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if controls::exit_requested(ctx.input_frame) {
            log::info!("escape pressed; exiting");
            return AppControl::Exit;
        }
        self.toggles.apply(ctx.input_frame);

        if self.state.is_none() {
            let size = ctx.gpu.size();
            let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
            match SolarState::new(&self.config, ctx.gpu.device(), ctx.gpu.queue(), aspect) {
                Ok(state) => {
                    state.graph.print_graph();
                    self.state = Some(state);
                }
                Err(e) => {
                    ctx.runtime.fail(e.context("startup failed"));
                    return AppControl::Exit;
                }
            }
        }
        let Some(state) = self.state.as_mut() else { return AppControl::Exit };

        state.move_camera(controls::camera_delta(ctx.input_frame, ctx.input));

        let params = FrameParams {
            dt: ctx.time.dt,
            rotating: self.toggles.rotating,
            toon_shading: self.toggles.toon,
        };
        if let Err(e) = plan_frame(
            &mut state.graph,
            &state.shaders,
            &state.meshes,
            params,
            &mut state.draws,
        ) {
            ctx.runtime
                .fail(anyhow::Error::new(e).context("render pass aborted"));
            return AppControl::Exit;
        }

        let post = self.toggles.post;
        let mut scene_failure = None;
        let control = ctx.render(|rctx, target| {
            if let Err(e) = state.scene_renderer.render(
                rctx,
                target.encoder,
                &state.draws,
                &state.shaders,
                &state.meshes,
                &state.textures,
            ) {
                scene_failure = Some(e.context("scene pass failed"));
                return AppControl::Exit;
            }
            state.composite.render(rctx, target, &state.scene_renderer, post);
            AppControl::Continue
        });

        if let Some(e) = scene_failure {
            ctx.runtime.fail(e);
        }
        control
    }
}
