use std::path::Path;

use anyhow::{ensure, Context, Result};
use slotmap::SlotMap;

use crate::scene::TextureHandle;

use super::shader::TextureSlot;

/// Color textures are stored sRGB-encoded; sampling yields linear values.
const TEXTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const WHITE: [u8; 4] = [255, 255, 255, 255];

pub(super) struct GpuTexture {
    pub view: wgpu::TextureView,
    pub slot: TextureSlot,
    /// Kept for its lifetime; only the view is bound.
    _texture: wgpu::Texture,
}

/// Owner of every GPU texture, plus 1×1 white defaults for nodes that have no
/// texture of their own.
pub struct TextureStore {
    textures: SlotMap<TextureHandle, GpuTexture>,
    white_2d: TextureHandle,
    white_cube: TextureHandle,
}

impl TextureStore {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let mut textures = SlotMap::with_key();
        let white_2d = textures.insert(solid(device, queue, TextureSlot::D2, WHITE));
        let white_cube = textures.insert(solid(device, queue, TextureSlot::Cube, WHITE));
        Self {
            textures,
            white_2d,
            white_cube,
        }
    }

    /// Decodes an image file into a 2D texture.
    pub fn load_2d(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: impl AsRef<Path>,
    ) -> Result<TextureHandle> {
        let path = path.as_ref();
        let img = decode(path)?;
        let (width, height) = img.dimensions();

        let label = path.display().to_string();
        let texture = create(device, &label, TextureSlot::D2, width, height);
        upload_layer(queue, &texture, 0, width, height, img.as_raw());

        log::debug!("texture '{}': {width}x{height}", path.display());
        Ok(self.insert(texture, TextureSlot::D2))
    }

    /// Decodes six square, equally sized images into a cube map.
    ///
    /// Face order is +X, -X, +Y, -Y, +Z, -Z.
    pub fn load_cubemap<P: AsRef<Path>>(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: [P; 6],
    ) -> Result<TextureHandle> {
        let images = faces
            .iter()
            .map(|p| decode(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        let (width, height) = images[0].dimensions();
        ensure!(width == height, "cube map faces must be square, got {width}x{height}");
        for (img, path) in images.iter().zip(&faces) {
            ensure!(
                img.dimensions() == (width, height),
                "cube map face '{}' is {:?}, expected {width}x{height}",
                path.as_ref().display(),
                img.dimensions()
            );
        }

        let texture = create(device, "cube map", TextureSlot::Cube, width, height);
        for (layer, img) in images.iter().enumerate() {
            upload_layer(queue, &texture, layer as u32, width, height, img.as_raw());
        }

        log::debug!("cube map: 6 x {width}x{height}");
        Ok(self.insert(texture, TextureSlot::Cube))
    }

    /// Creates a 1×1 texture of a single sRGB color.
    pub fn solid(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        slot: TextureSlot,
        rgba: [u8; 4],
    ) -> Option<TextureHandle> {
        if slot == TextureSlot::None {
            return None;
        }
        Some(self.textures.insert(solid(device, queue, slot, rgba)))
    }

    /// White texture matching `slot`, bound when a node has no texture.
    pub fn default_for(&self, slot: TextureSlot) -> Option<TextureHandle> {
        match slot {
            TextureSlot::None => None,
            TextureSlot::D2 => Some(self.white_2d),
            TextureSlot::Cube => Some(self.white_cube),
        }
    }

    pub(super) fn get(&self, handle: TextureHandle) -> Option<&GpuTexture> {
        self.textures.get(handle)
    }

    /// Dimension of a stored texture.
    pub fn slot(&self, handle: TextureHandle) -> Option<TextureSlot> {
        self.textures.get(handle).map(|t| t.slot)
    }

    fn insert(&mut self, texture: wgpu::Texture, slot: TextureSlot) -> TextureHandle {
        self.textures.insert(GpuTexture {
            view: create_view(&texture, slot),
            slot,
            _texture: texture,
        })
    }
}

fn decode(path: &Path) -> Result<image::RgbaImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to load texture '{}'", path.display()))?;
    Ok(img.to_rgba8())
}

fn layers(slot: TextureSlot) -> u32 {
    if slot == TextureSlot::Cube { 6 } else { 1 }
}

fn create(
    device: &wgpu::Device,
    label: &str,
    slot: TextureSlot,
    width: u32,
    height: u32,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("orrery texture: {label}")),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: layers(slot),
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TEXTURE_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

fn create_view(texture: &wgpu::Texture, slot: TextureSlot) -> wgpu::TextureView {
    texture.create_view(&wgpu::TextureViewDescriptor {
        dimension: slot.view_dimension(),
        ..Default::default()
    })
}

fn upload_layer(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    layer: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d { x: 0, y: 0, z: layer },
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

fn solid(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    slot: TextureSlot,
    rgba: [u8; 4],
) -> GpuTexture {
    let texture = create(device, "solid", slot, 1, 1);
    for layer in 0..layers(slot) {
        upload_layer(queue, &texture, layer, 1, 1, &rgba);
    }
    GpuTexture {
        view: create_view(&texture, slot),
        slot,
        _texture: texture,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_maps_have_six_layers() {
        assert_eq!(layers(TextureSlot::Cube), 6);
        assert_eq!(layers(TextureSlot::D2), 1);
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = decode(Path::new("does/not/exist.png")).unwrap_err();
        assert!(format!("{err:#}").contains("does/not/exist.png"));
    }
}
