use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

/// Built-in variant names.
pub const PLANET: &str = "planet";
pub const ORBIT: &str = "orbit";
pub const STAR: &str = "star";
pub const SKYBOX: &str = "skybox";

/// Uniform slots a shader variant reads from the per-object uniform block.
///
/// The block layout is shared by every variant; a slot the variant does not
/// declare is left zeroed by the planner.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct UniformSlots {
    pub model: bool,
    pub normal: bool,
    pub view: bool,
    pub projection: bool,
    pub color: bool,
    /// Ambient color/strength, light position and light color.
    pub lighting: bool,
    pub camera_position: bool,
    pub toon: bool,
}

impl UniformSlots {
    /// Model/view/projection only.
    pub const fn transform_only() -> Self {
        Self {
            model: true,
            normal: false,
            view: true,
            projection: true,
            color: false,
            lighting: false,
            camera_position: false,
            toon: false,
        }
    }

    pub const fn all() -> Self {
        Self {
            model: true,
            normal: true,
            view: true,
            projection: true,
            color: true,
            lighting: true,
            camera_position: true,
            toon: true,
        }
    }
}

/// Texture a shader variant samples at bind group 1.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureSlot {
    #[default]
    None,
    D2,
    Cube,
}

impl TextureSlot {
    pub fn view_dimension(self) -> Option<wgpu::TextureViewDimension> {
        match self {
            TextureSlot::None => None,
            TextureSlot::D2 => Some(wgpu::TextureViewDimension::D2),
            TextureSlot::Cube => Some(wgpu::TextureViewDimension::Cube),
        }
    }
}

/// One shader program: WGSL source with `vs_main`/`fs_main` entry points plus
/// the uniform/texture interface it declares.
///
/// The name is shared with every draw and pipeline key that refers to it.
#[derive(Debug, Clone)]
pub struct ShaderVariant {
    pub name: Arc<str>,
    pub source: Cow<'static, str>,
    pub uniforms: UniformSlots,
    pub texture: TextureSlot,
}

/// Shader variants by name.
#[derive(Debug, Clone, Default)]
pub struct ShaderRegistry {
    variants: HashMap<Arc<str>, ShaderVariant>,
}

impl ShaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the `planet`, `orbit`, `star` and `skybox` variants.
    pub fn with_builtin() -> Self {
        let mut reg = Self::new();

        reg.register(ShaderVariant {
            name: PLANET.into(),
            source: Cow::Borrowed(include_str!("wgsl/planet.wgsl")),
            uniforms: UniformSlots::all(),
            texture: TextureSlot::D2,
        });

        reg.register(ShaderVariant {
            name: ORBIT.into(),
            source: Cow::Borrowed(include_str!("wgsl/orbit.wgsl")),
            uniforms: UniformSlots {
                color: true,
                ..UniformSlots::transform_only()
            },
            texture: TextureSlot::None,
        });

        reg.register(ShaderVariant {
            name: STAR.into(),
            source: Cow::Borrowed(include_str!("wgsl/star.wgsl")),
            uniforms: UniformSlots::transform_only(),
            texture: TextureSlot::None,
        });

        reg.register(ShaderVariant {
            name: SKYBOX.into(),
            source: Cow::Borrowed(include_str!("wgsl/skybox.wgsl")),
            uniforms: UniformSlots::transform_only(),
            texture: TextureSlot::Cube,
        });

        reg
    }

    /// Adds or replaces a variant. Returns the replaced one, if any.
    pub fn register(&mut self, variant: ShaderVariant) -> Option<ShaderVariant> {
        self.variants.insert(Arc::clone(&variant.name), variant)
    }

    pub fn get(&self, name: &str) -> Option<&ShaderVariant> {
        self.variants.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.variants.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}
