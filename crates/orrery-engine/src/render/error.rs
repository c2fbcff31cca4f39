use thiserror::Error;

/// Precondition failures of the per-frame render pass.
///
/// All of them are fatal: the scene is not fully populated and there is no
/// fallback rendering path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("scene graph has no root node")]
    MissingRoot,

    #[error("scene graph has no active camera node")]
    MissingCamera,

    #[error("scene graph has no active point light node")]
    MissingLight,

    #[error("node '{node}' uses unregistered shader variant '{shader}'")]
    UnknownShader { node: String, shader: String },

    #[error("node '{node}' references a mesh that is not loaded")]
    UnknownMesh { node: String },
}
