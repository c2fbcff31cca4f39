use thiserror::Error;

use super::NodeId;

/// Structural errors raised by [`SceneTree`](super::SceneTree) mutations.
///
/// These are programmer errors: the tree is left unchanged when one is returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} does not exist in this scene tree")]
    UnknownNode(NodeId),

    #[error("node '{name}' cannot be attached to itself")]
    SelfParent { name: String },

    #[error("attaching '{child}' under '{parent}' would make '{child}' its own ancestor")]
    Cycle { parent: String, child: String },
}
