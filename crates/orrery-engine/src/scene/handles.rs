slotmap::new_key_type! {
    /// Opaque reference to a GPU-resident mesh (vertex buffer, optional index
    /// buffer, topology, element count) owned by `render::MeshStore`.
    pub struct MeshHandle;

    /// Opaque reference to a GPU texture owned by `render::TextureStore`.
    pub struct TextureHandle;
}
