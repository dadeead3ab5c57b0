//! The per-frame render IR (§3 `RenderCommand`).

use crate::backend::Backend;
use crate::geom::{Affine2, Color};
use crate::blend::BlendMode;
use crate::node::NodeId;
use crate::texture::TextureRegion;

/// The four command kinds named in §3. `Tilemap` is a permitted extension
/// point: the core treats it as "pre-built vertex list with custom
/// emitter", resolved the same way a `Mesh` command is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Sprite,
    Mesh,
    Particle,
    Tilemap,
}

/// A command's texture source: an atlas region, or a direct image
/// reference which takes precedence when present (§3).
///
/// Manually (not derive-) implements `Clone`/`Copy`/`Debug`: a derive would
/// add a spurious `B: Clone` bound on the backend type itself rather than
/// on `B::Image`, which is all that is actually required.
pub enum CommandTexture<B: Backend> {
    Region(TextureRegion),
    Direct(B::Image),
}

impl<B: Backend> Clone for CommandTexture<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for CommandTexture<B> {}

impl<B: Backend> std::fmt::Debug for CommandTexture<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandTexture::Region(r) => f.debug_tuple("Region").field(r).finish(),
            CommandTexture::Direct(i) => f.debug_tuple("Direct").field(i).finish(),
        }
    }
}

/// Mesh/particle/tilemap commands carry a non-owning reference to the
/// emitting node rather than a borrowed slice, so the command buffer stays
/// `'static` and copyable — the batcher resolves the payload through the
/// scene's node arena at submission time (an adaptation of §3's "non-owning
/// slice handles to node buffers" to the arena-index design of Design Notes
/// §9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandPayload {
    None,
    Node(NodeId),
}

/// One entry of the frame's command buffer.
///
/// Manually implements `Clone`/`Copy`/`Debug` for the same reason as
/// [`CommandTexture`].
pub struct RenderCommand<B: Backend> {
    pub kind: CommandKind,
    pub transform: Affine2,
    pub texture: CommandTexture<B>,
    /// Straight alpha; premultiplication happens at the batch layer
    /// (`batch::vertex_color`), matching [`Color`]'s own convention.
    pub color: Color,
    pub blend: BlendMode,
    pub shader_id: u32,
    pub target_id: u32,
    pub render_layer: i32,
    pub global_order: i32,
    /// Assigned during traversal; the sort tie-breaker (§4.4, §4.5).
    pub tree_order: u64,
    pub payload: CommandPayload,
    /// The direct image is a pooled RT to be released after submission;
    /// such commands must never enter a subtree command cache (§3, §4.7).
    pub transient_direct_image: bool,
    /// Populated only while building a subtree command cache (§4.7).
    pub emitting_node_id: Option<NodeId>,
}

impl<B: Backend> Clone for RenderCommand<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for RenderCommand<B> {}

impl<B: Backend> std::fmt::Debug for RenderCommand<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCommand")
            .field("kind", &self.kind)
            .field("transform", &self.transform)
            .field("texture", &self.texture)
            .field("color", &self.color)
            .field("blend", &self.blend)
            .field("shader_id", &self.shader_id)
            .field("target_id", &self.target_id)
            .field("render_layer", &self.render_layer)
            .field("global_order", &self.global_order)
            .field("tree_order", &self.tree_order)
            .field("payload", &self.payload)
            .field("transient_direct_image", &self.transient_direct_image)
            .field("emitting_node_id", &self.emitting_node_id)
            .finish()
    }
}

impl<B: Backend> RenderCommand<B> {
    /// The batch key sprites are coalesced by: `(targetID, shaderID,
    /// blendMode, page)` per §4.9/GLOSSARY. Direct-image sprites have no
    /// stable page and never coalesce (§4.9).
    #[must_use]
    pub fn batch_key(&self) -> Option<(u32, u32, u8, u16)> {
        match self.texture {
            CommandTexture::Region(region) => Some((self.target_id, self.shader_id, self.blend.batch_key(), region.page)),
            CommandTexture::Direct(_) => None,
        }
    }
}
