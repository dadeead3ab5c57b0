//! Subtree command cache data (§4.7).

use crate::backend::Backend;
use crate::command::RenderCommand;
use crate::geom::Affine2;
use crate::node::NodeId;
use crate::texture::TextureRegion;

/// Two-tier texture pointer (Design Notes §9): a cached sprite command
/// either replays its build-time texture region verbatim (`Static`), or —
/// for descendants that mutate `textureRegion` within the same atlas page
/// ("animated tile" frames) — re-fetches the live region from the node
/// every replay (`Animated`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CachedTexture {
    Static(TextureRegion),
    Animated(NodeId),
}

/// One command captured during a cache build, tagged with its emitting
/// node and (for sprite commands) its two-tier texture pointer.
pub struct CachedCommandRecord<B: Backend> {
    pub command: RenderCommand<B>,
    pub source_node: NodeId,
    pub texture: Option<CachedTexture>,
}

impl<B: Backend> Clone for CachedCommandRecord<B> {
    fn clone(&self) -> Self {
        Self { command: self.command, source_node: self.source_node, texture: self.texture }
    }
}

/// The built cache for one container's subtree: the replayable command
/// list plus the screen-space transform/alpha the container had at build
/// time (§4.7 "Build phase" / "Replay phase").
pub struct SubtreeCommandCache<B: Backend> {
    pub records: Vec<CachedCommandRecord<B>>,
    pub cached_parent_transform: Affine2,
    pub cached_parent_alpha: f32,
    /// Set when the build emitted a mesh, particle, or transient-direct-
    /// image command; such subtrees cannot be cached and fall back to
    /// normal traversal every frame (§4.7).
    pub blocked: bool,
}

impl<B: Backend> SubtreeCommandCache<B> {
    #[must_use]
    pub fn new(cached_parent_transform: Affine2, cached_parent_alpha: f32) -> Self {
        Self { records: Vec::new(), cached_parent_transform, cached_parent_alpha, blocked: false }
    }
}
