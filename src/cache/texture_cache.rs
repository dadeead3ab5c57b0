//! Subtree texture cache state (§4.8). The owned cache image itself lives
//! here; the offscreen-render logic that fills it is in `traversal`'s
//! special-node path (§4.6), which this module does not duplicate.

use crate::backend::Backend;

/// `CacheAsTexture` state for one node. The cached image is node-owned
/// (not pooled) and survives frames until invalidated, disabled, or the
/// node is disposed (§4.8).
pub struct TextureCacheState<B: Backend> {
    pub enabled: bool,
    pub texture: Option<B::Image>,
    pub dirty: bool,
    /// The build-time subtree bounds' top-left, in the node's own local
    /// space (§4.6 step 3). Needed every frame — including cache-hit frames
    /// that skip rebuilding — to place the cached quad at the right offset
    /// relative to the node's current `worldTransform`.
    pub origin_x: f32,
    pub origin_y: f32,
}

impl<B: Backend> Default for TextureCacheState<B> {
    fn default() -> Self {
        Self { enabled: false, texture: None, dirty: true, origin_x: 0.0, origin_y: 0.0 }
    }
}

impl<B: Backend> TextureCacheState<B> {
    /// A live, up-to-date cache texture exists and can be replayed as a
    /// single `CommandSprite` (§4.6 step 4).
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.enabled && !self.dirty && self.texture.is_some()
    }

    pub fn invalidate(&mut self) {
        self.dirty = true;
    }
}
