//! Subtree command caching (§4.7) and subtree texture caching (§4.8).
//!
//! Both caches hang off a node's `cache` slot (`Option<Box<NodeCache<B>>>`)
//! so a node that uses neither costs one pointer, matching the "zero cost
//! when nil" principle §9 applies to callbacks.

mod command_cache;
mod texture_cache;

pub use command_cache::{CachedCommandRecord, CachedTexture, SubtreeCommandCache};
pub use texture_cache::TextureCacheState;

use crate::backend::Backend;

/// The combined cache-metadata block for one node: texture cache state
/// (§4.8) plus subtree command cache state (§4.7). A node may use either,
/// both, or neither independently.
pub struct NodeCache<B: Backend> {
    pub texture: TextureCacheState<B>,
    pub command: CommandCacheState<B>,
}

impl<B: Backend> Default for NodeCache<B> {
    fn default() -> Self {
        Self { texture: TextureCacheState::default(), command: CommandCacheState::default() }
    }
}

/// Subtree command cache mode and live state for one container node.
pub struct CommandCacheState<B: Backend> {
    /// `CacheAsTree` is enabled for this container.
    pub enabled: bool,
    /// Auto mode invalidates on any descendant setter that touches a
    /// visual property; manual mode requires an explicit
    /// `invalidate_cache_tree()` call (§4.7).
    pub auto_invalidate: bool,
    pub dirty: bool,
    /// `None` until the first successful build; `Some` with `blocked` set
    /// once a build emits an uncacheable command (§4.7).
    pub cache: Option<SubtreeCommandCache<B>>,
}

impl<B: Backend> Default for CommandCacheState<B> {
    fn default() -> Self {
        Self { enabled: false, auto_invalidate: true, dirty: true, cache: None }
    }
}
