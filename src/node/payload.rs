//! Per-`kind` payload data carried by [`super::Node`] (§3 Node "Payload" row).

use crate::backend::{Backend, Vertex};
use crate::blend::BlendMode;
use crate::geom::{Color, Rect};
use crate::particle::ParticleEmitter;
use crate::texture::TextureRegion;
use crate::text::TextBlock;

/// `Sprite` payload: a textured quad, or a custom direct image when
/// `custom_image` is set (takes precedence over `region`, per §3's
/// RenderCommand field note).
///
/// Not `#[derive(Clone)]`: a derive would add a spurious `B: Clone` bound
/// on the backend type itself (the derive macro cannot see that only
/// `B::Image` needs to be `Copy`, which [`Backend`] already guarantees).
pub struct SpritePayload<B: Backend> {
    pub region: TextureRegion,
    pub blend: BlendMode,
    pub color: Color,
    pub custom_image: Option<B::Image>,
}

impl<B: Backend> SpritePayload<B> {
    #[must_use]
    pub fn new(region: TextureRegion) -> Self {
        Self { region, blend: BlendMode::Normal, color: Color::WHITE, custom_image: None }
    }
}

impl<B: Backend> Clone for SpritePayload<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B: Backend> Copy for SpritePayload<B> {}

impl<B: Backend> std::fmt::Debug for SpritePayload<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpritePayload")
            .field("region", &self.region)
            .field("blend", &self.blend)
            .field("color", &self.color)
            .field("custom_image", &self.custom_image)
            .finish()
    }
}

/// One CPU-side vertex of a mesh payload's local-space vertex buffer,
/// before the per-frame view-transform is baked in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshVertex {
    pub x: f32,
    pub y: f32,
    pub src_x: f32,
    pub src_y: f32,
    pub color: Color,
}

/// `Mesh` payload: a CPU-owned vertex/index buffer plus a scratch buffer
/// for the transformed (view-space) vertices the traversal writes into
/// every visible frame (§4.4 step 6 Mesh).
pub struct MeshPayload<B: Backend> {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub image: B::Image,
    pub tint: Color,
    pub blend: BlendMode,
    /// Grown to a high-water mark across frames; never shrunk.
    pub(crate) transformed_scratch: Vec<Vertex>,
    pub(crate) local_bounds: Option<Rect>,
    pub(crate) bounds_dirty: bool,
}

impl<B: Backend> MeshPayload<B> {
    #[must_use]
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>, image: B::Image) -> Self {
        Self { vertices, indices, image, tint: Color::WHITE, blend: BlendMode::Normal, transformed_scratch: Vec::new(), local_bounds: None, bounds_dirty: true }
    }

    pub fn mark_bounds_dirty(&mut self) {
        self.bounds_dirty = true;
    }

    /// Recomputes the local-space AABB on demand (§4.6 step 1: "cached mesh
    /// AABB for meshes, recomputed on demand when dirty").
    pub fn local_bounds(&mut self) -> Rect {
        if self.bounds_dirty || self.local_bounds.is_none() {
            let bounds = self.vertices.iter().fold(None::<Rect>, |acc, v| {
                let point = Rect::new(v.x, v.y, 0.0, 0.0);
                Some(match acc {
                    Some(r) => r.union(&point),
                    None => point,
                })
            });
            self.local_bounds = Some(bounds.unwrap_or_default());
            self.bounds_dirty = false;
        }
        self.local_bounds.unwrap_or_default()
    }
}

/// `Text` payload (§4.4 step 6 Text): the shaped block plus a lazily
/// rasterized offscreen image for the TTF sub-path (§4.4: "render the whole
/// block once into an offscreen image ... cache until content/layout
/// changes").
pub struct TextPayload<B: Backend> {
    pub block: TextBlock,
    pub color: Color,
    pub blend: BlendMode,
    pub(crate) raster_image: Option<B::Image>,
}

impl<B: Backend> TextPayload<B> {
    #[must_use]
    pub fn new(block: TextBlock) -> Self {
        Self { block, color: Color::WHITE, blend: BlendMode::Normal, raster_image: None }
    }
}

/// The payload carried by a `ParticleEmitter` node.
pub struct EmitterPayload {
    pub emitter: ParticleEmitter,
    pub blend: BlendMode,
}

impl EmitterPayload {
    #[must_use]
    pub fn new(emitter: ParticleEmitter) -> Self {
        Self { emitter, blend: BlendMode::Normal }
    }
}
