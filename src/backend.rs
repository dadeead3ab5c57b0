//! The GPU backend contract (§6): textured quads and indexed triangle lists.
//!
//! The render compiler never touches a GPU API directly. It is generic over
//! a [`Backend`] implementation supplied by the embedder, the way `myth`'s
//! render graph is generic over its `wgpu::Device`/`wgpu::Queue` pair but
//! with the device itself pushed out behind a trait so this crate stays
//! backend-agnostic.

use crate::blend::BlendMode;
use crate::geom::Affine2;

/// One vertex in the shared vertex format: `(dstX, dstY, srcX, srcY, colorR,
/// colorG, colorB, colorA)`, all float32. `src` is in source-image pixel
/// units, not normalized; color is premultiplied.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub dst_x: f32,
    pub dst_y: f32,
    pub src_x: f32,
    pub src_y: f32,
    pub color_r: f32,
    pub color_g: f32,
    pub color_b: f32,
    pub color_a: f32,
}

/// A render target: either the final swapchain-like surface or a pooled
/// offscreen image used as a draw destination.
pub trait Target {}

/// The backend contract the render compiler submits batched draw calls to.
///
/// `Image` is an opaque handle (typically a small `Copy` index or pointer
/// wrapper) into backend-owned GPU storage; the core never inspects its
/// contents.
pub trait Backend {
    type Image: Copy + Eq + std::hash::Hash + std::fmt::Debug;
    type Target: Target;

    /// Draws a single textured quad: source image, the atlas-pixel rect to
    /// sample from (pre-rotation; `rotated` tells the backend to apply the
    /// same 90°-clockwise UV correction §4.9 specifies for coalesced
    /// quads), a destination transform mapping the unit square to the
    /// on-screen quad, tint, and blend mode.
    fn draw_quad(
        &mut self,
        target: &Self::Target,
        source: Self::Image,
        src_rect: crate::geom::Rect,
        rotated: bool,
        transform: Affine2,
        tint: crate::geom::Color,
        blend: BlendMode,
    );

    /// Draws an indexed triangle list with 16-bit indices.
    fn draw_triangles(
        &mut self,
        target: &Self::Target,
        vertices: &[Vertex],
        indices: &[u16],
        source_image: Option<Self::Image>,
        blend: BlendMode,
    );

    /// Draws an indexed triangle list with 32-bit indices, for batches that
    /// exceed the 16-bit index range.
    fn draw_triangles32(
        &mut self,
        target: &Self::Target,
        vertices: &[Vertex],
        indices: &[u32],
        source_image: Option<Self::Image>,
        blend: BlendMode,
    );

    /// Allocates a new backend image of the given pixel dimensions.
    fn new_image(&mut self, width: u32, height: u32) -> Self::Image;

    /// Wraps an image as a draw target, for the special-node offscreen path
    /// (§4.6) and subtree texture-cache builds (§4.7), both of which
    /// traverse into a pooled image as if it were the frame's target.
    fn image_as_target(&self, image: Self::Image) -> Self::Target;

    /// Releases a backend image's storage permanently.
    fn deallocate(&mut self, image: Self::Image);

    fn image_bounds(&self, image: Self::Image) -> (u32, u32);

    /// Clears an image to transparent black.
    fn clear(&mut self, image: Self::Image);

    fn fill(&mut self, image: Self::Image, rgba: crate::geom::Color);

    fn write_pixels(&mut self, image: Self::Image, bytes: &[u8]);

    fn read_pixels(&self, image: Self::Image, out: &mut [u8]);
}
