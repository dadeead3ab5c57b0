//! Batching strategies (§4.9): immediate (one backend call per command) and
//! coalesced (run-length batched into triangle lists). Both must produce
//! identical pixels for the same scene (§4.9, invariant 10); only the
//! draw-call count differs.

pub mod coalesced;
pub mod immediate;

use crate::backend::{Backend, Vertex};
use crate::command::RenderCommand;
use crate::geom::{Color, Rect};
use crate::node::tree::NodeArena;
use crate::texture::{PageTable, TextureRegion};
use coalesced::CoalesceScratch;

/// Selects which batching strategy [`crate::scene::Scene::draw`] submits
/// with (§4.9, §6 configuration).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BatchMode {
    Immediate,
    #[default]
    Coalesced,
}

/// Dispatches `commands` (already sorted) to the strategy `mode` selects.
/// Both strategies must draw pixel-identical output for the same input
/// (§4.9, invariant 10); only draw-call count and `scratch`'s reuse differ.
#[allow(clippy::too_many_arguments)]
pub fn submit<B: Backend>(
    mode: BatchMode,
    backend: &mut B,
    target: &B::Target,
    commands: &[RenderCommand<B>],
    arena: &NodeArena<B>,
    pages: &mut PageTable<B>,
    scratch: &mut CoalesceScratch,
) {
    match mode {
        BatchMode::Immediate => immediate::submit(backend, target, commands, arena, pages),
        BatchMode::Coalesced => coalesced::submit(backend, target, commands, arena, pages, scratch),
    }
}

/// The four local-space corners of a quad, in the fixed `TL, TR, BL, BR`
/// order §4.9's winding rule expects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadCorners {
    pub tl: (f32, f32),
    pub tr: (f32, f32),
    pub bl: (f32, f32),
    pub br: (f32, f32),
}

/// Local-space destination corners for a sprite's atlas region, accounting
/// for the trim offset (§4.9 "Local quad corners for a non-rotated
/// region").
#[must_use]
pub fn local_quad_corners(region: &TextureRegion) -> QuadCorners {
    let (ox, oy) = (region.trim_x, region.trim_y);
    let (w, h) = (region.w, region.h);
    QuadCorners { tl: (ox, oy), tr: (ox + w, oy), bl: (ox, oy + h), br: (ox + w, oy + h) }
}

/// Atlas-pixel UV corners matching `local_quad_corners`'s screen corners,
/// honoring the region's 90°-clockwise-stored rotation flag (§4.9).
#[must_use]
pub fn uv_quad_corners(region: &TextureRegion) -> QuadCorners {
    if !region.rotated {
        let (x, y, w, h) = (region.x, region.y, region.w, region.h);
        return QuadCorners { tl: (x, y), tr: (x + w, y), bl: (x, y + h), br: (x + w, y + h) };
    }
    let (x, y, w, h) = (region.x, region.y, region.w, region.h);
    QuadCorners { tl: (x + h, y), tr: (x + h, y + w), bl: (x, y), br: (x, y + w) }
}

/// Resolves a raw color to its premultiplied vertex color, applying the
/// all-zero-sentinel-means-opaque-white rule (§3, §4.9).
#[must_use]
pub fn vertex_color(color: Color) -> Color {
    color.premultiplied()
}

/// Emits 4 vertices for one sprite quad (screen corners via `transform`,
/// UVs via `region`, color via `color`) into `vertices`, in `TL, TR, BL, BR`
/// order, and returns their base index.
pub fn push_quad_vertices(vertices: &mut Vec<Vertex>, region: &TextureRegion, transform: &crate::geom::Affine2, color: Color) -> u32 {
    let dst = local_quad_corners(region);
    let uv = uv_quad_corners(region);
    let c = vertex_color(color);
    let base = vertices.len() as u32;
    for (local, uv) in [(dst.tl, uv.tl), (dst.tr, uv.tr), (dst.bl, uv.bl), (dst.br, uv.br)] {
        let (dst_x, dst_y) = transform.transform_point(local.0, local.1);
        vertices.push(Vertex { dst_x, dst_y, src_x: uv.0, src_y: uv.1, color_r: c.r, color_g: c.g, color_b: c.b, color_a: c.a });
    }
    base
}

/// The two-triangle winding for a quad's 4 vertices at `base`: `TL-TR-BL,
/// TR-BR-BL` (§4.9).
pub fn push_quad_indices(indices: &mut Vec<u32>, base: u32) {
    indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
}

/// Computes a destination transform that maps the unit square `(0,0)..(1,1)`
/// onto the region's local destination quad, pre-composed with `transform`
/// — used by the immediate batcher, whose `Backend::draw_quad` contract
/// expects a unit-quad-mapping transform (§6).
#[must_use]
pub fn unit_quad_transform(region: &TextureRegion, transform: &crate::geom::Affine2) -> crate::geom::Affine2 {
    let local = crate::geom::Affine2::translation(region.trim_x, region.trim_y) * crate::geom::Affine2::scale(region.w, region.h);
    *transform * local
}

/// The atlas-pixel sample rect for a region, ignoring rotation (callers
/// pass `region.rotated` separately to [`Backend::draw_quad`]).
#[must_use]
pub fn src_rect(region: &TextureRegion) -> Rect {
    Rect::new(region.x, region.y, region.w, region.h)
}

/// Resolves a command's texture to a backend image, consulting the page
/// table for atlas regions and the direct image otherwise. Returns `None`
/// if the region's page is missing (§7: skip silently).
pub fn resolve_image<B: Backend>(backend: &mut B, pages: &mut crate::texture::PageTable<B>, texture: crate::command::CommandTexture<B>) -> Option<(B::Image, Option<TextureRegion>)> {
    match texture {
        crate::command::CommandTexture::Region(region) => pages.resolve(backend, region.page).map(|img| (img, Some(region))),
        crate::command::CommandTexture::Direct(image) => Some((image, None)),
    }
}
