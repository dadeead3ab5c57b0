#![allow(dead_code)] // Shared across many integration tests; each test binary uses a subset.

use retained2d::backend::{Backend, Target, Vertex};
use retained2d::blend::BlendMode;
use retained2d::geom::{Affine2, Color, Rect};
use retained2d::texture::TextureRegion;
use rustc_hash::FxHashMap;

#[derive(Default)]
pub struct TestTarget;
impl Target for TestTarget {}

/// One recorded [`Backend::draw_quad`] call.
#[derive(Clone, Copy, Debug)]
pub struct QuadCall {
    pub source: u32,
    pub src_rect: Rect,
    pub rotated: bool,
    pub transform: Affine2,
    pub tint: Color,
    pub blend: BlendMode,
}

/// One recorded triangle-list submission, indices widened to `u32` so the
/// 16-bit and 32-bit entry points share a single log.
#[derive(Clone, Debug)]
pub struct TriCall {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub source: Option<u32>,
    pub blend: BlendMode,
}

/// An in-memory [`Backend`] that records every call instead of touching a
/// GPU, so integration tests can assert on draw-call shape and (by
/// reconstructing quad corners from the logged transform/src_rect) on the
/// actual geometry and color a real backend would rasterize.
#[derive(Default)]
pub struct TestBackend {
    next_id: u32,
    sizes: FxHashMap<u32, (u32, u32)>,
    pixels: FxHashMap<u32, Vec<u8>>,
    pub quad_log: Vec<QuadCall>,
    pub triangle_log: Vec<TriCall>,
}

impl TestBackend {
    #[must_use]
    pub fn quad_calls(&self) -> usize {
        self.quad_log.len()
    }

    #[must_use]
    pub fn triangle_calls(&self) -> usize {
        self.triangle_log.len()
    }
}

impl Backend for TestBackend {
    type Image = u32;
    type Target = TestTarget;

    fn draw_quad(&mut self, _target: &Self::Target, source: Self::Image, src_rect: Rect, rotated: bool, transform: Affine2, tint: Color, blend: BlendMode) {
        self.quad_log.push(QuadCall { source, src_rect, rotated, transform, tint, blend });
    }

    fn draw_triangles(&mut self, _target: &Self::Target, vertices: &[Vertex], indices: &[u16], source_image: Option<Self::Image>, blend: BlendMode) {
        self.triangle_log.push(TriCall { vertices: vertices.to_vec(), indices: indices.iter().map(|&i| u32::from(i)).collect(), source: source_image, blend });
    }

    fn draw_triangles32(&mut self, _target: &Self::Target, vertices: &[Vertex], indices: &[u32], source_image: Option<Self::Image>, blend: BlendMode) {
        self.triangle_log.push(TriCall { vertices: vertices.to_vec(), indices: indices.to_vec(), source: source_image, blend });
    }

    fn new_image(&mut self, width: u32, height: u32) -> Self::Image {
        let id = self.next_id;
        self.next_id += 1;
        self.sizes.insert(id, (width, height));
        id
    }

    fn deallocate(&mut self, image: Self::Image) {
        self.sizes.remove(&image);
        self.pixels.remove(&image);
    }

    fn image_as_target(&self, _image: Self::Image) -> Self::Target {
        TestTarget
    }

    fn image_bounds(&self, image: Self::Image) -> (u32, u32) {
        self.sizes.get(&image).copied().unwrap_or((0, 0))
    }

    fn clear(&mut self, image: Self::Image) {
        self.pixels.remove(&image);
    }

    fn fill(&mut self, image: Self::Image, rgba: Color) {
        let (w, h) = self.image_bounds(image);
        let mut bytes = vec![0u8; (w as usize) * (h as usize) * 4];
        for px in bytes.chunks_mut(4) {
            px[0] = (rgba.r * 255.0) as u8;
            px[1] = (rgba.g * 255.0) as u8;
            px[2] = (rgba.b * 255.0) as u8;
            px[3] = (rgba.a * 255.0) as u8;
        }
        self.pixels.insert(image, bytes);
    }

    fn write_pixels(&mut self, image: Self::Image, bytes: &[u8]) {
        self.pixels.insert(image, bytes.to_vec());
    }

    fn read_pixels(&self, image: Self::Image, out: &mut [u8]) {
        if let Some(bytes) = self.pixels.get(&image) {
            out[..bytes.len().min(out.len())].copy_from_slice(&bytes[..bytes.len().min(out.len())]);
        }
    }
}

/// Reconstructs the four `TL, TR, BL, BR` screen-space corners and atlas-pixel
/// UV corners an immediate-mode [`QuadCall`] stands for, using the same
/// corner/rotation math `batch::uv_quad_corners` applies to a coalesced
/// sprite's [`TextureRegion`] — so a test can compare one [`QuadCall`]
/// directly against four vertices pulled from a [`TriCall`].
#[must_use]
pub fn quad_call_corners(call: &QuadCall) -> ([(f32, f32); 4], [(f32, f32); 4]) {
    let positions = [call.transform.transform_point(0.0, 0.0), call.transform.transform_point(1.0, 0.0), call.transform.transform_point(0.0, 1.0), call.transform.transform_point(1.0, 1.0)];
    let mut region = TextureRegion::new(0, call.src_rect.x, call.src_rect.y, call.src_rect.w, call.src_rect.h);
    region.rotated = call.rotated;
    let uv = retained2d::batch::uv_quad_corners(&region);
    (positions, [uv.tl, uv.tr, uv.bl, uv.br])
}

#[must_use]
pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[must_use]
pub fn point_approx_eq(a: (f32, f32), b: (f32, f32)) -> bool {
    approx_eq(a.0, b.0) && approx_eq(a.1, b.1)
}
