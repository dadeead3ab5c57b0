//! Text rendering contract (§4.4 Text sub-paths).
//!
//! Font file parsing and shaping are external collaborators per §1; this
//! module only holds the already-shaped glyph layout a `Text` node needs to
//! emit commands from, plus the closed `Font` sum type (Design Notes §9:
//! `BitmapFont | TTFFont` is a closed set, realized as an enum rather than a
//! trait object).

use crate::backend::Backend;
use crate::texture::TextureRegion;

/// One positioned glyph in a shaped text block, in the text block's local
/// space (already kerned/laid-out by the external shaper).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub region: TextureRegion,
}

/// A pre-packed bitmap font: every glyph is a region on an atlas page.
#[derive(Clone, Debug, Default)]
pub struct BitmapFont {
    pub line_height: f32,
}

/// A TTF/outline-rasterized font rendered into an offscreen image once per
/// content/layout change rather than glyph-by-glyph (§4.4).
#[derive(Clone, Debug, Default)]
pub struct TtfFont {
    pub pixel_size: f32,
}

/// The closed set of font backends a [`TextBlock`] can use.
#[derive(Clone, Debug)]
pub enum Font {
    Bitmap(BitmapFont),
    Ttf(TtfFont),
}

/// Outline color and thickness applied as 8 cardinal+diagonal pre-passes
/// before the fill pass, bitmap-font path only (§4.4).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outline {
    pub color: crate::geom::Color,
    pub thickness: f32,
}

/// The 8 cardinal+diagonal unit offsets used for outline pre-passes,
/// scaled by [`Outline::thickness`].
pub const OUTLINE_OFFSETS: [(f32, f32); 8] = [
    (-1.0, -1.0),
    (0.0, -1.0),
    (1.0, -1.0),
    (-1.0, 0.0),
    (1.0, 0.0),
    (-1.0, 1.0),
    (0.0, 1.0),
    (1.0, 1.0),
];

/// A shaped block of text owned by a `Text` node: already-laid-out glyphs
/// (bitmap path) or the raw string plus measured size (TTF path, rasterized
/// lazily by the special-node-adjacent offscreen pass).
#[derive(Clone, Debug)]
pub struct TextBlock {
    pub font: Font,
    pub text: String,
    pub glyphs: Vec<Glyph>,
    pub outline: Option<Outline>,
    pub measured_w: f32,
    pub measured_h: f32,
    /// Set when `text`/`font`/layout changed since the TTF path last
    /// rasterized into its cached offscreen image.
    pub raster_dirty: bool,
}

impl TextBlock {
    #[must_use]
    pub fn new(font: Font, text: impl Into<String>) -> Self {
        Self { font, text: text.into(), glyphs: Vec::new(), outline: None, measured_w: 0.0, measured_h: 0.0, raster_dirty: true }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.raster_dirty = true;
    }
}

/// Rasterizes a shaped TTF block into pixels, an external collaborator per
/// §1 (glyph hinting/shaping is out of scope for the core). Supplied by the
/// embedder to [`crate::scene::Scene`]; the TTF sub-path of §4.4 step 6
/// Text calls this once per content/layout change and caches the result on
/// the node until `raster_dirty` is set again.
pub trait TtfRasterizer<B: Backend> {
    /// Rasterizes `block`'s current text at `width`x`height` pixels into a
    /// freshly allocated backend image.
    fn rasterize(&mut self, backend: &mut B, block: &TextBlock, width: u32, height: u32) -> B::Image;
}
