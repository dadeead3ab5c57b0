//! Atlas texture regions and the scene's page table.

use rustc_hash::FxHashMap;

use crate::backend::Backend;

/// The reserved page index whose lookups resolve to a lazily-created 1×1
/// magenta placeholder image, per §7's "missing asset" policy.
pub const MAGENTA_PAGE: u16 = u16::MAX;

/// A reference into an atlas: one packed sub-region of one atlas page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureRegion {
    pub page: u16,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    /// Untrimmed original width/height (for pivot/layout math upstream).
    pub original_w: f32,
    pub original_h: f32,
    pub trim_x: f32,
    pub trim_y: f32,
    /// The region is stored rotated 90° clockwise in its atlas page.
    pub rotated: bool,
}

impl TextureRegion {
    #[must_use]
    pub fn new(page: u16, x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { page, x, y, w, h, original_w: w, original_h: h, trim_x: 0.0, trim_y: 0.0, rotated: false }
    }

    #[must_use]
    pub fn magenta_placeholder() -> Self {
        Self::new(MAGENTA_PAGE, 0.0, 0.0, 1.0, 1.0)
    }
}

/// Maps atlas page indices to backend image handles, with the magenta
/// placeholder created lazily on first use.
pub struct PageTable<B: Backend> {
    pages: FxHashMap<u16, B::Image>,
    magenta: Option<B::Image>,
}

impl<B: Backend> Default for PageTable<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> PageTable<B> {
    #[must_use]
    pub fn new() -> Self {
        Self { pages: FxHashMap::default(), magenta: None }
    }

    pub fn insert(&mut self, page: u16, image: B::Image) {
        self.pages.insert(page, image);
    }

    /// Resolves a page index to a backend image. The reserved
    /// [`MAGENTA_PAGE`] index always resolves (creating the 1×1 placeholder
    /// on first use); any other out-of-range page returns `None`, which
    /// callers must treat as "skip this command silently" per §7.
    pub fn resolve(&mut self, backend: &mut B, page: u16) -> Option<B::Image> {
        if page == MAGENTA_PAGE {
            if self.magenta.is_none() {
                let img = backend.new_image(1, 1);
                backend.fill(img, crate::geom::Color::new(1.0, 0.0, 1.0, 1.0));
                self.magenta = Some(img);
            }
            return self.magenta;
        }
        match self.pages.get(&page).copied() {
            Some(img) => Some(img),
            None => {
                log::warn!("texture page {page} not found in page table; skipping command");
                None
            }
        }
    }
}
