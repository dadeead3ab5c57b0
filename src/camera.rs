//! The camera contract (§6): view transform, visible bounds, viewport.

use crate::geom::{Affine2, Rect};

/// Supplied by the embedder, queried once per [`crate::scene::Scene::draw`].
///
/// Camera motion (follow-lerp, scroll tweens, bounds clamping) is an
/// external concern; the core only reads the current frame's resolved
/// state through this trait.
pub trait Camera {
    /// `screen = view_transform() · world`.
    fn view_transform(&self) -> Affine2;

    /// The camera's currently visible bounds, in world space.
    fn visible_bounds(&self) -> Rect;

    /// The viewport rectangle in screen space.
    fn viewport(&self) -> Rect;

    fn cull_enabled(&self) -> bool;

    /// Advances any internal motion (follow-lerp, scroll tweens) by `dt`
    /// seconds. Most embedders drive the camera externally and leave this
    /// a no-op; provided as a hook so [`crate::scene::Scene::update`] can
    /// advance a camera uniformly alongside node callbacks and particles.
    fn advance(&mut self, dt: f32) {
        let _ = dt;
    }
}

/// A minimal axis-aligned 2D camera: position, zoom, rotation around a
/// screen-space viewport. Provided as a ready-to-use [`Camera`]
/// implementation; embedders may supply their own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera2D {
    pub x: f32,
    pub y: f32,
    pub zoom: f32,
    pub rotation: f32,
    pub viewport: Rect,
    pub cull_enabled: bool,
}

impl Camera2D {
    #[must_use]
    pub fn new(viewport: Rect) -> Self {
        Self { x: 0.0, y: 0.0, zoom: 1.0, rotation: 0.0, viewport, cull_enabled: true }
    }
}

impl Camera for Camera2D {
    fn view_transform(&self) -> Affine2 {
        let half_w = self.viewport.w * 0.5;
        let half_h = self.viewport.h * 0.5;
        // screen = T(viewport_center) · R(rotation) · S(zoom) · T(-camera_pos)
        Affine2::translation(self.viewport.x + half_w, self.viewport.y + half_h)
            * Affine2::rotation(self.rotation)
            * Affine2::scale(self.zoom, self.zoom)
            * Affine2::translation(-self.x, -self.y)
    }

    fn visible_bounds(&self) -> Rect {
        let half_w = (self.viewport.w * 0.5) / self.zoom.max(1e-6);
        let half_h = (self.viewport.h * 0.5) / self.zoom.max(1e-6);
        Rect::new(self.x - half_w, self.y - half_h, half_w * 2.0, half_h * 2.0)
    }

    fn viewport(&self) -> Rect {
        self.viewport
    }

    fn cull_enabled(&self) -> bool {
        self.cull_enabled
    }
}
