//! 2×3 affine matrix value type.
//!
//! Represents `[[a c tx][b d ty][0 0 1]]` acting on column vectors:
//! `(x, y) -> (a*x + c*y + tx, b*x + d*y + ty)`. Composition and inversion
//! delegate to `glam::Affine2`, the teacher's math crate, keeping the named
//! `a, b, c, d, tx, ty` fields as the type's own public surface since the
//! rest of the crate (and the spec this realizes) addresses them by name.

use super::Rect;
use glam::{Affine2 as GlamAffine2, Mat2, Vec2};

/// A 2D affine transform: rotation, scale, skew, and translation in six floats.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine2 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

/// Singular matrices (|det| below this) invert to identity rather than panicking.
const SINGULAR_EPSILON: f32 = 1e-6;

impl Affine2 {
    pub const IDENTITY: Affine2 = Affine2 { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx: 0.0, ty: 0.0 };

    #[must_use]
    pub fn translation(tx: f32, ty: f32) -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, tx, ty }
    }

    #[must_use]
    pub fn rotation(radians: f32) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self { a: cos, b: sin, c: -sin, d: cos, tx: 0.0, ty: 0.0 }
    }

    #[must_use]
    pub fn scale(sx: f32, sy: f32) -> Self {
        Self { a: sx, b: 0.0, c: 0.0, d: sy, tx: 0.0, ty: 0.0 }
    }

    /// Shear matrix: `x' = x + tan(skew_y)*y`, `y' = tan(skew_x)*x + y`.
    #[must_use]
    pub fn skew(skew_x: f32, skew_y: f32) -> Self {
        Self { a: 1.0, b: skew_x.tan(), c: skew_y.tan(), d: 1.0, tx: 0.0, ty: 0.0 }
    }

    /// Composes local node fields in pivot-relative order, per §4.1:
    /// `T(x,y) · T(px,py) · R(rotation) · Skew(skx,sky) · S(sx,sy) · T(-px,-py)`.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn from_node_fields(
        x: f32,
        y: f32,
        pivot_x: f32,
        pivot_y: f32,
        rotation: f32,
        skew_x: f32,
        skew_y: f32,
        scale_x: f32,
        scale_y: f32,
    ) -> Self {
        // Fast path: no rotation, skew, or pivot offset — pure scale + translate.
        if rotation == 0.0 && skew_x == 0.0 && skew_y == 0.0 && pivot_x == 0.0 && pivot_y == 0.0 {
            return Self { a: scale_x, b: 0.0, c: 0.0, d: scale_y, tx: x, ty: y };
        }
        let t_origin = Self::translation(x, y);
        let t_pivot = Self::translation(pivot_x, pivot_y);
        let r = Self::rotation(rotation);
        let sk = Self::skew(skew_x, skew_y);
        let s = Self::scale(scale_x, scale_y);
        let t_neg_pivot = Self::translation(-pivot_x, -pivot_y);
        t_origin * t_pivot * r * sk * s * t_neg_pivot
    }

    /// Delegates to `glam::Affine2` (the teacher's math crate for affine
    /// composition) rather than hand-rolling the 2×3 multiply.
    fn to_glam(self) -> GlamAffine2 {
        GlamAffine2 { matrix2: Mat2::from_cols(Vec2::new(self.a, self.b), Vec2::new(self.c, self.d)), translation: Vec2::new(self.tx, self.ty) }
    }

    fn from_glam(g: GlamAffine2) -> Self {
        Self { a: g.matrix2.x_axis.x, b: g.matrix2.x_axis.y, c: g.matrix2.y_axis.x, d: g.matrix2.y_axis.y, tx: g.translation.x, ty: g.translation.y }
    }

    #[inline]
    #[must_use]
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let p = self.to_glam().transform_point2(Vec2::new(x, y));
        (p.x, p.y)
    }

    /// Transforms an axis-aligned rect by transforming its four corners and
    /// taking their bounding box. The result is axis-aligned in the
    /// destination space, not a rotated quad.
    #[must_use]
    pub fn transform_aabb(&self, rect: Rect) -> Rect {
        let corners = [
            self.transform_point(rect.x, rect.y),
            self.transform_point(rect.x + rect.w, rect.y),
            self.transform_point(rect.x, rect.y + rect.h),
            self.transform_point(rect.x + rect.w, rect.y + rect.h),
        ];
        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;
        for (px, py) in corners {
            min_x = min_x.min(px);
            min_y = min_y.min(py);
            max_x = max_x.max(px);
            max_y = max_y.max(py);
        }
        Rect { x: min_x, y: min_y, w: max_x - min_x, h: max_y - min_y }
    }

    /// Determinant of the linear (non-translation) part.
    #[inline]
    #[must_use]
    pub fn det(&self) -> f32 {
        self.a * self.d - self.c * self.b
    }

    /// Inverts the transform. A singular matrix (`|det| < 1e-6`) inverts to
    /// the identity, guaranteeing `worldToLocal` never panics on degenerate
    /// scales.
    #[must_use]
    pub fn invert(&self) -> Self {
        let det = self.det();
        if det.abs() < SINGULAR_EPSILON {
            return Self::IDENTITY;
        }
        Self::from_glam(self.to_glam().inverse())
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for Affine2 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// `(A * B).transform_point(p) == A.transform_point(B.transform_point(p))`.
impl std::ops::Mul for Affine2 {
    type Output = Affine2;

    fn mul(self, rhs: Affine2) -> Affine2 {
        Self::from_glam(self.to_glam() * rhs.to_glam())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn identity_node_fields_produce_identity() {
        let m = Affine2::from_node_fields(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0);
        assert_eq!(m, Affine2::IDENTITY);
    }

    #[test]
    fn invert_is_inverse_for_nonsingular() {
        let m = Affine2::from_node_fields(10.0, -5.0, 2.0, 3.0, 0.3, 0.0, 0.0, 2.0, 1.5);
        let round_trip = m.invert() * m;
        assert!(approx_eq(round_trip.a, 1.0));
        assert!(approx_eq(round_trip.b, 0.0));
        assert!(approx_eq(round_trip.c, 0.0));
        assert!(approx_eq(round_trip.d, 1.0));
        assert!(approx_eq(round_trip.tx, 0.0));
        assert!(approx_eq(round_trip.ty, 0.0));
    }

    #[test]
    fn invert_singular_is_exact_identity() {
        let m = Affine2::scale(0.0, 0.0);
        assert_eq!(m.invert(), Affine2::IDENTITY);
    }

    #[test]
    fn transform_point_roundtrip() {
        let m = Affine2::from_node_fields(123.0, -456.0, 4.0, -2.0, 0.7, 0.1, -0.2, 1.3, 0.8);
        let (x, y) = m.transform_point(12.0, 34.0);
        let inv = m.invert();
        let (lx, ly) = inv.transform_point(x, y);
        assert!(approx_eq(lx, 12.0));
        assert!(approx_eq(ly, 34.0));
    }

    #[test]
    fn composition_matches_sequential_application() {
        let a = Affine2::from_node_fields(5.0, 2.0, 0.0, 0.0, 0.4, 0.0, 0.0, 1.2, 0.9);
        let b = Affine2::from_node_fields(-3.0, 7.0, 1.0, 1.0, -0.2, 0.0, 0.0, 0.5, 2.0);
        let combined = a * b;
        let (x, y) = combined.transform_point(11.0, -6.0);
        let (bx, by) = b.transform_point(11.0, -6.0);
        let (ax, ay) = a.transform_point(bx, by);
        assert!(approx_eq(x, ax));
        assert!(approx_eq(y, ay));
    }
}
