//! Straight-alpha color value type.

/// Four normalized floats R, G, B, A.
///
/// All-zero is a sentinel meaning "opaque white" at vertex-emission time
/// (see [`Color::resolve_sentinel`]) — it lets zero-initialized commands
/// render visibly without explicit whitening. Colors are otherwise treated
/// as straight alpha; premultiplication happens at the batch layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const ZERO: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };

    #[must_use]
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[must_use]
    pub fn is_zero_sentinel(&self) -> bool {
        *self == Self::ZERO
    }

    /// All-zero resolves to opaque white; otherwise the color is returned
    /// unchanged (straight alpha).
    #[must_use]
    pub fn resolve_sentinel(&self) -> Color {
        if self.is_zero_sentinel() { Color::WHITE } else { *self }
    }

    /// Straight-alpha `self` multiplied by `other`, channel-wise. Used for
    /// alpha-inheritance down the tree and for cache-replay alpha ratios.
    #[must_use]
    pub fn modulate(&self, other: Color) -> Color {
        Color { r: self.r * other.r, g: self.g * other.g, b: self.b * other.b, a: self.a * other.a }
    }

    /// Premultiplies RGB by A, after resolving the zero sentinel.
    #[must_use]
    pub fn premultiplied(&self) -> Color {
        let c = self.resolve_sentinel();
        Color { r: c.r * c.a, g: c.g * c.a, b: c.b * c.a, a: c.a }
    }

    #[must_use]
    pub fn scale_alpha(&self, factor: f32) -> Color {
        Color { r: self.r, g: self.g, b: self.b, a: self.a * factor }
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinel_resolves_to_white() {
        assert_eq!(Color::ZERO.resolve_sentinel(), Color::WHITE);
    }

    #[test]
    fn premultiplied_scales_rgb_by_alpha() {
        let c = Color::new(1.0, 0.5, 0.25, 0.5).premultiplied();
        assert_eq!(c, Color::new(0.5, 0.25, 0.125, 0.5));
    }

    #[test]
    fn alpha_inheritance_multiplies() {
        let parent = Color::new(1.0, 1.0, 1.0, 0.5);
        let child = Color::new(1.0, 1.0, 1.0, 0.8);
        assert!((parent.modulate(child).a - 0.4).abs() < 1e-6);
    }
}
