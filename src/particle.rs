//! Particle emitter data and simulation tick.
//!
//! The authoring/curve layer (spawn-rate curves, tween-driven value
//! interpolation) is an external collaborator per §1; this module owns only
//! the plain per-particle buffer and the minimal spawn/age/kill loop that
//! `Scene::update` and the coalesced batcher's particle expansion need.

use crate::geom::Color;
use crate::texture::TextureRegion;

/// One live particle. Position is in the coordinate space of whatever
/// `M_base` the emitter resolves to at emission time (§9 Open Question
/// resolution: attached emitters use `viewWorld`, world-space emitters bake
/// their spawn-time world origin into `x`/`y` and use `viewTransform`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub scale: f32,
    pub rotation: f32,
    pub color_r: f32,
    pub color_g: f32,
    pub color_b: f32,
    pub alpha: f32,
    pub age: f32,
    pub lifetime: f32,
}

impl Particle {
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.age < self.lifetime
    }
}

/// Whether particle positions are interpreted relative to the emitter node
/// (recomposed with the node's world transform at submission) or as
/// absolute world coordinates (composed only with the camera's view
/// transform).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EmitterSpace {
    #[default]
    Attached,
    World,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterConfig {
    pub spawn_rate: f32,
    pub lifetime_min: f32,
    pub lifetime_max: f32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub start_scale: f32,
    pub end_scale: f32,
    pub start_color: Color,
    pub end_color: Color,
    pub max_particles: usize,
    pub space: EmitterSpace,
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            spawn_rate: 10.0,
            lifetime_min: 1.0,
            lifetime_max: 1.0,
            speed_min: 0.0,
            speed_max: 0.0,
            start_scale: 1.0,
            end_scale: 1.0,
            start_color: Color::WHITE,
            end_color: Color::WHITE,
            max_particles: 256,
            space: EmitterSpace::Attached,
        }
    }
}

/// Per-node particle emitter: config, texture region, and live particle
/// buffer, grown to a high-water mark and never shrunk (matching the
/// crate-wide zero-per-frame-allocation discipline once warmed up).
pub struct ParticleEmitter {
    pub config: EmitterConfig,
    pub region: TextureRegion,
    pub emitting: bool,
    particles: Vec<Particle>,
    spawn_accumulator: f32,
    rng_state: u64,
    /// World-space emitters bake their spawn-time origin here; the owning
    /// node's world transform is copied in here each `update` per §4.11.
    pub world_x: f32,
    pub world_y: f32,
}

impl ParticleEmitter {
    #[must_use]
    pub fn new(config: EmitterConfig, region: TextureRegion) -> Self {
        Self {
            particles: Vec::with_capacity(config.max_particles),
            config,
            region,
            emitting: true,
            spawn_accumulator: 0.0,
            rng_state: 0x9E37_79B9_7F4A_7C15,
            world_x: 0.0,
            world_y: 0.0,
        }
    }

    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.particles.iter().filter(|p| p.is_alive()).count()
    }

    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    fn next_unit_f32(&mut self) -> f32 {
        // xorshift64*, deterministic and allocation-free.
        let mut x = self.rng_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng_state = x;
        let bits = x.wrapping_mul(0x2545_F491_4F6C_DD1D);
        ((bits >> 40) as f32) / ((1u64 << 24) as f32)
    }

    /// Advances the simulation by `dt` seconds: integrates position,
    /// interpolates scale/color over the particle's lifetime, removes dead
    /// particles (swap-remove; draw order within a command is unordered),
    /// then spawns new ones if `emitting`.
    pub fn update(&mut self, dt: f32) {
        let mut i = 0;
        while i < self.particles.len() {
            let p = &mut self.particles[i];
            p.age += dt;
            if p.is_alive() {
                p.x += p.velocity_x * dt;
                p.y += p.velocity_y * dt;
                let t = (p.age / p.lifetime).clamp(0.0, 1.0);
                p.scale = lerp(self.config.start_scale, self.config.end_scale, t);
                let color = lerp_color(self.config.start_color, self.config.end_color, t);
                p.color_r = color.r;
                p.color_g = color.g;
                p.color_b = color.b;
                p.alpha = color.a;
                i += 1;
            } else {
                self.particles.swap_remove(i);
            }
        }

        if !self.emitting {
            return;
        }
        self.spawn_accumulator += dt * self.config.spawn_rate;
        while self.spawn_accumulator >= 1.0 && self.particles.len() < self.config.max_particles {
            self.spawn_accumulator -= 1.0;
            self.spawn_one();
        }
    }

    fn spawn_one(&mut self) {
        let speed = lerp(self.config.speed_min, self.config.speed_max, self.next_unit_f32());
        let angle = self.next_unit_f32() * std::f32::consts::TAU;
        let lifetime = lerp(self.config.lifetime_min, self.config.lifetime_max, self.next_unit_f32());
        let (origin_x, origin_y) = match self.config.space {
            EmitterSpace::Attached => (0.0, 0.0),
            EmitterSpace::World => (self.world_x, self.world_y),
        };
        self.particles.push(Particle {
            x: origin_x,
            y: origin_y,
            velocity_x: angle.cos() * speed,
            velocity_y: angle.sin() * speed,
            scale: self.config.start_scale,
            rotation: angle,
            color_r: self.config.start_color.r,
            color_g: self.config.start_color.g,
            color_b: self.config.start_color.b,
            alpha: self.config.start_color.a,
            age: 0.0,
            lifetime: lifetime.max(1e-4),
        });
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

fn lerp_color(a: Color, b: Color, t: f32) -> Color {
    Color::new(lerp(a.r, b.r, t), lerp(a.g, b.g, t), lerp(a.b, b.b, t), lerp(a.a, b.a, t))
}

/// The per-particle local-to-world transform used by both batching
/// strategies: the particle's quad is centered on its own position,
/// scaled by `p.scale` (§4.9's "centered on the sprite center").
///
/// This is a cleaned-up equivalent of §4.9's literal
/// `Scale(p.scale)·Translate(offsetX−halfW,...)·Translate(p.x,p.y)·Translate(halfW,halfH)`
/// chain. The `offsetX/offsetY` (trim) term is not applied here: it's
/// already baked into the quad geometry downstream, the same way it is
/// for ordinary sprites — `batch::local_quad_corners`/
/// `batch::unit_quad_transform` translate the quad by `(region.trim_x,
/// region.trim_y)` before this transform is applied to it. What this
/// function must still get right is `halfW`/`halfH`: they're the half
/// extents of the region's *original*, untrimmed size
/// (`region.original_w/original_h`), not the trimmed `region.w/region.h`
/// — using the trimmed size would recenter each animation frame on its
/// own visible footprint instead of a stable canvas center, so trimmed
/// frames of the same animation would jitter relative to one another.
#[must_use]
pub fn particle_local_transform(p: &Particle, region: &TextureRegion) -> crate::geom::Affine2 {
    let half_w = region.original_w * 0.5;
    let half_h = region.original_h * 0.5;
    crate::geom::Affine2::translation(p.x, p.y) * crate::geom::Affine2::scale(p.scale, p.scale) * crate::geom::Affine2::translation(-half_w, -half_h)
}

/// Per-particle color modulated by the command's color, premultiplied
/// (§4.9: `(p.colorR·cmd.R, p.colorG·cmd.G, p.colorB·cmd.B, p.alpha·cmd.A)`).
#[must_use]
pub fn particle_color(p: &Particle, cmd_color: Color) -> Color {
    Color::new(p.color_r * cmd_color.r, p.color_g * cmd_color.g, p.color_b * cmd_color.b, p.alpha * cmd_color.a).premultiplied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emitter_spawns_and_ages_out_particles() {
        let mut config = EmitterConfig { spawn_rate: 100.0, lifetime_min: 0.1, lifetime_max: 0.1, ..Default::default() };
        config.max_particles = 50;
        let mut emitter = ParticleEmitter::new(config, TextureRegion::magenta_placeholder());
        emitter.update(0.05);
        assert!(emitter.alive_count() > 0);
        emitter.update(0.2);
        assert_eq!(emitter.alive_count(), emitter.particles().len());
    }

    #[test]
    fn empty_emitter_has_no_alive_particles() {
        let emitter = ParticleEmitter::new(EmitterConfig::default(), TextureRegion::magenta_placeholder());
        assert_eq!(emitter.alive_count(), 0);
    }
}
