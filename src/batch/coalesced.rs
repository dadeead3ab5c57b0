//! Coalesced batching (§4.9): run-length merges consecutive same-batch-key
//! sprites into one triangle-list submission, falling back to individual
//! calls for direct-image sprites, meshes, and particle emitters.
//!
//! Grounded on `other_examples/.../kera-src-render2d-batch.rs`'s
//! sort-then-batch-by-texture loop shape and
//! `other_examples/.../Fyrox__src-renderer-batch.rs`'s batch-key struct.

use crate::backend::Backend;
use crate::blend::BlendMode;
use crate::command::{CommandKind, CommandPayload, CommandTexture, RenderCommand};
use crate::node::tree::NodeArena;
use crate::node::NodeKind;
use crate::texture::PageTable;

use super::{push_quad_indices, push_quad_vertices, resolve_image};

/// Per-frame scratch buffers reused across calls (grown to a high-water
/// mark, never shrunk) so coalescing never allocates once warmed up.
#[derive(Default)]
pub struct CoalesceScratch {
    vertices: Vec<crate::backend::Vertex>,
    indices: Vec<u32>,
}

/// Submits `commands` (already sorted), coalescing adjacent same-key
/// sprite runs into single `draw_triangles`/`draw_triangles32` calls.
pub fn submit<B: Backend>(
    backend: &mut B,
    target: &B::Target,
    commands: &[RenderCommand<B>],
    arena: &NodeArena<B>,
    pages: &mut PageTable<B>,
    scratch: &mut CoalesceScratch,
) {
    let mut run: Option<Run<B>> = None;

    for cmd in commands {
        match cmd.kind {
            CommandKind::Sprite => match cmd.batch_key() {
                Some(key) if !cmd_has_custom_image(cmd, arena) => {
                    if run.as_ref().map(|r| r.key) != Some(key) {
                        flush(backend, target, scratch, run.take());
                        let Some((image, Some(region))) = resolve_image(backend, pages, cmd.texture) else { continue };
                        let _ = region;
                        run = Some(Run { key, image, blend: cmd.blend });
                    }
                    let CommandTexture::Region(region) = cmd.texture else { unreachable!("batch_key is Some only for Region textures") };
                    let base = push_quad_vertices(&mut scratch.vertices, &region, &cmd.transform, cmd.color);
                    push_quad_indices(&mut scratch.indices, base);
                }
                _ => {
                    flush(backend, target, scratch, run.take());
                    super::immediate::submit_sprite(backend, target, cmd, pages);
                }
            },
            CommandKind::Particle => {
                flush(backend, target, scratch, run.take());
                submit_particle_batch(backend, target, cmd, arena, pages, scratch);
            }
            CommandKind::Mesh | CommandKind::Tilemap => {
                flush(backend, target, scratch, run.take());
                super::immediate::submit_mesh(backend, target, cmd, arena);
            }
        }
    }
    flush(backend, target, scratch, run.take());
}

struct Run<B: Backend> {
    key: (u32, u32, u8, u16),
    image: B::Image,
    blend: BlendMode,
}

/// A direct-image sprite always breaks coalescing (§4.9): `batch_key`
/// already returns `None` for it via [`CommandTexture::Direct`], so this
/// only exists to make the sprite match arm above self-documenting.
fn cmd_has_custom_image<B: Backend>(cmd: &RenderCommand<B>, _arena: &NodeArena<B>) -> bool {
    matches!(cmd.texture, CommandTexture::Direct(_))
}

fn flush<B: Backend>(backend: &mut B, target: &B::Target, scratch: &mut CoalesceScratch, run: Option<Run<B>>) {
    let Some(run) = run else {
        scratch.vertices.clear();
        scratch.indices.clear();
        return;
    };
    if scratch.vertices.is_empty() || scratch.indices.is_empty() {
        return;
    }
    if scratch.indices.iter().all(|&i| i <= u32::from(u16::MAX)) {
        let indices16: Vec<u16> = scratch.indices.iter().map(|&i| i as u16).collect();
        backend.draw_triangles(target, &scratch.vertices, &indices16, Some(run.image), run.blend);
    } else {
        backend.draw_triangles32(target, &scratch.vertices, &scratch.indices, Some(run.image), run.blend);
    }
    scratch.vertices.clear();
    scratch.indices.clear();
}

/// One triangle-list submission per emitter (§4.9): every alive particle
/// contributes one quad, using the shared `particle_local_transform`/
/// `particle_color` formulas so immediate and coalesced modes agree pixel
/// for pixel.
fn submit_particle_batch<B: Backend>(
    backend: &mut B,
    target: &B::Target,
    cmd: &RenderCommand<B>,
    arena: &NodeArena<B>,
    pages: &mut PageTable<B>,
    scratch: &mut CoalesceScratch,
) {
    let CommandPayload::Node(node_id) = cmd.payload else { return };
    let Some(node) = arena.get(node_id) else { return };
    let NodeKind::ParticleEmitter(emitter_payload) = &node.kind else { return };
    let Some((image, Some(region))) = resolve_image(backend, pages, CommandTexture::Region(emitter_payload.emitter.region)) else { return };

    for particle in emitter_payload.emitter.particles() {
        if !particle.is_alive() {
            continue;
        }
        let local = crate::particle::particle_local_transform(particle, &region);
        let transform = cmd.transform * local;
        let color = crate::particle::particle_color(particle, cmd.color);
        let base = push_quad_vertices(&mut scratch.vertices, &region, &transform, color);
        push_quad_indices(&mut scratch.indices, base);
    }

    if scratch.vertices.is_empty() {
        return;
    }
    if scratch.indices.iter().all(|&i| i <= u32::from(u16::MAX)) {
        let indices16: Vec<u16> = scratch.indices.iter().map(|&i| i as u16).collect();
        backend.draw_triangles(target, &scratch.vertices, &indices16, Some(image), cmd.blend);
    } else {
        backend.draw_triangles32(target, &scratch.vertices, &scratch.indices, Some(image), cmd.blend);
    }
    scratch.vertices.clear();
    scratch.indices.clear();
}
