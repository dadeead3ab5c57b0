//! Immediate batching (§4.9): one backend draw call per command.

use crate::backend::Backend;
use crate::command::{CommandKind, CommandPayload, CommandTexture, RenderCommand};
use crate::node::tree::NodeArena;
use crate::node::NodeKind;
use crate::texture::PageTable;

use super::{resolve_image, unit_quad_transform};

/// Submits `commands` (already sorted) one backend call at a time.
pub fn submit<B: Backend>(backend: &mut B, target: &B::Target, commands: &[RenderCommand<B>], arena: &NodeArena<B>, pages: &mut PageTable<B>) {
    for cmd in commands {
        match cmd.kind {
            CommandKind::Sprite => submit_sprite(backend, target, cmd, pages),
            CommandKind::Particle => submit_particle(backend, target, cmd, arena, pages),
            CommandKind::Mesh | CommandKind::Tilemap => submit_mesh(backend, target, cmd, arena),
        }
    }
}

pub(super) fn submit_sprite<B: Backend>(backend: &mut B, target: &B::Target, cmd: &RenderCommand<B>, pages: &mut PageTable<B>) {
    let Some((image, region)) = resolve_image(backend, pages, cmd.texture) else { return };
    let (src, rotated, transform) = match region {
        Some(region) => (super::src_rect(&region), region.rotated, unit_quad_transform(&region, &cmd.transform)),
        None => {
            // Direct image: treat as an unrotated full-image quad scaled
            // to the image's own pixel dimensions.
            let (w, h) = backend.image_bounds(image);
            let region = crate::texture::TextureRegion::new(0, 0.0, 0.0, w as f32, h as f32);
            (super::src_rect(&region), false, unit_quad_transform(&region, &cmd.transform))
        }
    };
    backend.draw_quad(target, image, src, rotated, transform, cmd.color, cmd.blend);
}

fn submit_particle<B: Backend>(backend: &mut B, target: &B::Target, cmd: &RenderCommand<B>, arena: &NodeArena<B>, pages: &mut PageTable<B>) {
    let CommandPayload::Node(node_id) = cmd.payload else { return };
    let Some(node) = arena.get(node_id) else { return };
    let NodeKind::ParticleEmitter(emitter_payload) = &node.kind else { return };
    let Some((image, region)) = resolve_image(backend, pages, CommandTexture::Region(emitter_payload.emitter.region)) else { return };
    let Some(region) = region else { return };

    for particle in emitter_payload.emitter.particles() {
        if !particle.is_alive() {
            continue;
        }
        let local = crate::particle::particle_local_transform(particle, &region);
        let world = cmd.transform * local;
        let color = crate::particle::particle_color(particle, cmd.color);
        let transform = unit_quad_transform(&region, &world);
        backend.draw_quad(target, image, super::src_rect(&region), region.rotated, transform, color, cmd.blend);
    }
}

/// The traversal (§4.4 step 6, Mesh) pre-transforms every vertex into
/// `mesh.transformed_scratch` as it emits the command, tint and
/// `world_alpha` already baked into each vertex color; submission is a
/// plain pass-through so immediate and coalesced modes agree pixel for
/// pixel without re-deriving the transform here.
pub(super) fn submit_mesh<B: Backend>(backend: &mut B, target: &B::Target, cmd: &RenderCommand<B>, arena: &NodeArena<B>) {
    let CommandPayload::Node(node_id) = cmd.payload else { return };
    let Some(node) = arena.get(node_id) else { return };
    let NodeKind::Mesh(mesh) = &node.kind else { return };
    if mesh.transformed_scratch.is_empty() || mesh.indices.is_empty() {
        return; // empty payload, skipped silently (§7)
    }
    if mesh.indices.iter().all(|&i| i <= u32::from(u16::MAX)) {
        let indices16: Vec<u16> = mesh.indices.iter().map(|&i| i as u16).collect();
        backend.draw_triangles(target, &mesh.transformed_scratch, &indices16, Some(mesh.image), mesh.blend);
    } else {
        backend.draw_triangles32(target, &mesh.transformed_scratch, &mesh.indices, Some(mesh.image), mesh.blend);
    }
}
