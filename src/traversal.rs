//! Pre-order traversal & command emission (§4.4): the heart of the render
//! compiler. Walks the node tree from a root, resolving each node's
//! visibility, subtree-command-cache and special-node dispatch, and
//! per-kind command emission, descending into z-sorted children last.
//!
//! Grounded on `myth::renderer::graph::graph::RenderGraph`'s pass-recording
//! walk (build-then-submit shape) and `myth::scene::scene::Scene`'s
//! pre-order child iteration; the subtree command cache build/replay
//! dispatch is this crate's own — myth's graph has no scene-graph-shaped
//! analogue of it.

use crate::backend::Backend;
use crate::blend::BlendMode;
use crate::cache::{CachedCommandRecord, CachedTexture, SubtreeCommandCache};
use crate::command::{CommandKind, CommandPayload, CommandTexture, RenderCommand};
use crate::geom::{Affine2, Color, Rect};
use crate::node::tree::NodeArena;
use crate::node::{NodeId, NodeKind, TextPayload};
use crate::particle::EmitterSpace;
use crate::rtpool::RenderTargetPool;
use crate::text::{Font, TtfRasterizer, OUTLINE_OFFSETS};
use crate::texture::PageTable;

/// Everything the traversal needs beyond the node arena itself: the current
/// frame's view/cull state, and the collaborators the special-node path
/// (offscreen rendering) and the Text TTF sub-path reach into.
pub struct DrawContext<'a, B: Backend> {
    pub backend: &'a mut B,
    pub pages: &'a mut PageTable<B>,
    pub rt_pool: &'a mut RenderTargetPool<B>,
    pub deferred_release: &'a mut Vec<B::Image>,
    pub ttf_rasterizer: Option<&'a mut dyn TtfRasterizer<B>>,
    pub view_transform: Affine2,
    pub cull_bounds: Rect,
    pub cull_active: bool,
    /// `Some(container)` while recording a subtree command cache build for
    /// `container`; emitted commands are stamped with their source node so
    /// the cache can be assembled afterward (§4.7).
    pub building_cache_for: Option<NodeId>,
}

/// Entry point: walks `root`'s subtree, appending commands to `out`.
pub fn traverse_frame<B: Backend>(arena: &mut NodeArena<B>, root: NodeId, ctx: &mut DrawContext<B>, out: &mut Vec<RenderCommand<B>>) {
    let mut tree_order = 0u64;
    emit_node(arena, root, ctx, out, &mut tree_order);
}

/// Emits `node_id` (if visible and not culled) and recurses into its
/// z-sorted children (§4.4 steps 1-7).
pub(crate) fn emit_node<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, ctx: &mut DrawContext<B>, out: &mut Vec<RenderCommand<B>>, tree_order: &mut u64) {
    let Some(node) = arena.get(node_id) else { return };
    if !node.visible {
        return;
    }
    let node_world_transform = node.world_transform;
    let view_world = ctx.view_transform * node_world_transform;
    let world_alpha = node.world_alpha;
    let renderable = node.renderable;
    let render_layer = node.render_layer;
    let global_order = node.global_order;
    let has_command_cache = node.cache.as_ref().is_some_and(|c| c.command.enabled);
    let has_special = node.has_special_node_path();
    let is_container = node.kind.is_container();

    if has_command_cache {
        let culled = ctx.cull_active && renderable && !subtree_intersects(arena, node_id, node_world_transform, ctx.cull_bounds);
        if !culled {
            command_cache_emit(arena, node_id, view_world, world_alpha, ctx, out, tree_order);
        }
        return;
    }

    if has_special {
        let culled = ctx.cull_active && renderable && !subtree_intersects(arena, node_id, node_world_transform, ctx.cull_bounds);
        if !culled {
            crate::special_node::emit(arena, node_id, view_world, world_alpha, ctx, out, tree_order);
        }
        return;
    }

    if !is_container {
        let culled = ctx.cull_active && renderable && !leaf_world_bounds_intersect(arena, node_id, node_world_transform, ctx.cull_bounds);
        if !culled {
            emit_leaf(arena, node_id, view_world, world_alpha, render_layer, global_order, ctx, out, tree_order);
        }
    }

    let children = arena.sorted_children(node_id).to_vec();
    for child in children {
        emit_node(arena, child, ctx, out, tree_order);
    }
}

/// Culling compares in world space: `cull_bounds` comes from the camera's
/// `visible_bounds()`, which is pre-viewport-transform world space, so the
/// node rect must be transformed by its plain `world_transform` here — not
/// the screen-space `view_transform * world_transform` used for emission —
/// or content would be over-culled by however far the viewport is offset
/// from the world origin.
fn leaf_world_bounds_intersect<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, world_transform: Affine2, cull_bounds: Rect) -> bool {
    let Some(rect) = leaf_local_rect(arena, node_id) else { return true };
    world_transform.transform_aabb(rect).intersects(&cull_bounds)
}

/// The local-space bounding rect of a leaf node's own content, used for
/// both per-leaf culling and subtree bounds accumulation (§4.6 step 1).
/// `Container` has none. The particle emitter uses its own texture region
/// as a simplification that ignores spread/velocity (see `DESIGN.md`).
pub(crate) fn leaf_local_rect<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId) -> Option<Rect> {
    let node = arena.get_mut(node_id)?;
    match &mut node.kind {
        NodeKind::Container => None,
        NodeKind::Sprite(sprite) => Some(Rect::new(sprite.region.trim_x, sprite.region.trim_y, sprite.region.w, sprite.region.h)),
        NodeKind::Mesh(mesh) => Some(mesh.local_bounds()),
        NodeKind::ParticleEmitter(e) => Some(Rect::new(e.emitter.region.trim_x, e.emitter.region.trim_y, e.emitter.region.w, e.emitter.region.h)),
        NodeKind::Text(t) => Some(Rect::new(0.0, 0.0, t.block.measured_w, t.block.measured_h)),
    }
}

/// Accumulates the local-space union of a node's own content rect (if any)
/// and every visible descendant's, composed through each descendant's local
/// transform relative to `node_id` (§4.6 step 1).
pub(crate) fn subtree_local_bounds<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId) -> Rect {
    let mut bounds = leaf_local_rect(arena, node_id);
    let children = arena.get(node_id).map(|n| n.children().to_vec()).unwrap_or_default();
    for child in children {
        accumulate_bounds(arena, child, Affine2::IDENTITY, &mut bounds);
    }
    bounds.unwrap_or_default()
}

fn accumulate_bounds<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, parent_local: Affine2, bounds: &mut Option<Rect>) {
    let Some(node) = arena.get(node_id) else { return };
    if !node.visible {
        return;
    }
    let acc = parent_local * node.local_transform();
    let children = node.children().to_vec();
    if let Some(rect) = leaf_local_rect(arena, node_id) {
        let world_rect = acc.transform_aabb(rect);
        *bounds = Some(match bounds.take() {
            Some(b) => b.union(&world_rect),
            None => world_rect,
        });
    }
    for child in children {
        accumulate_bounds(arena, child, acc, bounds);
    }
}

/// See `leaf_world_bounds_intersect`: `world_transform` must be world space
/// to match `cull_bounds`, not the screen-space transform used for emission.
pub(crate) fn subtree_intersects<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, world_transform: Affine2, cull_bounds: Rect) -> bool {
    let bounds = subtree_local_bounds(arena, node_id);
    world_transform.transform_aabb(bounds).intersects(&cull_bounds)
}

/// Emits one leaf node's own command(s): a single `Sprite`/`Particle`
/// command, a `Mesh` command with pre-transformed vertices, or (for Text)
/// the per-glyph sprites / rasterized-block sprite. Bypassed for
/// containers. Also called directly by `special_node` for the subject/mask
/// node itself, which must not re-enter its own special-node dispatch.
#[allow(clippy::too_many_arguments)]
pub(crate) fn emit_leaf<B: Backend>(
    arena: &mut NodeArena<B>,
    node_id: NodeId,
    view_world: Affine2,
    world_alpha: f32,
    render_layer: i32,
    global_order: i32,
    ctx: &mut DrawContext<B>,
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
) {
    let in_build = ctx.building_cache_for.is_some();
    let Some(node) = arena.get_mut(node_id) else { return };
    match &mut node.kind {
        NodeKind::Container => {}
        NodeKind::Sprite(sprite) => {
            let color = sprite.color.resolve_sentinel().scale_alpha(world_alpha);
            let texture = match sprite.custom_image {
                Some(image) => CommandTexture::Direct(image),
                None => CommandTexture::Region(sprite.region),
            };
            push_command(out, tree_order, CommandKind::Sprite, view_world, texture, color, sprite.blend, render_layer, global_order, CommandPayload::None, false, node_id, in_build);
        }
        NodeKind::Mesh(mesh) => {
            if mesh.vertices.is_empty() || mesh.indices.is_empty() {
                return;
            }
            let tint = mesh.tint.resolve_sentinel().scale_alpha(world_alpha);
            mesh.transformed_scratch.clear();
            for v in &mesh.vertices {
                let (dst_x, dst_y) = view_world.transform_point(v.x, v.y);
                let c = v.color.modulate(tint).premultiplied();
                mesh.transformed_scratch.push(crate::backend::Vertex { dst_x, dst_y, src_x: v.src_x, src_y: v.src_y, color_r: c.r, color_g: c.g, color_b: c.b, color_a: c.a });
            }
            push_command(out, tree_order, CommandKind::Mesh, view_world, CommandTexture::Direct(mesh.image), tint, mesh.blend, render_layer, global_order, CommandPayload::Node(node_id), false, node_id, in_build);
        }
        NodeKind::ParticleEmitter(payload) => {
            if payload.emitter.alive_count() == 0 {
                return;
            }
            let transform = match payload.emitter.config.space {
                EmitterSpace::Attached => view_world,
                EmitterSpace::World => ctx.view_transform,
            };
            let color = Color::WHITE.scale_alpha(world_alpha);
            push_command(out, tree_order, CommandKind::Particle, transform, CommandTexture::Region(payload.emitter.region), color, payload.blend, render_layer, global_order, CommandPayload::Node(node_id), false, node_id, in_build);
        }
        NodeKind::Text(text) => {
            emit_text(text, node_id, view_world, world_alpha, render_layer, global_order, ctx, out, tree_order, in_build);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn emit_text<B: Backend>(
    text: &mut TextPayload<B>,
    node_id: NodeId,
    view_world: Affine2,
    world_alpha: f32,
    render_layer: i32,
    global_order: i32,
    ctx: &mut DrawContext<B>,
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
    in_build: bool,
) {
    if text.block.is_empty() {
        return;
    }
    match &text.block.font {
        Font::Bitmap(_) => {
            let base_color = text.color.resolve_sentinel().scale_alpha(world_alpha);
            let outline = text.block.outline;
            for glyph in &text.block.glyphs {
                let glyph_transform = view_world * Affine2::translation(glyph.x, glyph.y);
                if let Some(outline) = outline {
                    let outline_color = outline.color.scale_alpha(world_alpha);
                    for (dx, dy) in OUTLINE_OFFSETS {
                        let t = glyph_transform * Affine2::translation(dx * outline.thickness, dy * outline.thickness);
                        push_command(out, tree_order, CommandKind::Sprite, t, CommandTexture::Region(glyph.region), outline_color, text.blend, render_layer, global_order, CommandPayload::None, false, node_id, in_build);
                    }
                }
                push_command(out, tree_order, CommandKind::Sprite, glyph_transform, CommandTexture::Region(glyph.region), base_color, text.blend, render_layer, global_order, CommandPayload::None, false, node_id, in_build);
            }
        }
        Font::Ttf(_) => {
            if text.block.raster_dirty || text.raster_image.is_none() {
                let Some(rasterizer) = ctx.ttf_rasterizer.as_deref_mut() else {
                    return; // no rasterizer configured: skip silently (§7)
                };
                let width = text.block.measured_w.ceil().max(1.0) as u32;
                let height = text.block.measured_h.ceil().max(1.0) as u32;
                if let Some(old) = text.raster_image.take() {
                    ctx.backend.deallocate(old);
                }
                text.raster_image = Some(rasterizer.rasterize(ctx.backend, &text.block, width, height));
                text.block.raster_dirty = false;
            }
            let Some(image) = text.raster_image else { return };
            let color = text.color.resolve_sentinel().scale_alpha(world_alpha);
            push_command(out, tree_order, CommandKind::Sprite, view_world, CommandTexture::Direct(image), color, text.blend, render_layer, global_order, CommandPayload::None, false, node_id, in_build);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push_command<B: Backend>(
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
    kind: CommandKind,
    transform: Affine2,
    texture: CommandTexture<B>,
    color: Color,
    blend: BlendMode,
    render_layer: i32,
    global_order: i32,
    payload: CommandPayload,
    transient_direct_image: bool,
    node_id: NodeId,
    in_build: bool,
) {
    out.push(RenderCommand {
        kind,
        transform,
        texture,
        color,
        blend,
        shader_id: 0,
        target_id: 0,
        render_layer,
        global_order,
        tree_order: *tree_order,
        payload,
        transient_direct_image,
        emitting_node_id: if in_build { Some(node_id) } else { None },
    });
    *tree_order += 1;
}

/// Dispatches a `CacheAsTree` container to build, replay, or (once
/// blocked) permanently fall back to uncached traversal (§4.7).
fn command_cache_emit<B: Backend>(
    arena: &mut NodeArena<B>,
    container_id: NodeId,
    view_world: Affine2,
    world_alpha: f32,
    ctx: &mut DrawContext<B>,
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
) {
    let Some(node) = arena.get(container_id) else { return };
    let Some(cache_meta) = node.cache.as_ref() else { return };
    let dirty = cache_meta.command.dirty;
    let has_cache = cache_meta.command.cache.is_some();
    let blocked = cache_meta.command.cache.as_ref().is_some_and(|c| c.blocked);

    if blocked {
        emit_children_uncached(arena, container_id, ctx, out, tree_order);
        return;
    }
    if dirty || !has_cache {
        command_cache_build(arena, container_id, view_world, world_alpha, ctx, out, tree_order);
    } else {
        command_cache_replay(arena, container_id, view_world, world_alpha, out, tree_order);
    }
}

fn emit_children_uncached<B: Backend>(arena: &mut NodeArena<B>, container_id: NodeId, ctx: &mut DrawContext<B>, out: &mut Vec<RenderCommand<B>>, tree_order: &mut u64) {
    let children = arena.get(container_id).map(|n| n.children().to_vec()).unwrap_or_default();
    for child in children {
        emit_node(arena, child, ctx, out, tree_order);
    }
}

/// Records one full traversal of `container_id`'s children with culling
/// disabled, then either stores the result as a replayable cache (§4.7
/// "Build phase") or, if it contains an uncacheable command, marks the
/// cache permanently blocked and falls back to plain emission.
fn command_cache_build<B: Backend>(
    arena: &mut NodeArena<B>,
    container_id: NodeId,
    view_world: Affine2,
    world_alpha: f32,
    ctx: &mut DrawContext<B>,
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
) {
    let prev_building = ctx.building_cache_for;
    let prev_cull = ctx.cull_active;
    ctx.building_cache_for = Some(container_id);
    ctx.cull_active = false;

    let mut built = Vec::new();
    let children = arena.get(container_id).map(|n| n.children().to_vec()).unwrap_or_default();
    let mut local_tree_order = 0u64;
    for child in children {
        emit_node(arena, child, ctx, &mut built, &mut local_tree_order);
    }

    ctx.building_cache_for = prev_building;
    ctx.cull_active = prev_cull;

    let blocked = built.iter().any(|c| matches!(c.kind, CommandKind::Mesh | CommandKind::Particle | CommandKind::Tilemap) || c.transient_direct_image);

    if blocked {
        for mut cmd in built {
            cmd.tree_order = *tree_order;
            *tree_order += 1;
            cmd.emitting_node_id = None;
            out.push(cmd);
        }
        if let Some(cache) = arena.get_mut(container_id).and_then(|n| n.cache.as_mut()) {
            let mut blocked_cache = SubtreeCommandCache::new(view_world, world_alpha);
            blocked_cache.blocked = true;
            cache.command.dirty = false;
            cache.command.cache = Some(blocked_cache);
        }
        return;
    }

    let mut subtree_cache = SubtreeCommandCache::new(view_world, world_alpha);
    for cmd in &built {
        let source_node = cmd.emitting_node_id.unwrap_or(container_id);
        let texture = match cmd.texture {
            CommandTexture::Region(region) => Some(CachedTexture::Static(region)),
            CommandTexture::Direct(_) => None,
        };
        subtree_cache.records.push(CachedCommandRecord { command: *cmd, source_node, texture });
    }

    for mut cmd in built {
        cmd.tree_order = *tree_order;
        *tree_order += 1;
        cmd.emitting_node_id = None;
        out.push(cmd);
    }

    if let Some(cache) = arena.get_mut(container_id).and_then(|n| n.cache.as_mut()) {
        cache.command.dirty = false;
        cache.command.cache = Some(subtree_cache);
    }
}

/// Replays a built cache (§4.7 "Replay phase"): rewrites each record's
/// transform by the delta between the container's build-time and current
/// screen transform, scales alpha by the build-time/current ratio (this
/// crate's straight-alpha color model means only `color.a` is rescaled —
/// see `DESIGN.md`), and re-resolves any `Animated` texture pointer from
/// its live source node.
fn command_cache_replay<B: Backend>(arena: &mut NodeArena<B>, container_id: NodeId, view_world: Affine2, world_alpha: f32, out: &mut Vec<RenderCommand<B>>, tree_order: &mut u64) {
    let Some((cached_transform, cached_alpha, record_count)) =
        arena.get(container_id).and_then(|n| n.cache.as_ref()).and_then(|c| c.command.cache.as_ref()).map(|c| (c.cached_parent_transform, c.cached_parent_alpha, c.records.len()))
    else {
        return;
    };

    let delta = if view_world == cached_transform { Affine2::IDENTITY } else { view_world * cached_transform.invert() };
    let alpha_ratio = if cached_alpha.abs() < 1e-6 { 1.0 } else { world_alpha / cached_alpha };

    for i in 0..record_count {
        let Some(cache) = arena.get(container_id).and_then(|n| n.cache.as_ref()).and_then(|c| c.command.cache.as_ref()) else { return };
        let Some(record) = cache.records.get(i) else { return };
        let mut cmd = record.command;
        let texture = record.texture;
        if !delta.is_identity() {
            cmd.transform = delta * cmd.transform;
        }
        if (alpha_ratio - 1.0).abs() > f32::EPSILON {
            cmd.color = cmd.color.scale_alpha(alpha_ratio);
        }
        if let Some(CachedTexture::Animated(source_node)) = texture {
            if let Some(NodeKind::Sprite(sprite)) = arena.get(source_node).map(|n| &n.kind) {
                cmd.texture = CommandTexture::Region(sprite.region);
            }
        }
        cmd.tree_order = *tree_order;
        *tree_order += 1;
        out.push(cmd);
    }
}
