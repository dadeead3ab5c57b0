//! The special-node offscreen path (§4.6): mask compositing, filter
//! chains, and cache-as-texture all rasterize a node's subtree into a
//! pooled image before folding the result back into the main command
//! stream as a single sprite.
//!
//! Unlike the subtree *command* cache (§4.7, dispatched directly from
//! `traversal`), this path always performs real work against the backend —
//! it submits its own mini batch via `batch::submit` rather than deferring
//! to the frame's main sort+submit pass, since its output (a rasterized
//! image) must exist before the enclosing frame can draw the sprite that
//! samples it.

use crate::backend::Backend;
use crate::batch::coalesced::CoalesceScratch;
use crate::batch::{self, BatchMode};
use crate::blend::BlendMode;
use crate::command::{CommandKind, CommandPayload, CommandTexture, RenderCommand};
use crate::geom::{Affine2, Color, Rect};
use crate::node::tree::NodeArena;
use crate::node::NodeId;
use crate::sort::stable_sort_commands;
use crate::traversal::{emit_leaf, emit_node, subtree_local_bounds, DrawContext};

#[allow(clippy::too_many_arguments)]
pub(crate) fn emit<B: Backend>(
    arena: &mut NodeArena<B>,
    node_id: NodeId,
    view_world: Affine2,
    world_alpha: f32,
    ctx: &mut DrawContext<B>,
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
) {
    let Some(node) = arena.get(node_id) else { return };
    let render_layer = node.render_layer;
    let global_order = node.global_order;
    let node_world_transform = node.world_transform;
    let mask = node.mask;
    let cache_as_texture = node.cache.as_ref().is_some_and(|c| c.texture.enabled);

    // Step 4: a live, non-dirty texture cache replays as a single sprite.
    if cache_as_texture {
        let Some(node) = arena.get(node_id) else { return };
        let cache = node.cache.as_ref().expect("cache_as_texture implies a cache slot");
        if cache.texture.is_usable() {
            let image = cache.texture.texture.expect("is_usable() checked texture.is_some()");
            let (ox, oy) = (cache.texture.origin_x, cache.texture.origin_y);
            let placement = view_world * Affine2::translation(ox, oy);
            push_direct_sprite(out, tree_order, placement, image, world_alpha, render_layer, global_order, node_id, ctx.building_cache_for.is_some(), false);
            return;
        }
    }

    // Steps 1-2: subtree bounds padded by the filter chain's total padding.
    let bounds = subtree_local_bounds(arena, node_id);
    let padding = arena.get(node_id).and_then(|n| n.filters.as_ref()).map_or(0, |f| f.total_padding()) as f32;
    let padded = bounds.inflate(padding);
    let width = padded.w.ceil().max(1.0) as u32;
    let height = padded.h.ceil().max(1.0) as u32;

    // Step 3: shift so the offscreen image's origin sits at the subtree's
    // padded top-left, expressed in the node's own local space.
    let nested_view = Affine2::translation(-padded.x, -padded.y) * node_world_transform.invert();

    let primary = ctx.rt_pool.acquire(ctx.backend, width, height);
    let primary_target = ctx.backend.image_as_target(primary);
    render_subtree_into(arena, node_id, nested_view, &primary_target, ctx);

    let mut final_image = primary;

    if let Some(mask_id) = mask {
        let mask_image = ctx.rt_pool.acquire(ctx.backend, width, height);
        let mask_target = ctx.backend.image_as_target(mask_image);
        render_subtree_into(arena, mask_id, nested_view, &mask_target, ctx);
        let full_rect = Rect::new(0.0, 0.0, width as f32, height as f32);
        let unit_to_full = Affine2::scale(width as f32, height as f32);
        let target = ctx.backend.image_as_target(primary);
        ctx.backend.draw_quad(&target, mask_image, full_rect, false, unit_to_full, Color::WHITE, BlendMode::Mask);
        ctx.rt_pool.release(Some(mask_image));
    }

    let has_filters = arena.get(node_id).and_then(|n| n.filters.as_ref()).is_some_and(|f| !f.is_empty());
    if has_filters {
        let taken = arena.get_mut(node_id).and_then(|n| n.filters.take());
        if let Some(mut chain) = taken {
            final_image = chain.apply_all(ctx.backend, ctx.rt_pool, final_image, width, height);
            if let Some(node) = arena.get_mut(node_id) {
                node.filters = Some(chain);
            }
        }
    }

    let placement = view_world * Affine2::translation(padded.x, padded.y);

    if cache_as_texture {
        let owned = copy_to_owned_image(ctx.backend, final_image, width, height);
        ctx.rt_pool.release(Some(final_image));
        if let Some(node) = arena.get_mut(node_id) {
            if let Some(cache) = node.cache.as_mut() {
                if let Some(old) = cache.texture.texture.replace(owned) {
                    ctx.backend.deallocate(old);
                }
                cache.texture.dirty = false;
                cache.texture.origin_x = padded.x;
                cache.texture.origin_y = padded.y;
            }
        }
        push_direct_sprite(out, tree_order, placement, owned, world_alpha, render_layer, global_order, node_id, ctx.building_cache_for.is_some(), false);
    } else {
        ctx.deferred_release.push(final_image);
        push_direct_sprite(out, tree_order, placement, final_image, world_alpha, render_layer, global_order, node_id, ctx.building_cache_for.is_some(), true);
    }
}

/// Renders `node_id`'s own content plus its descendants into `target`
/// (§4.6 step 5b): culling disabled, view transform replaced by the
/// offscreen-local one. Used for both the primary subject and a mask node.
fn render_subtree_into<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, nested_view: Affine2, target: &B::Target, ctx: &mut DrawContext<B>) {
    let prev_view = ctx.view_transform;
    let prev_cull = ctx.cull_active;
    ctx.view_transform = nested_view;
    ctx.cull_active = false;

    let mut commands = Vec::new();
    let mut local_tree_order = 0u64;
    emit_self_and_children(arena, node_id, ctx, &mut commands, &mut local_tree_order);

    ctx.view_transform = prev_view;
    ctx.cull_active = prev_cull;

    stable_sort_commands(&mut commands, &mut Vec::new());
    let mut scratch = CoalesceScratch::default();
    batch::submit(BatchMode::Coalesced, ctx.backend, target, &commands, arena, ctx.pages, &mut scratch);
}

/// Emits `node_id`'s own leaf content directly (bypassing its own
/// special-node/cache dispatch, which already routed execution here) and
/// descends into its children through the normal dispatch (their own
/// special-node/cache state still applies).
fn emit_self_and_children<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, ctx: &mut DrawContext<B>, out: &mut Vec<RenderCommand<B>>, tree_order: &mut u64) {
    if let Some(node) = arena.get(node_id) {
        if node.visible && !node.kind.is_container() {
            let view_world = ctx.view_transform * node.world_transform;
            let world_alpha = node.world_alpha;
            let render_layer = node.render_layer;
            let global_order = node.global_order;
            emit_leaf(arena, node_id, view_world, world_alpha, render_layer, global_order, ctx, out, tree_order);
        }
    }
    let children = arena.get(node_id).map(|n| n.children().to_vec()).unwrap_or_default();
    for child in children {
        emit_node(arena, child, ctx, out, tree_order);
    }
}

fn copy_to_owned_image<B: Backend>(backend: &mut B, image: B::Image, width: u32, height: u32) -> B::Image {
    let owned = backend.new_image(width, height);
    let mut pixels = vec![0u8; (width as usize) * (height as usize) * 4];
    backend.read_pixels(image, &mut pixels);
    backend.write_pixels(owned, &pixels);
    owned
}

#[allow(clippy::too_many_arguments)]
fn push_direct_sprite<B: Backend>(
    out: &mut Vec<RenderCommand<B>>,
    tree_order: &mut u64,
    transform: Affine2,
    image: B::Image,
    world_alpha: f32,
    render_layer: i32,
    global_order: i32,
    node_id: NodeId,
    in_build: bool,
    transient: bool,
) {
    out.push(RenderCommand {
        kind: CommandKind::Sprite,
        transform,
        texture: CommandTexture::Direct(image),
        color: Color::WHITE.scale_alpha(world_alpha),
        blend: BlendMode::Normal,
        shader_id: 0,
        target_id: 0,
        render_layer,
        global_order,
        tree_order: *tree_order,
        payload: CommandPayload::None,
        transient_direct_image: transient,
        emitting_node_id: if in_build { Some(node_id) } else { None },
    });
    *tree_order += 1;
}
