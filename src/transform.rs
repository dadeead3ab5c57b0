//! Transform updater (§4.3): pre-order walk recomputing world
//! transform/alpha where dirty, with upward-only dirty marking.
//!
//! Grounded on `myth::scene::transform_system::update_hierarchy_iterative`:
//! an explicit stack instead of recursion, avoiding stack overflow on deep
//! trees and decoupled from `Scene` to avoid borrow conflicts (it only
//! borrows the node arena). [`update_transforms_recursive`] is the
//! recursive counterpart kept the way the teacher keeps
//! `update_transform_recursive` alongside `update_hierarchy_iterative`.

use crate::backend::Backend;
use crate::geom::Affine2;
use crate::node::tree::NodeArena;
use crate::node::NodeId;

/// Recomputes `world_transform`/`world_alpha` for `root` and its subtree,
/// skipping any node whose `transform_dirty` flag is clear and whose
/// ancestor chain (down to `root`) did not recompute either (§4.3).
///
/// Invisible subtrees are still visited, matching the spec's requirement
/// that skipping them is only safe when hit-testing and emission also
/// short-circuit on invisibility — this crate's traversal does that
/// (§4.4 step 1), but the updater itself stays conservative and correct
/// either way.
pub fn update_transforms<B: Backend>(arena: &mut NodeArena<B>, root: NodeId) {
    let mut stack: Vec<(NodeId, Affine2, f32, bool)> = Vec::with_capacity(64);
    stack.push((root, Affine2::IDENTITY, 1.0, false));

    while let Some((node_id, parent_transform, parent_alpha, parent_recomputed)) = stack.pop() {
        let Some(node) = arena.get_mut(node_id) else { continue };

        let recompute = node.transform_dirty || parent_recomputed;
        if recompute {
            let local = node.local_transform();
            node.world_transform = parent_transform * local;
            node.world_alpha = parent_alpha * node.alpha;
            node.transform_dirty = false;
        }

        let world_transform = node.world_transform;
        let world_alpha = node.world_alpha;
        let children = node.children().to_vec();

        for &child in children.iter().rev() {
            stack.push((child, world_transform, world_alpha, recompute));
        }
    }
}

/// Recursive counterpart to [`update_transforms`]: same dirty-propagation
/// rule, call-stack depth instead of an explicit stack. Kept for reference
/// the way the teacher keeps `update_transform_recursive` beside
/// `update_hierarchy_iterative` — not on the `Scene::update` hot path, which
/// always goes through the iterative version to avoid call-stack depth
/// scaling with tree depth.
pub fn update_transforms_recursive<B: Backend>(arena: &mut NodeArena<B>, root: NodeId) {
    update_node_recursive(arena, root, Affine2::IDENTITY, 1.0, false);
}

fn update_node_recursive<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, parent_transform: Affine2, parent_alpha: f32, parent_recomputed: bool) {
    let Some(node) = arena.get_mut(node_id) else { return };

    let recompute = node.transform_dirty || parent_recomputed;
    if recompute {
        let local = node.local_transform();
        node.world_transform = parent_transform * local;
        node.world_alpha = parent_alpha * node.alpha;
        node.transform_dirty = false;
    }

    let world_transform = node.world_transform;
    let world_alpha = node.world_alpha;
    let children = node.children().to_vec();

    for child in children {
        update_node_recursive(arena, child, world_transform, world_alpha, recompute);
    }
}
