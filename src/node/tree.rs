//! Tree mutation operations (§4.2): add/insert/remove/reparent children,
//! cycle detection, z-index sibling re-sort, subtree disposal.
//!
//! Grounded on `myth::scene::scene::Scene::attach`/`remove_node`/
//! `collect_subtree`, adapted from myth's separate `SlotMap`-plus-
//! `root_nodes` layout to a single arena that also owns the root.

use slotmap::SlotMap;

use crate::backend::Backend;
use crate::cache::{CachedTexture, NodeCache};
use crate::invariant::{fatal, invariant};
use crate::node::{Node, NodeId, NodeKind};
use crate::texture::TextureRegion;

/// Owns every live node in a scene, keyed by stable [`NodeId`].
pub struct NodeArena<B: Backend> {
    nodes: SlotMap<NodeId, Node<B>>,
}

impl<B: Backend> Default for NodeArena<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> NodeArena<B> {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: SlotMap::with_key() }
    }

    pub fn insert(&mut self, node: Node<B>) -> NodeId {
        self.nodes.insert(node)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node<B>> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node<B>> {
        self.nodes.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> &Node<B> {
        self.nodes.get(id).unwrap_or_else(|| fatal("node lookup", "NodeId not present in arena"))
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node<B> {
        self.nodes.get_mut(id).unwrap_or_else(|| fatal("node lookup", "NodeId not present in arena"))
    }

    /// `true` if `maybe_ancestor` is `node` or a strict ancestor of `node`
    /// (invariant 2: adding a child must never create a cycle).
    #[must_use]
    pub fn is_ancestor(&self, maybe_ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == maybe_ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Appends `child` under `parent` at the end of its child list (§4.2
    /// `addChild`). Detaches `child` from any prior parent first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        invariant(parent != child, "add_child", "a node cannot be its own child");
        invariant(self.contains(parent) && self.contains(child), "add_child", "nil or disposed node");
        invariant(!self.is_ancestor(child, parent), "add_child", "would create a cycle");

        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(parent).mark_children_unsorted();
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).mark_transform_dirty();
        self.invalidate_ancestor_caches(parent);
    }

    /// Inserts `child` under `parent` at index `index` (§4.2 `addChildAt`).
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) {
        invariant(parent != child, "add_child_at", "a node cannot be its own child");
        invariant(self.contains(parent) && self.contains(child), "add_child_at", "nil or disposed node");
        invariant(!self.is_ancestor(child, parent), "add_child_at", "would create a cycle");
        invariant(index <= self.node(parent).children.len(), "add_child_at", "index out of range");

        self.detach(child);
        self.node_mut(parent).children.insert(index, child);
        self.node_mut(parent).mark_children_unsorted();
        self.node_mut(child).parent = Some(parent);
        self.node_mut(child).mark_transform_dirty();
        self.invalidate_ancestor_caches(parent);
    }

    /// Removes `child` from `parent`'s child list (§4.2 `removeChild`).
    /// Fails fatally if `child`'s recorded parent is not `parent`.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        invariant(self.node(child).parent == Some(parent), "remove_child", "child's parent does not match");
        let Some(pos) = self.node(parent).children.iter().position(|&c| c == child) else {
            fatal("remove_child", "child not found in parent's children")
        };
        self.node_mut(parent).children.remove(pos);
        self.node_mut(parent).mark_children_unsorted();
        self.node_mut(child).parent = None;
        self.node_mut(child).mark_transform_dirty();
        self.invalidate_ancestor_caches(parent);
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.node(child).parent {
            if let Some(pos) = self.node(old_parent).children.iter().position(|&c| c == child) {
                self.node_mut(old_parent).children.remove(pos);
                self.node_mut(old_parent).mark_children_unsorted();
            }
        }
    }

    /// Reorders `child` within its parent's child list without detaching
    /// it (§4.2 `setChildIndex`).
    pub fn set_child_index(&mut self, parent: NodeId, child: NodeId, index: usize) {
        invariant(self.node(child).parent == Some(parent), "set_child_index", "child's parent does not match");
        let children = &mut self.node_mut(parent).children;
        let Some(pos) = children.iter().position(|&c| c == child) else {
            fatal("set_child_index", "child not found in parent's children")
        };
        invariant(index < children.len(), "set_child_index", "index out of range");
        children.remove(pos);
        children.insert(index, child);
        self.node_mut(parent).mark_children_unsorted();
    }

    /// Sets `node`'s z-index, invalidating the parent's sibling order
    /// cache only if the value actually changed (§4.2 `setZIndex`).
    pub fn set_z_index(&mut self, node: NodeId, z: i32) {
        if self.node(node).z_index == z {
            return;
        }
        self.node_mut(node).z_index = z;
        if let Some(parent) = self.node(node).parent {
            self.node_mut(parent).mark_children_unsorted();
            self.invalidate_ancestor_caches(parent);
        }
    }

    /// Returns `node`'s children in stable z-index order, rebuilding the
    /// sorted scratch permutation first if it was invalidated (§4.2:
    /// "insertion sort into a scratch-permutation").
    pub fn sorted_children(&mut self, node: NodeId) -> &[NodeId] {
        if !self.node(node).children_sorted {
            let children = self.node(node).children.clone();
            let mut sorted = children;
            insertion_sort_by_z_index(&mut sorted, &self.nodes);
            let n = self.node_mut(node);
            n.sorted_children = sorted;
            n.children_sorted = true;
        }
        &self.node(node).sorted_children
    }

    /// Disposes `node` and its entire subtree, idempotently (§4.2
    /// `dispose`, invariant 15). Removing a node from the slotmap makes
    /// its `NodeId` permanently invalid for future lookups — the slotmap
    /// generation counter is this crate's realization of "zeroed id".
    pub fn dispose(&mut self, node: NodeId) {
        let Some(existing) = self.nodes.get(node) else {
            return; // already disposed; idempotent
        };
        if existing.disposed {
            return;
        }
        if let Some(parent) = existing.parent {
            self.detach_no_dirty(parent, node);
        }
        self.dispose_subtree(node);
    }

    fn detach_no_dirty(&mut self, parent: NodeId, child: NodeId) {
        if let Some(n) = self.nodes.get_mut(parent) {
            if let Some(pos) = n.children.iter().position(|&c| c == child) {
                n.children.remove(pos);
                n.mark_children_unsorted();
            }
        }
    }

    fn dispose_subtree(&mut self, node: NodeId) {
        let children = match self.nodes.get(node) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for child in children {
            self.dispose_subtree(child);
        }
        if let Some(mut n) = self.nodes.remove(node) {
            n.disposed = true;
        }
    }

    /// Walks up from `start`, invalidating the nearest ancestor with an
    /// enabled, auto-invalidating subtree command cache, and (separately)
    /// the nearest ancestor with an enabled texture cache (§4.7, §4.8).
    pub(crate) fn invalidate_ancestor_caches(&mut self, start: NodeId) {
        let mut command_done = false;
        let mut texture_done = false;
        let mut current = Some(start);
        while let Some(id) = current {
            if let Some(node) = self.nodes.get_mut(id) {
                if let Some(cache) = node.cache.as_mut() {
                    if !command_done && cache.command.enabled && cache.command.auto_invalidate {
                        cache.command.dirty = true;
                        command_done = true;
                    }
                    if !texture_done && cache.texture.enabled {
                        cache.texture.invalidate();
                        texture_done = true;
                    }
                }
                if command_done && texture_done {
                    return;
                }
                current = node.parent;
            } else {
                return;
            }
        }
    }

    /// Explicit manual-mode invalidation (§4.7 "Manual" mode): marks
    /// `node`'s own subtree command cache dirty regardless of
    /// `auto_invalidate`.
    pub fn invalidate_cache_tree(&mut self, node: NodeId) {
        if let Some(cache) = self.node_mut(node).cache.as_mut() {
            cache.command.dirty = true;
        }
    }

    #[must_use]
    pub fn is_container(&self, node: NodeId) -> bool {
        matches!(self.node(node).kind, NodeKind::Container)
    }

    /// Sets a `Sprite` node's texture region (§4.7 two-tier texture
    /// pointer). A same-page region change ("animated tile" frame advance)
    /// upgrades the nearest ancestor's matching cache record to
    /// [`CachedTexture::Animated`] in place rather than invalidating the
    /// whole subtree cache; a page change, or no built cache to upgrade,
    /// falls back to the normal ancestor-cache invalidation path.
    pub fn set_sprite_region(&mut self, node_id: NodeId, new_region: TextureRegion) {
        let old_page = match &self.node(node_id).kind {
            NodeKind::Sprite(sprite) => sprite.region.page,
            _ => fatal("set_sprite_region", "node is not a Sprite"),
        };
        if let NodeKind::Sprite(sprite) = &mut self.node_mut(node_id).kind {
            sprite.region = new_region;
        }

        if old_page == new_region.page && self.upgrade_ancestor_cache_record(node_id) {
            return;
        }
        self.invalidate_ancestor_caches(node_id);
    }

    /// `setStaticCache(enabled)` (§4.2, §4.7): enables or disables the
    /// subtree command cache (`CacheAsTree`) on a container node. Lazily
    /// allocates the node's `cache` slot on first enable; disabling leaves
    /// any already-built cache in place but inert, the way `enabled` gates
    /// both build and replay elsewhere in this module.
    pub fn set_static_cache(&mut self, node: NodeId, enabled: bool) {
        let cache = self.node_mut(node).cache.get_or_insert_with(|| Box::new(NodeCache::default()));
        cache.command.enabled = enabled;
        if enabled {
            cache.command.dirty = true;
        }
    }

    /// `setCacheAsTexture(enabled)` (§4.2, §4.8): enables or disables the
    /// subtree texture cache on a node. Lazily allocates the node's `cache`
    /// slot on first enable.
    pub fn set_cache_as_texture(&mut self, node: NodeId, enabled: bool) {
        let cache = self.node_mut(node).cache.get_or_insert_with(|| Box::new(NodeCache::default()));
        cache.texture.enabled = enabled;
        if enabled {
            cache.texture.dirty = true;
        }
    }

    /// `invalidateCache()` (§4.2): marks both of `node`'s own caches dirty
    /// — the subtree command cache (manual-mode equivalent of
    /// [`Self::invalidate_cache_tree`]) and the texture cache (§4.8's
    /// "explicit `invalidateCache()` marks `cacheDirty`"). A no-op for
    /// whichever cache isn't enabled, or if `node` has no cache slot at
    /// all.
    pub fn invalidate_cache(&mut self, node: NodeId) {
        if let Some(cache) = self.node_mut(node).cache.as_mut() {
            if cache.command.enabled {
                cache.command.dirty = true;
            }
            if cache.texture.enabled {
                cache.texture.invalidate();
            }
        }
    }

    /// Finds the nearest ancestor with a built subtree command cache
    /// containing a record sourced from `node_id`, and flips that record's
    /// texture pointer to `Animated`. Returns `false` if no such ancestor
    /// or record exists (caller should fall back to invalidation).
    fn upgrade_ancestor_cache_record(&mut self, node_id: NodeId) -> bool {
        let mut current = self.node(node_id).parent;
        while let Some(id) = current {
            let Some(node) = self.nodes.get_mut(id) else { return false };
            if let Some(cache) = node.cache.as_mut() {
                if cache.command.enabled {
                    if let Some(built) = cache.command.cache.as_mut() {
                        if let Some(record) = built.records.iter_mut().find(|r| r.source_node == node_id) {
                            record.texture = Some(CachedTexture::Animated(node_id));
                            return true;
                        }
                    }
                    return false;
                }
            }
            current = node.parent;
        }
        false
    }
}

fn insertion_sort_by_z_index<B: Backend>(children: &mut [NodeId], nodes: &SlotMap<NodeId, Node<B>>) {
    for i in 1..children.len() {
        let mut j = i;
        while j > 0 && nodes[children[j - 1]].z_index > nodes[children[j]].z_index {
            children.swap(j - 1, j);
            j -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::FakeBackend;

    fn leaf() -> Node<FakeBackend> {
        Node::new(NodeKind::Container)
    }

    #[test]
    fn add_child_sets_parent_and_membership() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(leaf());
        let child = arena.insert(leaf());
        arena.add_child(root, child);
        assert_eq!(arena.get(child).unwrap().parent(), Some(root));
        assert_eq!(arena.get(root).unwrap().children(), &[child]);
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn add_child_rejects_cycle() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let a = arena.insert(leaf());
        let b = arena.insert(leaf());
        arena.add_child(a, b);
        arena.add_child(b, a);
    }

    #[test]
    fn reparenting_detaches_from_old_parent() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let p1 = arena.insert(leaf());
        let p2 = arena.insert(leaf());
        let child = arena.insert(leaf());
        arena.add_child(p1, child);
        arena.add_child(p2, child);
        assert!(arena.get(p1).unwrap().children().is_empty());
        assert_eq!(arena.get(p2).unwrap().children(), &[child]);
    }

    #[test]
    fn dispose_is_idempotent_and_recursive() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(leaf());
        let child = arena.insert(leaf());
        arena.add_child(root, child);
        arena.dispose(root);
        assert!(!arena.contains(root));
        assert!(!arena.contains(child));
        arena.dispose(root); // no-op, must not panic
    }

    #[test]
    fn sorted_children_orders_by_z_index() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(leaf());
        let a = arena.insert(leaf());
        let b = arena.insert(leaf());
        arena.add_child(root, a);
        arena.add_child(root, b);
        arena.set_z_index(a, 5);
        arena.set_z_index(b, 1);
        let sorted = arena.sorted_children(root).to_vec();
        assert_eq!(sorted, vec![b, a]);
    }
}
