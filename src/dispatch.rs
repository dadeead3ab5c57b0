//! Pointer and gesture dispatch (§6 Application field group, §9 "Scene-level
//! dispatch follows front-to-back tree order").
//!
//! The scene never polls for input itself: the embedder feeds raw pointer
//! samples in through [`crate::scene::Scene::dispatch_pointer`], and this
//! module hit-tests the tree, fires the matching per-node callback(s) at
//! most once per sample, and carries just enough state across samples
//! (current hover target, each pointer's down node and drag state) to
//! derive enter/leave, click, and drag-start/drag/drag-end from a plain
//! down/move/up stream. A concurrent second pointer turns a drag into a
//! pinch on whatever node the first pointer grabbed.

use rustc_hash::FxHashMap;

use crate::backend::Backend;
use crate::node::callbacks::{DragCallback, DragEvent, PinchEvent, PointerCallback, PointerEvent};
use crate::node::tree::NodeArena;
use crate::node::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Clone, Copy, Debug)]
struct PointerTrack {
    down_node: Option<NodeId>,
    dragging: bool,
    down_world_x: f32,
    down_world_y: f32,
    last_world_x: f32,
    last_world_y: f32,
}

#[derive(Clone, Copy, Debug)]
struct PinchTrack {
    node: NodeId,
    pointer_a: u64,
    pointer_b: u64,
    initial_distance: f32,
}

/// Per-scene interaction state: the current hover target and every pointer
/// currently down, carried frame to frame so hit-tested events can be
/// derived incrementally instead of re-examined whole.
#[derive(Default)]
pub struct Dispatcher {
    hover: Option<NodeId>,
    pointers: FxHashMap<u64, PointerTrack>,
    pinch: Option<PinchTrack>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hit-tests from `root` toward the leaves, checking children
    /// front-to-back (later z-order and later siblings paint on top, so
    /// they are tested first) before the node itself. A node with
    /// `visible == false` or `interactable == false` blocks its whole
    /// subtree, mirroring how `traversal::emit_node` treats `visible`.
    #[must_use]
    pub fn hit_test<B: Backend>(arena: &mut NodeArena<B>, root: NodeId, world_x: f32, world_y: f32) -> Option<NodeId> {
        hit_test_node(arena, root, world_x, world_y)
    }

    /// Dispatches one pointer sample (§6): fires `onPointerEnter`/`Leave`
    /// against the previous hover target when it changes, then the
    /// phase-specific callback(s) — `onPointerDown`/`Up`/`Move`, `onClick`
    /// when an `Up` lands on the same node a `Down` started on without
    /// leaving the drag dead zone, and `onDragStart`/`Drag`/`End` once
    /// movement since `Down` exceeds `drag_dead_zone`. A second pointer
    /// going down while another is held on the same node starts a pinch;
    /// subsequent moves on either pointer fire `onPinch` instead of drag.
    pub fn dispatch_pointer<B: Backend>(&mut self, arena: &mut NodeArena<B>, root: NodeId, pointer_id: u64, phase: PointerPhase, world_x: f32, world_y: f32, drag_dead_zone: f32) {
        let hit = hit_test_node(arena, root, world_x, world_y);

        if hit != self.hover {
            if let Some(prev) = self.hover {
                fire_pointer(arena, prev, |cb| &mut cb.on_pointer_leave, world_x, world_y);
            }
            if let Some(next) = hit {
                fire_pointer(arena, next, |cb| &mut cb.on_pointer_enter, world_x, world_y);
            }
            self.hover = hit;
        }

        match phase {
            PointerPhase::Down => self.on_down(arena, pointer_id, hit, world_x, world_y),
            PointerPhase::Move => self.on_move(arena, pointer_id, hit, world_x, world_y, drag_dead_zone),
            PointerPhase::Up => self.on_up(arena, pointer_id, hit, world_x, world_y),
        }
    }

    fn on_down<B: Backend>(&mut self, arena: &mut NodeArena<B>, pointer_id: u64, hit: Option<NodeId>, world_x: f32, world_y: f32) {
        if let Some(node) = hit {
            fire_pointer(arena, node, |cb| &mut cb.on_pointer_down, world_x, world_y);
        }

        if self.pinch.is_none() {
            if let Some(node) = hit {
                if let Some((&other_id, other)) = self.pointers.iter().find(|(&id, t)| id != pointer_id && t.down_node == Some(node)) {
                    let distance = ((world_x - other.last_world_x).powi(2) + (world_y - other.last_world_y).powi(2)).sqrt();
                    if distance > f32::EPSILON {
                        self.pinch = Some(PinchTrack { node, pointer_a: other_id, pointer_b: pointer_id, initial_distance: distance });
                    }
                }
            }
        }

        self.pointers.insert(pointer_id, PointerTrack { down_node: hit, dragging: false, down_world_x: world_x, down_world_y: world_y, last_world_x: world_x, last_world_y: world_y });
    }

    fn on_move<B: Backend>(&mut self, arena: &mut NodeArena<B>, pointer_id: u64, hit: Option<NodeId>, world_x: f32, world_y: f32, drag_dead_zone: f32) {
        if let Some(node) = hit {
            fire_pointer(arena, node, |cb| &mut cb.on_pointer_move, world_x, world_y);
        }

        if let Some(pinch) = self.pinch {
            if pinch.pointer_a == pointer_id || pinch.pointer_b == pointer_id {
                self.update_pinch(arena, pointer_id, world_x, world_y, pinch);
            }
        }

        let Some(track) = self.pointers.get_mut(&pointer_id) else { return };
        let Some(down_node) = track.down_node else {
            track.last_world_x = world_x;
            track.last_world_y = world_y;
            return;
        };
        if self.pinch.is_some() {
            track.last_world_x = world_x;
            track.last_world_y = world_y;
            return;
        }

        if !track.dragging {
            let total_dx = world_x - track.down_world_x;
            let total_dy = world_y - track.down_world_y;
            if (total_dx * total_dx + total_dy * total_dy).sqrt() >= drag_dead_zone {
                track.dragging = true;
                fire_drag(arena, down_node, |cb| &mut cb.on_drag_start, world_x, world_y, 0.0, 0.0);
            }
        }
        if track.dragging {
            let delta_x = world_x - track.last_world_x;
            let delta_y = world_y - track.last_world_y;
            fire_drag(arena, down_node, |cb| &mut cb.on_drag, world_x, world_y, delta_x, delta_y);
        }
        track.last_world_x = world_x;
        track.last_world_y = world_y;
    }

    fn on_up<B: Backend>(&mut self, arena: &mut NodeArena<B>, pointer_id: u64, hit: Option<NodeId>, world_x: f32, world_y: f32) {
        if self.pinch.is_some_and(|p| p.pointer_a == pointer_id || p.pointer_b == pointer_id) {
            self.pinch = None;
        }

        if let Some(track) = self.pointers.remove(&pointer_id) {
            if let Some(down_node) = track.down_node {
                if track.dragging {
                    let delta_x = world_x - track.down_world_x;
                    let delta_y = world_y - track.down_world_y;
                    fire_drag(arena, down_node, |cb| &mut cb.on_drag_end, world_x, world_y, delta_x, delta_y);
                } else if hit == Some(down_node) {
                    fire_pointer(arena, down_node, |cb| &mut cb.on_click, world_x, world_y);
                }
            }
        }

        if let Some(node) = hit {
            fire_pointer(arena, node, |cb| &mut cb.on_pointer_up, world_x, world_y);
        }
    }

    fn update_pinch<B: Backend>(&mut self, arena: &mut NodeArena<B>, pointer_id: u64, world_x: f32, world_y: f32, pinch: PinchTrack) {
        let other_pointer = if pinch.pointer_a == pointer_id { pinch.pointer_b } else { pinch.pointer_a };
        let Some(other) = self.pointers.get(&other_pointer) else { return };
        let (ox, oy) = (other.last_world_x, other.last_world_y);
        let distance = ((world_x - ox).powi(2) + (world_y - oy).powi(2)).sqrt();
        if pinch.initial_distance <= f32::EPSILON {
            return;
        }
        let scale = distance / pinch.initial_distance;
        let center_x = (world_x + ox) * 0.5;
        let center_y = (world_y + oy) * 0.5;
        fire_pinch(arena, pinch.node, center_x, center_y, scale);
    }
}

fn hit_test_node<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, world_x: f32, world_y: f32) -> Option<NodeId> {
    let (visible, interactable) = {
        let node = arena.get(node_id)?;
        (node.visible, node.interactable)
    };
    if !visible || !interactable {
        return None;
    }

    let children: Vec<NodeId> = arena.sorted_children(node_id).to_vec();
    for &child in children.iter().rev() {
        if let Some(hit) = hit_test_node(arena, child, world_x, world_y) {
            return Some(hit);
        }
    }

    let node = arena.get(node_id)?;
    let shape = node.hit_shape.as_ref()?;
    let (local_x, local_y) = node.world_transform.invert().transform_point(world_x, world_y);
    if shape.contains_local(local_x, local_y) { Some(node_id) } else { None }
}

fn fire_pointer<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, select: impl FnOnce(&mut crate::node::NodeCallbacks) -> &mut Option<PointerCallback>, world_x: f32, world_y: f32) {
    let Some(node) = arena.get_mut(node_id) else { return };
    if !node.interactable {
        return;
    }
    let (local_x, local_y) = node.world_transform.invert().transform_point(world_x, world_y);
    let Some(callbacks) = node.callbacks.as_mut() else { return };
    if let Some(cb) = select(callbacks).as_mut() {
        cb(PointerEvent { world_x, world_y, local_x, local_y });
    }
}

fn fire_drag<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, select: impl FnOnce(&mut crate::node::NodeCallbacks) -> &mut Option<DragCallback>, world_x: f32, world_y: f32, delta_x: f32, delta_y: f32) {
    let Some(node) = arena.get_mut(node_id) else { return };
    if !node.interactable {
        return;
    }
    let Some(callbacks) = node.callbacks.as_mut() else { return };
    if let Some(cb) = select(callbacks).as_mut() {
        cb(DragEvent { world_x, world_y, delta_x, delta_y });
    }
}

fn fire_pinch<B: Backend>(arena: &mut NodeArena<B>, node_id: NodeId, center_x: f32, center_y: f32, scale: f32) {
    let Some(node) = arena.get_mut(node_id) else { return };
    if !node.interactable {
        return;
    }
    let Some(callbacks) = node.callbacks.as_mut() else { return };
    if let Some(cb) = callbacks.on_pinch.as_mut() {
        cb(PinchEvent { center_x, center_y, scale });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::FakeBackend;
    use crate::geom::Affine2;
    use crate::node::hit::HitShape;
    use crate::node::{Node, NodeCallbacks, NodeKind};

    fn leaf_with_shape() -> Node<FakeBackend> {
        let mut node = Node::new(NodeKind::Container);
        node.hit_shape = Some(HitShape::Rect(crate::geom::Rect::new(-5.0, -5.0, 10.0, 10.0)));
        node.world_transform = Affine2::IDENTITY;
        node
    }

    #[test]
    fn hit_test_finds_the_topmost_node_at_a_point() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(Node::new(NodeKind::Container));
        let back = arena.insert(leaf_with_shape());
        let front = arena.insert(leaf_with_shape());
        arena.add_child(root, back);
        arena.add_child(root, front);

        assert_eq!(Dispatcher::hit_test(&mut arena, root, 0.0, 0.0), Some(front));
        assert_eq!(Dispatcher::hit_test(&mut arena, root, 100.0, 100.0), None);
    }

    #[test]
    fn hit_test_skips_a_non_interactable_subtree() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(Node::new(NodeKind::Container));
        let child = arena.insert(leaf_with_shape());
        arena.add_child(root, child);
        arena.get_mut(child).unwrap().interactable = false;

        assert_eq!(Dispatcher::hit_test(&mut arena, root, 0.0, 0.0), None);
    }

    #[test]
    fn click_fires_on_a_clean_down_up_pair_without_drag() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(Node::new(NodeKind::Container));
        let target = arena.insert(leaf_with_shape());
        arena.add_child(root, target);

        let clicked = std::rc::Rc::new(std::cell::RefCell::new(false));
        let clicked_inner = clicked.clone();
        let mut callbacks = NodeCallbacks::default();
        callbacks.on_click = Some(Box::new(move |_| *clicked_inner.borrow_mut() = true));
        arena.get_mut(target).unwrap().callbacks = Some(Box::new(callbacks));

        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Down, 0.0, 0.0, 4.0);
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Up, 1.0, 1.0, 4.0);

        assert!(*clicked.borrow());
    }

    #[test]
    fn movement_past_the_dead_zone_drags_instead_of_clicking() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(Node::new(NodeKind::Container));
        let target = arena.insert(leaf_with_shape());
        arena.add_child(root, target);

        let drag_deltas = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let drag_deltas_inner = drag_deltas.clone();
        let clicked = std::rc::Rc::new(std::cell::RefCell::new(false));
        let clicked_inner = clicked.clone();
        let mut callbacks = NodeCallbacks::default();
        callbacks.on_drag = Some(Box::new(move |e: DragEvent| drag_deltas_inner.borrow_mut().push((e.delta_x, e.delta_y))));
        callbacks.on_click = Some(Box::new(move |_| *clicked_inner.borrow_mut() = true));
        arena.get_mut(target).unwrap().callbacks = Some(Box::new(callbacks));

        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Down, 0.0, 0.0, 4.0);
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Move, 10.0, 0.0, 4.0);
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Up, 10.0, 0.0, 4.0);

        assert!(!*clicked.borrow(), "a drag past the dead zone must not also fire a click");
        assert_eq!(drag_deltas.borrow().len(), 1);
    }

    #[test]
    fn hover_enter_and_leave_fire_as_the_pointer_crosses_the_shape() {
        let mut arena = NodeArena::<FakeBackend>::new();
        let root = arena.insert(Node::new(NodeKind::Container));
        let target = arena.insert(leaf_with_shape());
        arena.add_child(root, target);

        let entered = std::rc::Rc::new(std::cell::RefCell::new(0));
        let left = std::rc::Rc::new(std::cell::RefCell::new(0));
        let (entered_inner, left_inner) = (entered.clone(), left.clone());
        let mut callbacks = NodeCallbacks::default();
        callbacks.on_pointer_enter = Some(Box::new(move |_| *entered_inner.borrow_mut() += 1));
        callbacks.on_pointer_leave = Some(Box::new(move |_| *left_inner.borrow_mut() += 1));
        arena.get_mut(target).unwrap().callbacks = Some(Box::new(callbacks));

        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Move, 0.0, 0.0, 4.0);
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Move, 1.0, 1.0, 4.0);
        dispatcher.dispatch_pointer(&mut arena, root, 1, PointerPhase::Move, 100.0, 100.0, 4.0);

        assert_eq!(*entered.borrow(), 1);
        assert_eq!(*left.borrow(), 1);
    }
}
