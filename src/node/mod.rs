//! Scene node storage (§3 `Node`, §4.2).
//!
//! Nodes are arena-allocated and addressed by a stable key (Design Notes
//! §9), mirroring `myth::scene::node::Node`'s `SlotMap<NodeHandle, Node>`
//! storage. Unlike `myth`, which keeps `Node` a minimal hierarchy+transform
//! record and pushes everything else (mesh, camera, light, ...) into the
//! scene's component maps, §3 specifies `Node` as a single flat record
//! discriminated by `kind` — so the per-kind payload lives inline in
//! [`NodeKind`] instead of a side `SecondaryMap`.

pub mod callbacks;
pub mod hit;
pub mod payload;
pub mod tree;

pub use callbacks::NodeCallbacks;
pub use hit::HitShape;
pub use payload::{EmitterPayload, MeshPayload, SpritePayload, TextPayload};

use slotmap::new_key_type;

use crate::backend::Backend;
use crate::cache::NodeCache;
use crate::filter::FilterChain;
use crate::geom::Affine2;

new_key_type! {
    /// A stable, non-owning handle into a [`crate::scene::Scene`]'s node
    /// arena. Never reused while a node using it is live; the slotmap
    /// generation counter makes a disposed node's old key inert rather
    /// than aliasing a new node at the same slot.
    pub struct NodeId;
}

/// The closed set of node kinds (§3). Discriminates the payload a node
/// carries; `Container` carries none and emits no command itself (§4.4).
pub enum NodeKind<B: Backend> {
    Container,
    Sprite(SpritePayload<B>),
    Mesh(MeshPayload<B>),
    ParticleEmitter(EmitterPayload),
    Text(TextPayload<B>),
}

impl<B: Backend> NodeKind<B> {
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self, NodeKind::Container)
    }
}

/// A single flat node record (§3). Identity/hierarchy/transform fields are
/// hot and read every frame; per-kind payload, callbacks, hit shape, and
/// cache metadata are either small-and-inline or boxed-optional so the
/// "no callback / no cache" common case stays a single pointer per slot
/// (Design Notes §9).
pub struct Node<B: Backend> {
    // --- Identity ---
    pub name: Option<String>,
    pub kind: NodeKind<B>,

    // --- Hierarchy ---
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,

    // --- Local transform inputs ---
    pub x: f32,
    pub y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub rotation: f32,
    pub skew_x: f32,
    pub skew_y: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,

    // --- Computed (updated lazily by the transform updater, §4.3) ---
    pub world_transform: Affine2,
    pub world_alpha: f32,

    // --- Dirty flag (upward-only marking, §4.3) ---
    pub(crate) transform_dirty: bool,

    // --- Visibility ---
    pub alpha: f32,
    pub visible: bool,
    pub renderable: bool,
    pub interactable: bool,

    // --- Ordering ---
    pub z_index: i32,
    pub render_layer: i32,
    pub global_order: i32,

    // --- Interaction ---
    pub hit_shape: Option<HitShape>,
    pub callbacks: Option<Box<NodeCallbacks>>,

    // --- Cache metadata (§4.7, §4.8) ---
    pub cache: Option<Box<NodeCache<B>>>,

    // --- Special-node path (§4.6): mask node, filter chain ---
    pub mask: Option<NodeId>,
    pub filters: Option<Box<FilterChain<B>>>,

    // --- Internal scratch ---
    pub(crate) disposed: bool,
    pub(crate) children_sorted: bool,
    pub(crate) sorted_children: Vec<NodeId>,
}

impl<B: Backend> Node<B> {
    #[must_use]
    pub fn new(kind: NodeKind<B>) -> Self {
        Self {
            name: None,
            kind,
            parent: None,
            children: Vec::new(),
            x: 0.0,
            y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            world_transform: Affine2::IDENTITY,
            world_alpha: 1.0,
            transform_dirty: true,
            alpha: 1.0,
            visible: true,
            renderable: true,
            interactable: true,
            z_index: 0,
            render_layer: 0,
            global_order: 0,
            hit_shape: None,
            callbacks: None,
            cache: None,
            mask: None,
            filters: None,
            disposed: false,
            children_sorted: true,
            sorted_children: Vec::new(),
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Rebuilds this node's local transform from its fields (§4.1).
    #[must_use]
    pub fn local_transform(&self) -> Affine2 {
        Affine2::from_node_fields(self.x, self.y, self.pivot_x, self.pivot_y, self.rotation, self.skew_x, self.skew_y, self.scale_x, self.scale_y)
    }

    /// Marks only this node dirty; descendants inherit recomputation
    /// through the `parentRecomputed` flag on the next update walk (§4.3,
    /// upward-only propagation is a misnomer for "ancestor caches only" —
    /// see [`mark_transform_dirty`](Self::mark_transform_dirty) docs).
    pub(crate) fn mark_transform_dirty(&mut self) {
        self.transform_dirty = true;
    }

    pub(crate) fn mark_children_unsorted(&mut self) {
        self.children_sorted = false;
    }

    /// Transforms a point from this node's local space into world space
    /// using its last-computed [`Node::world_transform`].
    #[must_use]
    pub fn local_to_world(&self, x: f32, y: f32) -> (f32, f32) {
        self.world_transform.transform_point(x, y)
    }

    /// Transforms a point from world space into this node's local space.
    /// Safe on a singular world transform: returns the identity-inverted
    /// (unchanged) point rather than panicking (§4.1).
    #[must_use]
    pub fn world_to_local(&self, x: f32, y: f32) -> (f32, f32) {
        self.world_transform.invert().transform_point(x, y)
    }

    /// `true` when a mask, a non-empty filter chain, or texture caching
    /// requires the offscreen special-node path (§4.6) instead of direct
    /// emission.
    #[must_use]
    pub fn has_special_node_path(&self) -> bool {
        self.mask.is_some()
            || self.filters.as_ref().is_some_and(|f| !f.is_empty())
            || self.cache.as_ref().is_some_and(|c| c.texture.enabled)
    }
}
