//! A backend-agnostic 2D retained-mode scene graph and render compiler.
//!
//! Nodes form a tree (`node`); [`transform`] lazily recomputes world
//! transforms and alpha on a dirty-flag walk; [`traversal`] walks the tree
//! pre-order into a flat [`command::RenderCommand`] buffer, consulting the
//! subtree command cache (`cache::command_cache`) and the special-node
//! offscreen path (`special_node`) along the way; [`sort`] stably reorders
//! the buffer by `(render_layer, global_order, tree_order)`; [`batch`]
//! submits it to a [`backend::Backend`] implementation supplied by the
//! embedder. [`scene::Scene`] owns all of this and is the crate's main
//! entry point.

#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::too_many_arguments,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::ref_as_ptr
)]

pub mod atlas;
pub mod backend;
pub mod batch;
pub mod blend;
pub mod cache;
pub mod camera;
pub mod command;
pub mod dispatch;
pub mod errors;
pub mod filter;
pub mod geom;
pub mod invariant;
pub mod node;
pub mod particle;
pub mod rtpool;
pub mod scene;
pub mod sort;
pub mod special_node;
pub mod text;
pub mod texture;
pub mod transform;
pub mod traversal;

pub use atlas::{Atlas, NameTable};
pub use backend::{Backend, Target, Vertex};
pub use batch::BatchMode;
pub use blend::BlendMode;
pub use camera::{Camera, Camera2D};
pub use command::{CommandKind, CommandPayload, CommandTexture, RenderCommand};
pub use dispatch::{Dispatcher, PointerPhase};
pub use errors::{Result, Retained2dError};
pub use filter::{Filter, FilterChain};
pub use geom::{Affine2, Color, Rect};
pub use node::callbacks::{DragEvent, NodeCallbacks, PinchEvent, PointerEvent};
pub use node::hit::HitShape;
pub use node::tree::NodeArena;
pub use node::{Node, NodeId, NodeKind};
pub use particle::{EmitterConfig, EmitterSpace, Particle, ParticleEmitter};
pub use scene::{NodeBuilder, Scene, SceneConfig};
pub use text::{TextBlock, TtfRasterizer};
pub use texture::{PageTable, TextureRegion};
