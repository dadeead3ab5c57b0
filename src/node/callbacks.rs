//! Per-node interaction callbacks.
//!
//! Stored behind a single `Option<Box<NodeCallbacks>>` on [`super::Node`] so
//! the overwhelmingly common "no callbacks" case costs one pointer, per
//! Design Notes §9.

/// Cursor/touch position and modifier state passed to pointer callbacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerEvent {
    pub world_x: f32,
    pub world_y: f32,
    pub local_x: f32,
    pub local_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragEvent {
    pub world_x: f32,
    pub world_y: f32,
    pub delta_x: f32,
    pub delta_y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PinchEvent {
    pub center_x: f32,
    pub center_y: f32,
    pub scale: f32,
}

pub(crate) type PointerCallback = Box<dyn FnMut(PointerEvent)>;
pub(crate) type DragCallback = Box<dyn FnMut(DragEvent)>;
pub(crate) type PinchCallback = Box<dyn FnMut(PinchEvent)>;
pub(crate) type UpdateCallback = Box<dyn FnMut(f32)>;

/// Per-node callback bundle. Each slot is independently optional; only
/// slots that are actually used allocate.
#[derive(Default)]
pub struct NodeCallbacks {
    pub on_pointer_down: Option<PointerCallback>,
    pub on_pointer_up: Option<PointerCallback>,
    pub on_pointer_move: Option<PointerCallback>,
    pub on_pointer_enter: Option<PointerCallback>,
    pub on_pointer_leave: Option<PointerCallback>,
    pub on_click: Option<PointerCallback>,
    pub on_drag_start: Option<DragCallback>,
    pub on_drag: Option<DragCallback>,
    pub on_drag_end: Option<DragCallback>,
    pub on_pinch: Option<PinchCallback>,
    pub on_update: Option<UpdateCallback>,
}

impl NodeCallbacks {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.on_pointer_down.is_none()
            && self.on_pointer_up.is_none()
            && self.on_pointer_move.is_none()
            && self.on_pointer_enter.is_none()
            && self.on_pointer_leave.is_none()
            && self.on_click.is_none()
            && self.on_drag_start.is_none()
            && self.on_drag.is_none()
            && self.on_drag_end.is_none()
            && self.on_pinch.is_none()
            && self.on_update.is_none()
    }
}
