//! Drag-threshold detection for drags that start inside the content.
//!
//! A press only becomes a drag once the pointer has travelled further than
//! the threshold from where it went down, and only when the press landed on
//! something draggable. Exactly one start is reported per press.

use crate::constants::DEFAULT_DRAG_THRESHOLD_PX;
use crate::hit_testing::NodeId;
use crate::input::coords::HostPoint;
use tracing::{debug, trace};

/// Raw pointer input in host space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down(HostPoint),
    Move(HostPoint),
    Up(HostPoint),
}

/// A press that crossed the drag threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureStart {
    pub origin: HostPoint,
    /// Pointer position on the qualifying move
    pub position: HostPoint,
    pub source_node: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
enum GestureState {
    #[default]
    Released,
    Pressed { origin: HostPoint, source_node: NodeId },
    /// Pressed on something that cannot be dragged
    Inert,
    Dragging,
}

#[derive(Debug, Clone)]
pub struct DragGestureDetector {
    threshold: f32,
    state: GestureState,
}

impl Default for DragGestureDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD_PX)
    }
}

impl DragGestureDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: GestureState::Released,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn is_dragging(&self) -> bool {
        self.state == GestureState::Dragging
    }

    /// `source_node` is the draggable node under the press, if any.
    pub fn pointer_down(&mut self, at: HostPoint, source_node: Option<NodeId>) {
        self.state = match source_node {
            Some(source_node) => GestureState::Pressed { origin: at, source_node },
            None => GestureState::Inert,
        };
        trace!(x = at.x, y = at.y, ?source_node, "Pointer down");
    }

    /// Returns the start on the first move beyond the threshold.
    pub fn pointer_move(&mut self, at: HostPoint) -> Option<GestureStart> {
        let GestureState::Pressed { origin, source_node } = self.state else {
            return None;
        };
        let distance = origin.distance_to(at);
        if distance <= self.threshold {
            return None;
        }

        debug!(distance, threshold = self.threshold, source_node, "Drag threshold crossed");
        self.state = GestureState::Dragging;
        Some(GestureStart {
            origin,
            position: at,
            source_node,
        })
    }

    pub fn pointer_up(&mut self) {
        self.state = GestureState::Released;
    }
}
