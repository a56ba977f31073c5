//! Error types for the drag-and-drop pipeline.
//!
//! Every variant is recovered locally by the router; none of them is fatal to
//! the embedding engine. They are still surfaced in `RouteOutcome` so callers
//! and tests can observe what happened.

use crate::input::coords::TransformGeneration;
use crate::input::lifecycle::LifecycleKind;
use crate::input::state::DragPhase;
use thiserror::Error;

/// Errors produced while translating host drag notifications
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DndError {
    /// Lifecycle notification not legal in the current phase
    #[error("out-of-order transition: {input:?} while {from:?}")]
    OutOfOrderTransition { from: DragPhase, input: LifecycleKind },

    /// A mapping was computed against a transform that has since moved on
    #[error("stale transform generation {used} (latest {latest})")]
    StaleGeneration {
        used: TransformGeneration,
        latest: TransformGeneration,
    },

    /// Nothing under the point accepts drag input
    #[error("no drag target at ({x:.1}, {y:.1})")]
    HitTestMiss { x: f32, y: f32 },

    /// Host withheld the drag payload
    #[error("payload unavailable: {reason}")]
    PayloadUnavailable { reason: String },

    /// Content context was torn down mid-session
    #[error("content context torn down")]
    BoundaryTeardown,

    /// Session bookkeeping is inconsistent (e.g. two concurrent sessions)
    #[error("drag session contract violated: {detail}")]
    ContractViolation { detail: String },

    /// Notification kind requires coordinates but none were supplied
    #[error("{kind:?} requires coordinates")]
    MissingCoordinates { kind: LifecycleKind },

    /// Generation has been evicted from the transform history (or never existed)
    #[error("unknown transform generation {0}")]
    UnknownGeneration(TransformGeneration),

    /// Content worker thread is gone
    #[error("dispatcher closed")]
    DispatcherClosed,
}

/// Result type alias for drag-and-drop operations
pub type DndResult<T> = Result<T, DndError>;
