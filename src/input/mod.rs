//! Host drag input handling.
//!
//! Host notifications enter through [`GestureInputRouter`], which drives the
//! session state machine and everything downstream of it.
//!
//! ## Architecture
//!
//! The drag session uses an explicit state machine (`DragPhase`) to track
//! where it is in its lifecycle. Illegal notification orders fall out of the
//! transition table instead of being checked through scattered flags.
//!
//! ## Modules
//!
//! - `coords` - Pan/zoom transform snapshots and host → content mapping
//! - `lifecycle` - Host notification types and their builder
//! - `state` - Session state machine
//! - `gesture` - Drag threshold detection for drags starting in content
//! - `router` - Entry point tying the pipeline together

pub mod coords;
pub mod gesture;
pub mod lifecycle;
pub mod router;
pub mod state;

pub use coords::{CoordinateTransformer, HostPoint, HostRect, MappedPoint, TransformGeneration, TransformUpdate};
pub use gesture::{DragGestureDetector, PointerEvent};
pub use lifecycle::{DragSource, LifecycleEvent, LifecycleKind};
pub use router::{GestureInputRouter, RouteOutcome};
pub use state::{CancelReason, DragPhase, DragSession, DragSessionStateMachine};
