//! Drag session state machine.
//!
//! A single explicit enum tracks where the active drag session is in its
//! lifecycle, so illegal notification orders are detected in one place
//! instead of through scattered flags.
//!
//! ## State Transitions
//!
//! ```text
//! Idle      --Started-->  Started
//! Started   --Location--> Started      (position buffered until Entered)
//! Started   --Entered-->  Entered
//! Entered   --Entered-->  Entered
//! Location  --Entered-->  Entered
//! Entered   --Location--> Location
//! Location  --Location--> Location     (coordinates only)
//! Entered   --Exited-->   Started      (left the view, awaiting re-entry)
//! Location  --Exited-->   Started
//! Entered   --Drop-->     Dropped
//! Location  --Drop-->     Dropped
//! Dropped   --Ended-->    Idle
//!
//! Any non-Idle --cancel--> Idle
//! ```

use crate::error::{DndError, DndResult};
use crate::input::coords::{ContentPoint, HostPoint, TransformGeneration};
use crate::input::lifecycle::{DragSource, LifecycleKind};
use crate::payload::DataPayload;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

/// Lifecycle phase of the drag session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DragPhase {
    #[default]
    Idle,
    Started,
    Entered,
    Location,
    Dropped,
}

impl DragPhase {
    /// Pure transition table. `None` means the notification is illegal here.
    ///
    /// `Started` is not part of the table: opening a session goes through
    /// [`DragSessionStateMachine::begin`].
    pub fn next(self, input: LifecycleKind) -> Option<DragPhase> {
        use DragPhase::*;
        match (self, input) {
            (Started, LifecycleKind::Location) => Some(Started),
            (Started | Entered | Location, LifecycleKind::Entered) => Some(Entered),
            (Entered | Location, LifecycleKind::Location) => Some(Location),
            (Entered | Location, LifecycleKind::Exited) => Some(Started),
            (Entered | Location, LifecycleKind::Drop) => Some(Dropped),
            (Dropped, LifecycleKind::Ended) => Some(Idle),
            _ => None,
        }
    }
}

/// Why a session was torn down before a normal `Ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelReason {
    /// Illegal notification order
    OutOfOrder,
    /// Content context navigated away or closed
    ContentTeardown,
    /// Embedder aborted the drag
    Aborted,
    /// A new `Started` arrived while a session was active
    Superseded,
}

/// Outcome of a legal transition.
#[derive(Debug)]
pub struct Transition {
    pub from: DragPhase,
    pub to: DragPhase,
    /// The session, when this transition closed it
    pub finished: Option<DragSession>,
}

/// The single active drag session.
#[derive(Debug, Clone)]
pub struct DragSession {
    pub id: Uuid,
    pub source: DragSource,
    /// Node the drag started from (local drags only)
    pub source_node: Option<u64>,
    pub phase: DragPhase,
    /// Last host position applied to the session
    pub last_host: Option<HostPoint>,
    /// Content position of the last dispatched event
    pub last_content: Option<ContentPoint>,
    /// Generation the last content position was computed against
    pub last_generation: Option<TransformGeneration>,
    /// `Location` received before `Entered`
    pending_host: Option<HostPoint>,
    pub payload: Arc<DataPayload>,
    /// Drop notification arrived but no target accepted it
    pub drop_cancelled: bool,
    /// A `drop` event reached content
    pub drop_delivered: bool,
    pub started_at: Instant,
}

impl DragSession {
    pub fn new(source: DragSource, payload: DataPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            source_node: None,
            phase: DragPhase::Started,
            last_host: None,
            last_content: None,
            last_generation: None,
            pending_host: None,
            payload: Arc::new(payload),
            drop_cancelled: false,
            drop_delivered: false,
            started_at: Instant::now(),
        }
    }

    pub fn with_source_node(mut self, node: Option<u64>) -> Self {
        self.source_node = node;
        self
    }

    pub fn pending_position(&self) -> Option<HostPoint> {
        self.pending_host
    }

    /// Replace the payload when the host only releases it at drop time.
    pub fn attach_payload(&mut self, payload: DataPayload) {
        if self.payload.is_empty() {
            self.payload = Arc::new(payload);
        }
    }
}

/// Owns the lifecycle of at most one drag session.
#[derive(Debug, Default)]
pub struct DragSessionStateMachine {
    session: Option<DragSession>,
}

impl DragSessionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        self.session.as_ref().map_or(DragPhase::Idle, |s| s.phase)
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut DragSession> {
        self.session.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Open a session. Fails if one is already active.
    pub fn begin(&mut self, session: DragSession) -> DndResult<&mut DragSession> {
        if let Some(existing) = &self.session {
            let detail = format!(
                "Started while session {} is {:?} (new session {})",
                existing.id, existing.phase, session.id
            );
            error!(
                session = %existing.id,
                phase = ?existing.phase,
                rejected = %session.id,
                "Concurrent drag sessions observed"
            );
            return Err(DndError::ContractViolation { detail });
        }
        debug!(session = %session.id, source = ?session.source, "Drag session started");
        Ok(self.session.insert(session))
    }

    /// Apply a non-`Started` notification.
    ///
    /// Position handling:
    /// a `Location` while still `Started` is buffered; `Entered` consumes the
    /// buffer when it carries no coordinates of its own.
    pub fn apply(&mut self, input: LifecycleKind, position: Option<HostPoint>) -> DndResult<Transition> {
        let from = self.phase();
        let Some(to) = from.next(input) else {
            return Err(DndError::OutOfOrderTransition { from, input });
        };
        let Some(session) = self.session.as_mut() else {
            return Err(DndError::OutOfOrderTransition { from, input });
        };

        match (from, input) {
            (DragPhase::Started, LifecycleKind::Location) => {
                session.pending_host = position;
            }
            (_, LifecycleKind::Entered) => {
                let buffered = session.pending_host.take();
                if let Some(p) = position.or(buffered) {
                    session.last_host = Some(p);
                }
            }
            _ => {
                if let Some(p) = position {
                    session.last_host = Some(p);
                }
            }
        }

        session.phase = to;
        debug!(session = %session.id, ?from, ?to, ?input, "Drag transition");

        let finished = if to == DragPhase::Idle {
            self.session.take()
        } else {
            None
        };
        Ok(Transition { from, to, finished })
    }

    /// Tear down the active session, if any, returning it.
    pub fn cancel(&mut self, reason: CancelReason) -> Option<DragSession> {
        let session = self.session.take()?;
        debug!(session = %session.id, phase = ?session.phase, ?reason, "Drag session cancelled");
        Some(session)
    }
}
