//! Entry point for host drag notifications.
//!
//! The router owns the session state machine and drives, for every accepted
//! notification: state transition, coordinate mapping against the latest
//! transform, hit testing, event synthesis and delivery to content.
//!
//! ## Rules
//!
//! - Coordinates are mapped at dispatch time, never cached from receipt.
//!   If the transform moves while a hit test runs, the point is remapped
//!   (up to `max_remap_attempts`).
//! - `dragenter`/`dragover`/`dragleave` need a target; a miss suppresses the
//!   event but keeps the session.
//! - A `Drop` over nothing cancels the drop; the session waits for `Ended`.
//! - Content teardown wins over everything else: the session is cancelled
//!   and content hears nothing more about it.
//! - Every other cancellation sends exactly one synthetic `dragend`.

use crate::dispatch::{BoundaryHandle, ContentSink, CrossBoundaryDispatcher, Delivery};
use crate::error::{DndError, DndResult};
use crate::events::{DOMEventSynthesizer, DragEventType};
use crate::hit_testing::{HitTestResolver, HitTestTarget, NodeId, SharedContentTree};
use crate::input::coords::{CoordinateTransformer, HostPoint, MappedPoint};
use crate::input::gesture::{DragGestureDetector, PointerEvent};
use crate::input::lifecycle::{DragSource, LifecycleEvent, LifecycleKind};
use crate::input::state::{CancelReason, DragPhase, DragSession, DragSessionStateMachine};
use crate::payload::{DataPayload, DataPayloadAdapter, NativePayload};
use crate::perf::LatencyStats;
use crate::profile_scope;
use crate::settings::DndSettings;
use tracing::{debug, info, trace, warn};

/// What the router did with one notification.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// An event was sent to content
    Dispatched { event: DragEventType, delivery: Delivery },
    /// `Location` before `Entered`: position kept for later
    Buffered,
    /// Transition accepted, but no event was sent
    Suppressed { event: DragEventType, reason: DndError },
    /// The session was torn down
    Cancelled {
        reason: CancelReason,
        error: Option<DndError>,
        /// Whether a synthetic `dragend` reached content
        dragend: bool,
    },
    /// Notification refused without touching any session
    Rejected(DndError),
    /// Nothing to do
    Ignored,
}

impl RouteOutcome {
    pub fn dispatched(&self) -> Option<DragEventType> {
        match self {
            Self::Dispatched { event, .. } => Some(*event),
            _ => None,
        }
    }
}

pub struct GestureInputRouter {
    machine: DragSessionStateMachine,
    transformer: CoordinateTransformer,
    resolver: HitTestResolver,
    dispatcher: CrossBoundaryDispatcher,
    gesture: DragGestureDetector,
    max_remap_attempts: u32,
}

impl GestureInputRouter {
    pub fn new(
        transformer: CoordinateTransformer,
        tree: SharedContentTree,
        sink: impl ContentSink,
    ) -> std::io::Result<Self> {
        Self::with_settings(transformer, tree, sink, &DndSettings::default())
    }

    /// Build a router and spawn its content thread.
    pub fn with_settings(
        transformer: CoordinateTransformer,
        tree: SharedContentTree,
        sink: impl ContentSink,
        settings: &DndSettings,
    ) -> std::io::Result<Self> {
        let dispatcher =
            CrossBoundaryDispatcher::with_config(sink, settings.dispatch_queue_depth, settings.ack_timeout())?;
        transformer.set_history_capacity(settings.transform_history);

        Ok(Self {
            machine: DragSessionStateMachine::new(),
            transformer,
            resolver: HitTestResolver::new(tree),
            dispatcher,
            gesture: DragGestureDetector::new(settings.drag_threshold_px),
            max_remap_attempts: settings.max_remap_attempts,
        })
    }

    pub fn phase(&self) -> DragPhase {
        self.machine.phase()
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.machine.session()
    }

    pub fn transformer(&self) -> &CoordinateTransformer {
        &self.transformer
    }

    pub fn resolver(&self) -> &HitTestResolver {
        &self.resolver
    }

    /// Handle for reporting content teardown from any thread
    pub fn boundary(&self) -> BoundaryHandle {
        self.dispatcher.boundary()
    }

    pub fn latency_stats(&self) -> &LatencyStats {
        self.dispatcher.latency_stats()
    }

    pub fn is_content_stalled(&self) -> bool {
        self.dispatcher.is_stalled()
    }

    /// Apply reloaded settings. Queue depth only affects new routers.
    pub fn apply_settings(&mut self, settings: &DndSettings) {
        self.gesture.set_threshold(settings.drag_threshold_px);
        self.dispatcher.set_ack_timeout(settings.ack_timeout());
        self.transformer.set_history_capacity(settings.transform_history);
        self.max_remap_attempts = settings.max_remap_attempts;
        info!(
            threshold = settings.drag_threshold_px,
            ack_timeout_ms = settings.ack_timeout_ms,
            history = settings.transform_history,
            "Drag settings applied"
        );
    }

    // ========================================================================
    // Entry points
    // ========================================================================

    /// Route one host lifecycle notification.
    pub fn handle(&mut self, event: LifecycleEvent) -> RouteOutcome {
        profile_scope!("route_lifecycle");
        if let Some(outcome) = self.check_teardown() {
            return outcome;
        }

        let LifecycleEvent {
            kind,
            position,
            payload,
            source,
        } = event;
        if kind.requires_position() && position.is_none() {
            let error = DndError::MissingCoordinates { kind };
            warn!("Dropping notification: {error}");
            return RouteOutcome::Rejected(error);
        }

        match kind {
            LifecycleKind::Started => self.start_session(source, position, payload.as_ref(), None),
            _ => self.advance(kind, position, payload.as_ref()),
        }
    }

    /// Route raw pointer input; a press dragged past the threshold starts a
    /// local session.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> RouteOutcome {
        if let Some(outcome) = self.check_teardown() {
            return outcome;
        }

        match event {
            PointerEvent::Down(at) => {
                let source_node = if self.machine.is_active() {
                    None
                } else {
                    let (_, hit) = self.locate(at, |resolver, mapped| {
                        mapped.content.and_then(|p| resolver.resolve_draggable(p))
                    });
                    hit.map(|target| target.node)
                };
                self.gesture.pointer_down(at, source_node);
                RouteOutcome::Ignored
            }
            PointerEvent::Move(at) => match self.gesture.pointer_move(at) {
                Some(start) => self.start_session(DragSource::Local, Some(start.position), None, Some(start.source_node)),
                None => RouteOutcome::Ignored,
            },
            PointerEvent::Up(_) => {
                self.gesture.pointer_up();
                RouteOutcome::Ignored
            }
        }
    }

    /// Embedder abort: cancel the session with a synthetic `dragend`.
    pub fn abort(&mut self) -> RouteOutcome {
        if let Some(outcome) = self.check_teardown() {
            return outcome;
        }
        if !self.machine.is_active() {
            return RouteOutcome::Ignored;
        }
        info!("Drag aborted by embedder");
        let dragend = self.cancel_with_dragend(CancelReason::Aborted);
        RouteOutcome::Cancelled {
            reason: CancelReason::Aborted,
            error: None,
            dragend,
        }
    }

    /// Synchronous teardown from the input thread itself.
    pub fn on_content_teardown(&mut self) -> RouteOutcome {
        self.dispatcher.boundary().tear_down();
        self.check_teardown().unwrap_or(RouteOutcome::Ignored)
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    fn check_teardown(&mut self) -> Option<RouteOutcome> {
        if !self.dispatcher.take_teardown() {
            return None;
        }
        self.gesture.pointer_up();
        let session = self.machine.cancel(CancelReason::ContentTeardown)?;
        warn!(session = %session.id, phase = ?session.phase, "Content torn down, session cancelled");
        Some(RouteOutcome::Cancelled {
            reason: CancelReason::ContentTeardown,
            error: Some(DndError::BoundaryTeardown),
            dragend: false,
        })
    }

    fn start_session(
        &mut self,
        source: DragSource,
        position: Option<HostPoint>,
        payload: Option<&NativePayload>,
        source_node: Option<NodeId>,
    ) -> RouteOutcome {
        let data = match DataPayloadAdapter::convert(payload) {
            Ok(data) => data,
            Err(e) => {
                debug!(?source, "No payload at start ({e}), waiting for drop");
                DataPayload::empty()
            }
        };
        let mut session = DragSession::new(source, data).with_source_node(source_node);
        session.last_host = position;

        if let Err(error) = self.machine.begin(session).map(|_| ()) {
            let dragend = self.cancel_with_dragend(CancelReason::Superseded);
            return RouteOutcome::Cancelled {
                reason: CancelReason::Superseded,
                error: Some(error),
                dragend,
            };
        }

        let (mapped, target) = match position {
            Some(host) => {
                let (mapped, target) = self.locate(host, |resolver, mapped| match source_node {
                    Some(node) => resolver.target_for(node),
                    None => mapped.content.and_then(|p| resolver.resolve_draggable(p)),
                });
                (Some(mapped), target)
            }
            None => (None, source_node.and_then(|node| self.resolver.target_for(node))),
        };
        self.emit(DragEventType::DragStart, mapped, target)
    }

    fn advance(&mut self, kind: LifecycleKind, position: Option<HostPoint>, payload: Option<&NativePayload>) -> RouteOutcome {
        let transition = match self.machine.apply(kind, position) {
            Ok(transition) => transition,
            Err(error) => return self.reject(kind, error),
        };

        match (transition.from, kind) {
            (DragPhase::Started, LifecycleKind::Location) => {
                trace!("Location before Entered, buffered");
                RouteOutcome::Buffered
            }
            (_, LifecycleKind::Entered | LifecycleKind::Location) => {
                self.over_target(DragEventType::for_lifecycle(kind), kind)
            }
            (_, LifecycleKind::Exited) => self.leave(),
            (_, LifecycleKind::Drop) => self.drop_on_target(payload),
            (_, LifecycleKind::Ended) => self.finish(transition.finished),
            (from, LifecycleKind::Started) => RouteOutcome::Rejected(DndError::OutOfOrderTransition { from, input: kind }),
        }
    }

    fn reject(&mut self, kind: LifecycleKind, error: DndError) -> RouteOutcome {
        if !self.machine.is_active() {
            warn!(?kind, "Notification without an active session: {error}");
            return RouteOutcome::Rejected(error);
        }
        warn!(?kind, phase = ?self.machine.phase(), "Cancelling session: {error}");
        let dragend = self.cancel_with_dragend(CancelReason::OutOfOrder);
        RouteOutcome::Cancelled {
            reason: CancelReason::OutOfOrder,
            error: Some(error),
            dragend,
        }
    }

    /// `dragenter`, `dragover` and `dragleave` at the session's last position.
    fn over_target(&mut self, event_type: DragEventType, kind: LifecycleKind) -> RouteOutcome {
        let Some(host) = self.machine.session().and_then(|s| s.last_host) else {
            debug!(%event_type, "No position yet, suppressed");
            return RouteOutcome::Suppressed {
                event: event_type,
                reason: DndError::MissingCoordinates { kind },
            };
        };

        let (mapped, target) = self.locate(host, |resolver, mapped| resolver.resolve_mapped(mapped));
        match target {
            Ok(target) => self.emit(event_type, Some(mapped), Some(target)),
            Err(reason) => {
                self.record_position(&mapped);
                trace!(%event_type, "{reason}, suppressed");
                RouteOutcome::Suppressed {
                    event: event_type,
                    reason,
                }
            }
        }
    }

    /// `dragleave` where the drag left the view. The position is forgotten
    /// so a later `Entered` needs fresh coordinates.
    fn leave(&mut self) -> RouteOutcome {
        let outcome = self.over_target(DragEventType::DragLeave, LifecycleKind::Exited);
        if let Some(session) = self.machine.session_mut() {
            session.last_host = None;
        }
        outcome
    }

    fn drop_on_target(&mut self, payload: Option<&NativePayload>) -> RouteOutcome {
        let Some(session) = self.machine.session_mut() else {
            return RouteOutcome::Ignored;
        };
        if let Some(native) = payload {
            match DataPayloadAdapter::convert(Some(native)) {
                Ok(data) => session.attach_payload(data),
                Err(e) => warn!(session = %session.id, "Unusable drop payload: {e}"),
            }
        }
        if session.payload.is_empty() {
            let error = DndError::PayloadUnavailable {
                reason: "host supplied no payload".to_string(),
            };
            warn!(session = %session.id, "{error}, delivering an empty payload");
        }

        let Some(host) = session.last_host else {
            session.drop_cancelled = true;
            return RouteOutcome::Suppressed {
                event: DragEventType::Drop,
                reason: DndError::MissingCoordinates {
                    kind: LifecycleKind::Drop,
                },
            };
        };

        let (mapped, target) = self.locate(host, |resolver, mapped| resolver.resolve_mapped(mapped));
        match target {
            Ok(target) => {
                let outcome = self.emit(DragEventType::Drop, Some(mapped), Some(target));
                if let (RouteOutcome::Dispatched { .. }, Some(session)) = (&outcome, self.machine.session_mut()) {
                    session.drop_delivered = true;
                }
                outcome
            }
            Err(reason) => {
                self.record_position(&mapped);
                if let Some(session) = self.machine.session_mut() {
                    session.drop_cancelled = true;
                    debug!(session = %session.id, "Drop over no target, drop cancelled");
                }
                RouteOutcome::Suppressed {
                    event: DragEventType::Drop,
                    reason,
                }
            }
        }
    }

    fn finish(&mut self, finished: Option<DragSession>) -> RouteOutcome {
        let Some(session) = finished else {
            return RouteOutcome::Ignored;
        };
        debug!(
            session = %session.id,
            dropped = session.drop_delivered,
            elapsed_ms = session.started_at.elapsed().as_millis() as u64,
            "Drag session ended"
        );
        let result = self.send_dragend(&session);
        self.settle(DragEventType::DragEnd, result)
    }

    /// Cancel the active session and tell content. Returns whether the
    /// `dragend` was delivered.
    fn cancel_with_dragend(&mut self, reason: CancelReason) -> bool {
        let Some(session) = self.machine.cancel(reason) else {
            return false;
        };
        match self.send_dragend(&session) {
            Ok(_) => true,
            Err(e) => {
                self.dispatcher.take_teardown();
                warn!(session = %session.id, ?reason, "Synthetic dragend not delivered: {e}");
                false
            }
        }
    }

    // ========================================================================
    // Mapping and delivery
    // ========================================================================

    /// Map `host` against the latest transform and resolve it, remapping if
    /// the transform moves in the meantime.
    fn locate<R>(&self, host: HostPoint, resolve: impl Fn(&HitTestResolver, &MappedPoint) -> R) -> (MappedPoint, R) {
        let mut mapped = self.transformer.map_to_content_space(host);
        let mut resolved = resolve(&self.resolver, &mapped);

        for attempt in 1..=self.max_remap_attempts {
            match self.transformer.ensure_current(mapped.generation) {
                Ok(()) => return (mapped, resolved),
                Err(e) => {
                    debug!(attempt, "Remapping: {e}");
                    mapped = self.transformer.map_to_content_space(host);
                    resolved = resolve(&self.resolver, &mapped);
                }
            }
        }

        if let Err(e) = self.transformer.ensure_current(mapped.generation) {
            warn!(attempts = self.max_remap_attempts, "Transform still moving, using {}: {e}", mapped.generation);
        }
        (mapped, resolved)
    }

    fn record_position(&mut self, mapped: &MappedPoint) {
        if let Some(session) = self.machine.session_mut() {
            session.last_content = mapped.content;
            session.last_generation = Some(mapped.generation);
        }
    }

    /// Synthesize an event for the active session and deliver it.
    fn emit(&mut self, event_type: DragEventType, mapped: Option<MappedPoint>, target: Option<HitTestTarget>) -> RouteOutcome {
        if let Some(mapped) = &mapped {
            self.record_position(mapped);
        }
        let Some(session) = self.machine.session() else {
            return RouteOutcome::Ignored;
        };
        let event = DOMEventSynthesizer::synthesize(event_type, session, mapped.as_ref(), target);
        let result = self.dispatcher.dispatch(event);
        self.settle(event_type, result)
    }

    fn send_dragend(&mut self, session: &DragSession) -> DndResult<Delivery> {
        let mapped = session.last_host.map(|host| self.transformer.map_to_content_space(host));
        let target = session.source_node.and_then(|node| self.resolver.target_for(node));
        let event = DOMEventSynthesizer::synthesize(DragEventType::DragEnd, session, mapped.as_ref(), target);
        self.dispatcher.dispatch(event)
    }

    fn settle(&mut self, event_type: DragEventType, result: DndResult<Delivery>) -> RouteOutcome {
        match result {
            Ok(delivery) => RouteOutcome::Dispatched {
                event: event_type,
                delivery,
            },
            Err(error) => {
                self.dispatcher.take_teardown();
                self.gesture.pointer_up();
                if let Some(session) = self.machine.cancel(CancelReason::ContentTeardown) {
                    warn!(session = %session.id, %event_type, "Delivery failed, session cancelled: {error}");
                }
                RouteOutcome::Cancelled {
                    reason: CancelReason::ContentTeardown,
                    error: Some(error),
                    dragend: false,
                }
            }
        }
    }
}
