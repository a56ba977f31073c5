//! Host drag lifecycle notifications.
//!
//! Hosts hand us platform drag events; embedders and tests build them with
//! [`LifecycleEventBuilder`] (or the shorthand constructors) instead of
//! poking at platform objects.

use crate::error::{DndError, DndResult};
use crate::input::coords::HostPoint;
use crate::payload::NativePayload;
use serde::{Deserialize, Serialize};

/// Kind of host drag notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleKind {
    Started,
    Entered,
    Location,
    Drop,
    Ended,
    Exited,
}

impl LifecycleKind {
    /// Whether the notification is meaningless without coordinates
    pub fn requires_position(self) -> bool {
        matches!(self, Self::Location)
    }

    /// Whether the host may attach a payload to this notification
    pub fn carries_payload(self) -> bool {
        matches!(self, Self::Started | Self::Drop)
    }
}

/// Where the dragged data originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DragSource {
    /// Dragged out of this document (pointer gesture crossed the threshold)
    Local,
    /// Dragged in from another application
    #[default]
    External,
}

/// One host drag lifecycle notification.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleEvent {
    pub kind: LifecycleKind,
    /// Host-space coordinates, omitted where the host does not supply them
    pub position: Option<HostPoint>,
    /// Native payload, only honoured on `Started` and `Drop`
    pub payload: Option<NativePayload>,
    /// Origin of the drag, only meaningful on `Started`
    pub source: DragSource,
}

impl LifecycleEvent {
    pub fn builder(kind: LifecycleKind) -> LifecycleEventBuilder {
        LifecycleEventBuilder::new(kind)
    }

    pub fn started(source: DragSource) -> Self {
        Self::bare(LifecycleKind::Started).with_source(source)
    }

    pub fn entered() -> Self {
        Self::bare(LifecycleKind::Entered)
    }

    pub fn location(x: f32, y: f32) -> Self {
        Self::bare(LifecycleKind::Location).at(x, y)
    }

    pub fn drop_at(x: f32, y: f32, payload: Option<NativePayload>) -> Self {
        let mut event = Self::bare(LifecycleKind::Drop).at(x, y);
        event.payload = payload;
        event
    }

    pub fn ended() -> Self {
        Self::bare(LifecycleKind::Ended)
    }

    pub fn exited() -> Self {
        Self::bare(LifecycleKind::Exited)
    }

    fn bare(kind: LifecycleKind) -> Self {
        Self {
            kind,
            position: None,
            payload: None,
            source: DragSource::default(),
        }
    }

    fn at(mut self, x: f32, y: f32) -> Self {
        self.position = Some(HostPoint::new(x, y));
        self
    }

    fn with_source(mut self, source: DragSource) -> Self {
        self.source = source;
        self
    }
}

/// Builder for [`LifecycleEvent`].
///
/// # Example
/// ```ignore
/// let event = LifecycleEvent::builder(LifecycleKind::Drop)
///     .at(100.0, 250.0)
///     .payload(NativePayload::plain_text("label", "foo"))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct LifecycleEventBuilder {
    event: LifecycleEvent,
}

impl LifecycleEventBuilder {
    pub fn new(kind: LifecycleKind) -> Self {
        Self {
            event: LifecycleEvent::bare(kind),
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.event.position = Some(HostPoint::new(x, y));
        self
    }

    pub fn payload(mut self, payload: NativePayload) -> Self {
        self.event.payload = Some(payload);
        self
    }

    pub fn source(mut self, source: DragSource) -> Self {
        self.event.source = source;
        self
    }

    pub fn build(self) -> DndResult<LifecycleEvent> {
        let kind = self.event.kind;
        if kind.requires_position() && self.event.position.is_none() {
            return Err(DndError::MissingCoordinates { kind });
        }
        let mut event = self.event;
        if !kind.carries_payload() && event.payload.take().is_some() {
            tracing::debug!(?kind, "Discarding payload on a notification that cannot carry one");
        }
        Ok(event)
    }
}
