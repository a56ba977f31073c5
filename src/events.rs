//! Content-facing drag events.
//!
//! [`DOMEventSynthesizer`] turns session state plus a freshly mapped position
//! and hit-test result into a [`DragEvent`]. The payload is never copied into
//! an event: every event holds a shared reference and content reads formats
//! on demand through [`DataTransfer`], so high-frequency `dragover` events
//! cost nothing for payload.

use crate::hit_testing::HitTestTarget;
use crate::input::coords::{ContentPoint, HostPoint, MappedPoint, TransformGeneration};
use crate::input::lifecycle::{DragSource, LifecycleKind};
use crate::input::state::DragSession;
use crate::payload::DataPayload;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// DOM drag event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragEventType {
    DragStart,
    DragEnter,
    DragOver,
    DragLeave,
    Drop,
    DragEnd,
}

impl DragEventType {
    /// Event synthesized for a lifecycle notification
    pub fn for_lifecycle(kind: LifecycleKind) -> Self {
        match kind {
            LifecycleKind::Started => Self::DragStart,
            LifecycleKind::Entered => Self::DragEnter,
            LifecycleKind::Location => Self::DragOver,
            LifecycleKind::Drop => Self::Drop,
            LifecycleKind::Ended => Self::DragEnd,
            LifecycleKind::Exited => Self::DragLeave,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::DragStart => "dragstart",
            Self::DragEnter => "dragenter",
            Self::DragOver => "dragover",
            Self::DragLeave => "dragleave",
            Self::Drop => "drop",
            Self::DragEnd => "dragend",
        }
    }

    /// Access content gets to the drag data during this event
    pub fn data_mode(self) -> DataTransferMode {
        match self {
            Self::DragStart | Self::Drop => DataTransferMode::ReadOnly,
            _ => DataTransferMode::Protected,
        }
    }
}

impl fmt::Display for DragEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drag data store mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTransferMode {
    /// Formats and their data are readable
    ReadOnly,
    /// Formats are listed, data reads return empty
    Protected,
}

/// Outcome reported on `dragend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropEffect {
    #[default]
    None,
    Copy,
}

/// Lazy accessor over the session payload.
#[derive(Clone)]
pub struct DataTransfer {
    payload: Arc<DataPayload>,
    mode: DataTransferMode,
}

impl DataTransfer {
    pub fn new(payload: Arc<DataPayload>, mode: DataTransferMode) -> Self {
        Self { payload, mode }
    }

    /// `getData(format)`: empty when absent or when the store is protected.
    pub fn get_data(&self, format: &str) -> String {
        match self.mode {
            DataTransferMode::ReadOnly => self.payload.get_data(format),
            DataTransferMode::Protected => String::new(),
        }
    }

    /// `types`: available formats in host order
    pub fn types(&self) -> Vec<String> {
        self.payload.types().map(str::to_string).collect()
    }

    pub fn mode(&self) -> DataTransferMode {
        self.mode
    }

    /// Whether two transfers view the same payload allocation
    pub fn shares_payload_with(&self, other: &DataTransfer) -> bool {
        Arc::ptr_eq(&self.payload, &other.payload)
    }
}

impl fmt::Debug for DataTransfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTransfer")
            .field("mode", &self.mode)
            .field("types", &self.types())
            .finish()
    }
}

impl Serialize for DataTransfer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DataTransfer", 2)?;
        state.serialize_field("mode", &self.mode)?;
        state.serialize_field("types", &self.types())?;
        state.end()
    }
}

/// A synthesized drag event, as delivered to content.
#[derive(Debug, Clone, Serialize)]
pub struct DragEvent {
    #[serde(rename = "type")]
    pub event_type: DragEventType,
    pub session_id: Uuid,
    pub source: DragSource,
    /// Host-space position the event was derived from
    pub screen: Option<HostPoint>,
    /// Content-space position (`None` outside the viewport)
    pub client: Option<ContentPoint>,
    /// Transform generation `client` was computed against
    pub generation: Option<TransformGeneration>,
    pub target: Option<HitTestTarget>,
    pub drop_effect: DropEffect,
    pub data_transfer: DataTransfer,
}

/// Builds [`DragEvent`]s from session state.
pub struct DOMEventSynthesizer;

impl DOMEventSynthesizer {
    pub fn synthesize(
        event_type: DragEventType,
        session: &DragSession,
        mapped: Option<&MappedPoint>,
        target: Option<HitTestTarget>,
    ) -> DragEvent {
        let drop_effect = if event_type == DragEventType::DragEnd && session.drop_delivered {
            DropEffect::Copy
        } else {
            DropEffect::None
        };

        DragEvent {
            event_type,
            session_id: session.id,
            source: session.source,
            screen: mapped.map(|m| m.host),
            client: mapped.and_then(|m| m.content),
            generation: mapped.map(|m| m.generation),
            target,
            drop_effect,
            data_transfer: DataTransfer::new(Arc::clone(&session.payload), event_type.data_mode()),
        }
    }
}
