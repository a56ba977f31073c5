//! Drag-and-drop translation between host drag input and web content that is
//! panned and zoomed off the main thread.

pub mod constants;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod hit_testing;
pub mod input;
pub mod logging;
pub mod payload;
pub mod perf;
pub mod settings;
pub mod settings_watcher;
pub mod spatial_index;

pub use dispatch::{BoundaryHandle, ContentGone, ContentSink, CrossBoundaryDispatcher, Delivery};
pub use error::{DndError, DndResult};
pub use events::{DOMEventSynthesizer, DataTransfer, DragEvent, DragEventType, DropEffect};
pub use hit_testing::{ContentNode, ContentTree, HitTestResolver, HitTestTarget, SharedContentTree};
pub use input::{GestureInputRouter, LifecycleEvent, RouteOutcome};
pub use payload::{DataPayload, DataPayloadAdapter, NativeClipItem, NativePayload};
pub use settings::DndSettings;
