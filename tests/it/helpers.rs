//! Test helpers and fixtures for reducing boilerplate in tests.
//!
//! This module provides:
//! - `RecordingSink` - content side that records every delivered event
//! - `page_tree()` - a small document with a draggable header and a drop zone
//! - `TestRouterBuilder` - router wired to a recording sink
//! - Lifecycle sequences used by several tests

use apz_dnd::dispatch::{ContentGone, ContentSink};
use apz_dnd::events::{DragEvent, DragEventType};
use apz_dnd::hit_testing::{ContentNode, ContentTree, SharedContentTree};
use apz_dnd::input::coords::{CoordinateTransformer, HostRect};
use apz_dnd::input::lifecycle::{DragSource, LifecycleEvent, LifecycleKind};
use apz_dnd::input::GestureInputRouter;
use apz_dnd::payload::NativePayload;
use apz_dnd::settings::DndSettings;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const VIEWPORT_WIDTH: f32 = 300.0;
pub const VIEWPORT_HEIGHT: f32 = 600.0;

pub const BODY: u64 = 1;
pub const DRAG_SOURCE: u64 = 2;
pub const DROP_ZONE: u64 = 3;

// ============================================================================
// RecordingSink
// ============================================================================

/// Content side that records deliveries. Clones share the same log.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<DragEvent>>>,
    gone: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DragEvent> {
        self.events.lock().clone()
    }

    pub fn types(&self) -> Vec<DragEventType> {
        self.events.lock().iter().map(|e| e.event_type).collect()
    }

    pub fn count(&self, event_type: DragEventType) -> usize {
        self.events.lock().iter().filter(|e| e.event_type == event_type).count()
    }

    pub fn last(&self, event_type: DragEventType) -> Option<DragEvent> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|e| e.event_type == event_type)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Simulate the document disappearing: later deliveries fail.
    pub fn go_away(&self) {
        self.gone.store(true, Ordering::SeqCst);
    }
}

impl ContentSink for RecordingSink {
    fn deliver(&mut self, event: DragEvent) -> Result<(), ContentGone> {
        if self.gone.load(Ordering::SeqCst) {
            return Err(ContentGone);
        }
        self.events.lock().push(event);
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// body (0,0 300x600) with a draggable header (0,0 300x100) and a drop zone
/// (0,200 300x100).
pub fn page_tree() -> SharedContentTree {
    let mut tree = ContentTree::new();
    tree.insert(ContentNode::new(BODY, (0.0, 0.0), (VIEWPORT_WIDTH, VIEWPORT_HEIGHT)).named("body"));
    tree.insert(
        ContentNode::new(DRAG_SOURCE, (0.0, 0.0), (VIEWPORT_WIDTH, 100.0))
            .named("#drag")
            .child_of(BODY)
            .draggable(),
    );
    tree.insert(
        ContentNode::new(DROP_ZONE, (0.0, 200.0), (VIEWPORT_WIDTH, 100.0))
            .named("#drop")
            .child_of(BODY)
            .accepting_drops(),
    );
    tree.into_shared()
}

pub fn viewport() -> HostRect {
    HostRect::from_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
}

/// Builder for a router over `page_tree()` with a recording sink.
pub struct TestRouterBuilder {
    settings: DndSettings,
    tree: SharedContentTree,
    transformer: CoordinateTransformer,
}

impl Default for TestRouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRouterBuilder {
    pub fn new() -> Self {
        Self {
            settings: DndSettings::default(),
            tree: page_tree(),
            transformer: CoordinateTransformer::new(viewport()),
        }
    }

    pub fn with_settings(mut self, settings: DndSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_tree(mut self, tree: SharedContentTree) -> Self {
        self.tree = tree;
        self
    }

    pub fn with_transformer(mut self, transformer: CoordinateTransformer) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn build(self) -> (GestureInputRouter, RecordingSink) {
        apz_dnd::logging::init_for_tests();
        let sink = RecordingSink::new();
        let router = GestureInputRouter::with_settings(self.transformer, self.tree, sink.clone(), &self.settings)
            .expect("spawn content thread");
        (router, sink)
    }
}

pub fn router() -> (GestureInputRouter, RecordingSink) {
    TestRouterBuilder::new().build()
}

// ============================================================================
// Lifecycle sequences
// ============================================================================

pub fn foo_payload() -> NativePayload {
    NativePayload::plain_text("foo", "foo")
}

/// External drag of "foo" ending in a drop at host (100, 250). The host
/// only releases the payload at drop time.
pub fn external_drop_sequence() -> Vec<LifecycleEvent> {
    vec![
        LifecycleEvent::started(DragSource::External),
        LifecycleEvent::entered(),
        LifecycleEvent::location(100.0, 150.0),
        LifecycleEvent::location(100.0, 250.0),
        LifecycleEvent::drop_at(100.0, 250.0, Some(foo_payload())),
        LifecycleEvent::ended(),
    ]
}

/// `Drop` without coordinates of its own.
pub fn bare_drop(payload: Option<NativePayload>) -> LifecycleEvent {
    let builder = LifecycleEvent::builder(LifecycleKind::Drop);
    let builder = match payload {
        Some(payload) => builder.payload(payload),
        None => builder,
    };
    builder.build().expect("drop without coordinates is valid")
}
