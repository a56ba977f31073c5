//! Cancellation: content teardown, embedder abort and stalled content.

use crate::helpers::*;
use apz_dnd::dispatch::{ContentGone, ContentSink, Delivery};
use apz_dnd::events::{DragEvent, DragEventType};
use apz_dnd::input::lifecycle::{DragSource, LifecycleEvent};
use apz_dnd::input::{CancelReason, DragPhase, GestureInputRouter, RouteOutcome};
use apz_dnd::settings::DndSettings;
use apz_dnd::DndError;
use std::sync::mpsc;
use std::thread;

fn assert_cancellation_invariants(sink: &RecordingSink) {
    let types = sink.types();
    assert!(sink.count(DragEventType::DragEnd) <= 1, "more than one dragend: {types:?}");
    if let Some(end) = types.iter().position(|t| *t == DragEventType::DragEnd) {
        assert_eq!(end, types.len() - 1, "events after dragend: {types:?}");
    }
}

#[test]
fn test_teardown_from_another_thread() {
    let (mut router, sink) = router();
    router.handle(LifecycleEvent::started(DragSource::External));
    router.handle(LifecycleEvent::entered());
    router.handle(LifecycleEvent::location(100.0, 250.0));

    let boundary = router.boundary();
    thread::spawn(move || boundary.tear_down()).join().unwrap();

    let outcome = router.handle(LifecycleEvent::location(100.0, 260.0));
    assert_eq!(
        outcome,
        RouteOutcome::Cancelled {
            reason: CancelReason::ContentTeardown,
            error: Some(DndError::BoundaryTeardown),
            dragend: false,
        }
    );
    assert_eq!(router.phase(), DragPhase::Idle);

    let delivered = sink.len();
    router.handle(LifecycleEvent::drop_at(100.0, 260.0, Some(foo_payload())));
    router.handle(LifecycleEvent::ended());
    assert_eq!(sink.len(), delivered);
    assert_eq!(sink.count(DragEventType::Drop), 0);
    assert_eq!(sink.count(DragEventType::DragEnd), 0);
}

#[test]
fn test_content_gone_during_delivery() {
    let (mut router, sink) = router();
    router.handle(LifecycleEvent::started(DragSource::External));
    router.handle(LifecycleEvent::entered());
    sink.go_away();

    let outcome = router.handle(LifecycleEvent::location(100.0, 250.0));
    assert!(matches!(
        outcome,
        RouteOutcome::Cancelled {
            reason: CancelReason::ContentTeardown,
            dragend: false,
            ..
        }
    ));
    assert!(matches!(
        router.handle(LifecycleEvent::drop_at(100.0, 250.0, None)),
        RouteOutcome::Rejected(_)
    ));
    assert_eq!(sink.types(), vec![DragEventType::DragStart]);
}

#[test]
fn test_teardown_at_every_point() {
    let sequence = external_drop_sequence();
    for cut in 0..=sequence.len() {
        let (mut router, sink) = router();
        for (i, event) in sequence.iter().cloned().enumerate() {
            if i == cut {
                router.on_content_teardown();
            }
            router.handle(event);
        }
        assert_cancellation_invariants(&sink);
        if (1..5).contains(&cut) {
            assert_eq!(sink.count(DragEventType::Drop), 0, "drop after teardown at {cut}");
        }
    }
}

#[test]
fn test_abort_at_every_point() {
    let sequence = external_drop_sequence();
    for cut in 0..=sequence.len() {
        let (mut router, sink) = router();
        for (i, event) in sequence.iter().cloned().enumerate() {
            if i == cut {
                router.abort();
            }
            router.handle(event);
        }
        assert_cancellation_invariants(&sink);
        if (1..5).contains(&cut) {
            assert_eq!(sink.count(DragEventType::DragEnd), 1, "abort at {cut}");
            assert_eq!(sink.count(DragEventType::Drop), 0);
        }
    }
}

#[test]
fn test_teardown_without_session_is_ignored() {
    let (mut router, sink) = router();
    assert_eq!(router.on_content_teardown(), RouteOutcome::Ignored);

    // The next document works normally.
    for event in external_drop_sequence() {
        router.handle(event);
    }
    assert_eq!(sink.count(DragEventType::Drop), 1);
}

/// Content that blocks on its first `dragover` until released.
struct StallingSink {
    inner: RecordingSink,
    release: mpsc::Receiver<()>,
    stalled_once: bool,
}

impl ContentSink for StallingSink {
    fn deliver(&mut self, event: DragEvent) -> Result<(), ContentGone> {
        if event.event_type == DragEventType::DragOver && !self.stalled_once {
            self.stalled_once = true;
            let _ = self.release.recv();
        }
        self.inner.deliver(event)
    }
}

fn stalling_router(ack_timeout_ms: u64) -> (GestureInputRouter, RecordingSink, mpsc::Sender<()>) {
    let (release_tx, release_rx) = mpsc::channel();
    let recording = RecordingSink::new();
    let sink = StallingSink {
        inner: recording.clone(),
        release: release_rx,
        stalled_once: false,
    };
    let settings = DndSettings {
        ack_timeout_ms,
        ..DndSettings::default()
    };
    let router =
        GestureInputRouter::with_settings(apz_dnd::input::CoordinateTransformer::new(viewport()), page_tree(), sink, &settings)
            .unwrap();
    (router, recording, release_tx)
}

#[test]
fn test_stalled_content_withholds_dragover_without_cancelling() {
    let (mut router, recording, release_tx) = stalling_router(100);

    router.handle(LifecycleEvent::started(DragSource::External));
    router.handle(LifecycleEvent::entered());
    assert_eq!(
        router.handle(LifecycleEvent::location(100.0, 250.0)),
        RouteOutcome::Dispatched {
            event: DragEventType::DragOver,
            delivery: Delivery::Pending
        }
    );
    assert!(router.is_content_stalled());

    for y in [255.0, 260.0, 265.0] {
        assert_eq!(
            router.handle(LifecycleEvent::location(100.0, y)),
            RouteOutcome::Dispatched {
                event: DragEventType::DragOver,
                delivery: Delivery::Withheld
            }
        );
    }
    assert_eq!(router.phase(), DragPhase::Location);

    release_tx.send(()).unwrap();
    router.apply_settings(&DndSettings::default());
    let outcome = router.handle(LifecycleEvent::drop_at(100.0, 265.0, Some(foo_payload())));
    assert_eq!(outcome.dispatched(), Some(DragEventType::Drop));
    router.handle(LifecycleEvent::ended());

    assert_eq!(
        recording.types(),
        vec![
            DragEventType::DragStart,
            DragEventType::DragOver,
            DragEventType::Drop,
            DragEventType::DragEnd
        ]
    );
    assert_eq!(router.latency_stats().count(), 4);
}

#[test]
fn test_teardown_behind_stall_leaves_next_drag_intact() {
    let (mut router, recording, release_tx) = stalling_router(50);

    router.handle(LifecycleEvent::started(DragSource::External));
    router.handle(LifecycleEvent::entered());
    assert_eq!(
        router.handle(LifecycleEvent::location(100.0, 250.0)),
        RouteOutcome::Dispatched {
            event: DragEventType::DragOver,
            delivery: Delivery::Pending
        }
    );
    // Queued behind the stalled dragover.
    assert_eq!(
        router.handle(LifecycleEvent::drop_at(100.0, 250.0, Some(foo_payload()))),
        RouteOutcome::Dispatched {
            event: DragEventType::Drop,
            delivery: Delivery::Pending
        }
    );
    assert!(matches!(
        router.on_content_teardown(),
        RouteOutcome::Cancelled {
            reason: CancelReason::ContentTeardown,
            dragend: false,
            ..
        }
    ));

    release_tx.send(()).unwrap();
    thread::sleep(std::time::Duration::from_millis(200));
    router.apply_settings(&DndSettings::default());

    assert_eq!(
        router.handle(LifecycleEvent::started(DragSource::External)),
        RouteOutcome::Dispatched {
            event: DragEventType::DragStart,
            delivery: Delivery::Delivered
        }
    );
    for event in external_drop_sequence().into_iter().skip(1) {
        router.handle(event);
    }

    assert_eq!(
        recording.types(),
        vec![
            DragEventType::DragStart,
            DragEventType::DragOver,
            DragEventType::DragStart,
            DragEventType::DragOver,
            DragEventType::Drop,
            DragEventType::DragEnd
        ]
    );
    assert_eq!(recording.last(DragEventType::Drop).unwrap().data_transfer.get_data("text/plain"), "foo");
}
