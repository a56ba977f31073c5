//! Unit tests for lifecycle notification construction.

use apz_dnd::input::coords::HostPoint;
use apz_dnd::input::lifecycle::{DragSource, LifecycleEvent, LifecycleKind};
use apz_dnd::payload::NativePayload;
use apz_dnd::DndError;

#[test]
fn test_builder_location_requires_coordinates() {
    let err = LifecycleEvent::builder(LifecycleKind::Location).build().unwrap_err();
    assert_eq!(err, DndError::MissingCoordinates { kind: LifecycleKind::Location });

    let event = LifecycleEvent::builder(LifecycleKind::Location).at(1.0, 2.0).build().unwrap();
    assert_eq!(event.position, Some(HostPoint::new(1.0, 2.0)));
}

#[test]
fn test_builder_discards_payload_on_non_carrying_kinds() {
    let event = LifecycleEvent::builder(LifecycleKind::Location)
        .at(1.0, 2.0)
        .payload(NativePayload::plain_text("foo", "foo"))
        .build()
        .unwrap();
    assert!(event.payload.is_none());
}

#[test]
fn test_shorthand_constructors() {
    assert_eq!(LifecycleEvent::started(DragSource::Local).source, DragSource::Local);
    assert_eq!(LifecycleEvent::entered().position, None);
    assert_eq!(LifecycleEvent::ended().kind, LifecycleKind::Ended);
    let drop = LifecycleEvent::drop_at(100.0, 250.0, Some(NativePayload::plain_text("foo", "foo")));
    assert_eq!(drop.position, Some(HostPoint::new(100.0, 250.0)));
    assert!(drop.payload.is_some());
}
