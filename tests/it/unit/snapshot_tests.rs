//! Snapshot tests using the insta crate.
//!
//! Synthesized events are what content sees, so their serialized shape is
//! pinned here. Session ids are random and redacted.
//!
//! To update snapshots after intentional changes:
//! ```sh
//! cargo insta test --accept
//! ```

use crate::helpers::*;
use apz_dnd::events::DragEventType;
use apz_dnd::input::lifecycle::{DragSource, LifecycleEvent};

fn run_drop_at_fractional_point() -> RecordingSink {
    let (mut router, sink) = router();
    router.handle(LifecycleEvent::started(DragSource::External));
    router.handle(LifecycleEvent::entered());
    router.handle(LifecycleEvent::location(100.5, 250.5));
    router.handle(LifecycleEvent::drop_at(100.5, 250.5, Some(foo_payload())));
    router.handle(LifecycleEvent::ended());
    sink
}

#[test]
fn snapshot_drop_event() {
    let sink = run_drop_at_fractional_point();
    let drop = sink.last(DragEventType::Drop).unwrap();
    insta::assert_json_snapshot!(drop, { ".session_id" => "[session_id]" }, @r###"
    {
      "type": "drop",
      "session_id": "[session_id]",
      "source": "External",
      "screen": {
        "x": 100.5,
        "y": 250.5
      },
      "client": {
        "x": 100.5,
        "y": 250.5
      },
      "generation": 0,
      "target": {
        "node": 3,
        "name": "#drop",
        "revision": 3
      },
      "drop_effect": "none",
      "data_transfer": {
        "mode": "read_only",
        "types": [
          "text/plain"
        ]
      }
    }
    "###);
}

#[test]
fn snapshot_dragend_event() {
    let sink = run_drop_at_fractional_point();
    let end = sink.last(DragEventType::DragEnd).unwrap();
    insta::assert_json_snapshot!(end, { ".session_id" => "[session_id]" }, @r###"
    {
      "type": "dragend",
      "session_id": "[session_id]",
      "source": "External",
      "screen": {
        "x": 100.5,
        "y": 250.5
      },
      "client": {
        "x": 100.5,
        "y": 250.5
      },
      "generation": 0,
      "target": null,
      "drop_effect": "copy",
      "data_transfer": {
        "mode": "protected",
        "types": [
          "text/plain"
        ]
      }
    }
    "###);
}
