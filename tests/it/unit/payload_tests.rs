//! Unit tests for payload normalization.

use apz_dnd::payload::{file_uri, DataPayloadAdapter, NativeClipItem, NativePayload};
use apz_dnd::DndError;
use std::path::Path;

#[test]
fn test_round_trips_plain_text() {
    let payload = DataPayloadAdapter::convert(Some(&NativePayload::plain_text("label", "foo"))).unwrap();
    assert_eq!(payload.get_data("text/plain"), "foo");
    assert_eq!(payload.get_data("text/plain"), payload.get_data("Text/Plain"));
    assert_eq!(payload.get_data("application/json"), "");
}

#[test]
fn test_withheld_payload() {
    assert!(matches!(
        DataPayloadAdapter::convert(None),
        Err(DndError::PayloadUnavailable { .. })
    ));
}

#[test]
fn test_first_format_wins() {
    let native = NativePayload::new()
        .with_item(NativeClipItem::Text("first".to_string()))
        .with_item(NativeClipItem::Text("second".to_string()))
        .with_item(NativeClipItem::Data {
            mime: "application/x-custom".to_string(),
            bytes: b"raw".to_vec(),
        });
    let payload = DataPayloadAdapter::convert(Some(&native)).unwrap();
    assert_eq!(payload.get_data("text/plain"), "first");
    assert_eq!(payload.get_data("application/x-custom"), "raw");
    assert_eq!(payload.types().collect::<Vec<_>>(), vec!["text/plain", "application/x-custom"]);
}

#[test]
fn test_file_uri_encoding() {
    assert_eq!(file_uri(Path::new("/home/me/a b#c.txt")), "file:///home/me/a%20b%23c.txt");
}
