//! Drag payload normalization.
//!
//! Hosts describe dragged content as a list of native clip items (plain text,
//! HTML, URIs, files, raw MIME data). [`DataPayloadAdapter`] converts them once
//! into a [`DataPayload`]: an ordered, case-insensitive mapping from format
//! string to content. After conversion the payload is immutable and shared by
//! reference between every event of the session.

use crate::constants::{FORMAT_TEXT_HTML, FORMAT_TEXT_PLAIN, FORMAT_URI_LIST};
use crate::error::{DndError, DndResult};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

// ============================================================================
// Host-native side
// ============================================================================

/// One representation offered by the host drag source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeClipItem {
    Text(String),
    Html { html: String, plain: Option<String> },
    Uri(String),
    File(PathBuf),
    Data { mime: String, bytes: Vec<u8> },
}

/// Opaque host payload handle, as attached to `Started` / `Drop`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativePayload {
    pub label: Option<String>,
    pub items: Vec<NativeClipItem>,
}

impl NativePayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single plain-text item with a user-visible label
    pub fn plain_text(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            items: vec![NativeClipItem::Text(text.into())],
        }
    }

    pub fn with_item(mut self, item: NativeClipItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ============================================================================
// Content side
// ============================================================================

/// Content stored under one format.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadBlob {
    Text(String),
    Bytes(Vec<u8>),
}

impl PayloadBlob {
    /// String view as exposed to content (`getData` semantics)
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Text(text) => text.len(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PayloadEntry {
    /// Format as first offered, used for `types`
    format: String,
    /// Lowercased format, used for lookups
    key: String,
    blob: PayloadBlob,
}

/// Ordered mapping from format identifier to content.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataPayload {
    entries: Vec<PayloadEntry>,
}

impl DataPayload {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Insert under `format` unless it is already present. Returns whether it was inserted.
    pub fn insert(&mut self, format: &str, blob: PayloadBlob) -> bool {
        let format = format.trim();
        let key = format.to_ascii_lowercase();
        if key.is_empty() || self.position(&key).is_some() {
            return false;
        }
        self.entries.push(PayloadEntry {
            format: format.to_string(),
            key,
            blob,
        });
        true
    }

    /// Append a line to `text/uri-list`, creating it on first use.
    fn append_uri(&mut self, uri: &str) {
        match self.position(FORMAT_URI_LIST) {
            Some(idx) => match &mut self.entries[idx].blob {
                PayloadBlob::Text(list) => {
                    list.push_str("\r\n");
                    list.push_str(uri);
                }
                // Host offered a raw uri-list first
                PayloadBlob::Bytes(list) => {
                    list.extend_from_slice(b"\r\n");
                    list.extend_from_slice(uri.as_bytes());
                }
            },
            None => {
                self.insert(FORMAT_URI_LIST, PayloadBlob::Text(uri.to_string()));
            }
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key == key)
    }

    /// Case-insensitive lookup
    pub fn get(&self, format: &str) -> Option<&PayloadBlob> {
        let key = format.trim().to_ascii_lowercase();
        self.position(&key).map(|idx| &self.entries[idx].blob)
    }

    /// `getData` semantics: empty string when the format is absent.
    pub fn get_data(&self, format: &str) -> String {
        self.get(format)
            .map(|blob| blob.as_text().into_owned())
            .unwrap_or_default()
    }

    pub fn contains(&self, format: &str) -> bool {
        self.get(format).is_some()
    }

    /// Available formats, in the order the host offered them
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.format.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Adapter
// ============================================================================

/// Converts host-native payloads into [`DataPayload`].
pub struct DataPayloadAdapter;

impl DataPayloadAdapter {
    /// Convert a host payload. A missing handle means the host withheld it.
    pub fn convert(native: Option<&NativePayload>) -> DndResult<DataPayload> {
        let native = native.ok_or_else(|| DndError::PayloadUnavailable {
            reason: "host withheld payload".to_string(),
        })?;

        let mut payload = DataPayload::empty();
        for item in &native.items {
            match item {
                NativeClipItem::Text(text) => {
                    payload.insert(FORMAT_TEXT_PLAIN, PayloadBlob::Text(text.clone()));
                }
                NativeClipItem::Html { html, plain } => {
                    payload.insert(FORMAT_TEXT_HTML, PayloadBlob::Text(html.clone()));
                    if let Some(plain) = plain {
                        payload.insert(FORMAT_TEXT_PLAIN, PayloadBlob::Text(plain.clone()));
                    }
                }
                NativeClipItem::Uri(uri) => payload.append_uri(uri.trim()),
                NativeClipItem::File(path) => payload.append_uri(&file_uri(path)),
                NativeClipItem::Data { mime, bytes } => {
                    if !payload.insert(mime, PayloadBlob::Bytes(bytes.clone())) {
                        debug!(format = %mime, "Duplicate payload format ignored");
                    }
                }
            }
        }

        debug!(
            label = native.label.as_deref().unwrap_or(""),
            formats = payload.len(),
            "Payload converted"
        );
        Ok(payload)
    }
}

/// `file://` URI for a local path, percent-encoding each segment.
pub fn file_uri(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let encoded: Vec<Cow<'_, str>> = raw
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            if i <= 1 && is_drive_letter(segment) {
                Cow::Borrowed(segment)
            } else {
                urlencoding::encode(segment)
            }
        })
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{joined}")
    } else {
        format!("file:///{joined}")
    }
}

fn is_drive_letter(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
