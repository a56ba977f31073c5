//! Host-to-content coordinate conversion under asynchronous pan/zoom.
//!
//! The pan/zoom transform is owned by the compositor side and may be
//! republished at any time from another thread. Each publication gets a new
//! [`TransformGeneration`]. Readers always take a whole snapshot under one
//! lock acquisition, so a mapping can never mix the scroll offset of one
//! generation with the scale of another.
//!
//! ```text
//! content = (host - clip.origin) / scale + scroll
//! ```

use crate::constants::{DEFAULT_TRANSFORM_HISTORY, MIN_SCALE};
use crate::error::{DndError, DndResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{trace, warn};

/// A point in host (device) space, as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HostPoint {
    pub x: f32,
    pub y: f32,
}

impl HostPoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another host point
    #[inline]
    pub fn distance_to(&self, other: HostPoint) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A point in content (document) space, after the transform is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentPoint {
    pub x: f32,
    pub y: f32,
}

impl ContentPoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in host space (the visible viewport / clip).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HostRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl HostRect {
    pub fn new(origin: (f32, f32), size: (f32, f32)) -> Self {
        Self {
            min_x: origin.0,
            min_y: origin.1,
            max_x: origin.0 + size.0,
            max_y: origin.1 + size.1,
        }
    }

    /// Viewport anchored at the host origin
    pub fn from_size(width: f32, height: f32) -> Self {
        Self::new((0.0, 0.0), (width, height))
    }

    /// Inclusive of the min edges, exclusive of the max edges
    #[inline]
    pub fn contains(&self, p: HostPoint) -> bool {
        p.x >= self.min_x && p.x < self.max_x && p.y >= self.min_y && p.y < self.max_y
    }
}

/// Opaque version number of a published transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TransformGeneration(u64);

impl TransformGeneration {
    #[inline]
    pub fn value(self) -> u64 {
        self.0
    }

    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TransformGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable pan/zoom/scroll state bound to one generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSnapshot {
    pub generation: TransformGeneration,
    /// Content-space scroll offset of the viewport's top-left corner
    pub scroll: (f32, f32),
    /// Zoom factor (2.0 = content drawn twice as large)
    pub scale: f32,
    /// Visible viewport in host space
    pub clip: HostRect,
}

impl TransformSnapshot {
    /// Map a host point, or `None` when it falls outside the visible viewport.
    ///
    /// Out-of-viewport points are never clamped onto the edge.
    pub fn map(&self, host: HostPoint) -> Option<ContentPoint> {
        if !self.clip.contains(host) {
            return None;
        }
        Some(ContentPoint::new(
            (host.x - self.clip.min_x) / self.scale + self.scroll.0,
            (host.y - self.clip.min_y) / self.scale + self.scroll.1,
        ))
    }
}

/// Parameters for the next published transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformUpdate {
    pub scroll: (f32, f32),
    pub scale: f32,
    pub clip: HostRect,
}

impl TransformUpdate {
    /// Identity transform over the given viewport
    pub fn new(clip: HostRect) -> Self {
        Self {
            scroll: (0.0, 0.0),
            scale: 1.0,
            clip,
        }
    }

    pub fn scrolled_to(mut self, x: f32, y: f32) -> Self {
        self.scroll = (x, y);
        self
    }

    pub fn zoomed(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// Result of mapping a host point: where it landed and against which transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedPoint {
    pub host: HostPoint,
    /// `None` is the "no target" sentinel for points outside the viewport
    pub content: Option<ContentPoint>,
    pub generation: TransformGeneration,
}

struct TransformHistory {
    snapshots: VecDeque<TransformSnapshot>,
    capacity: usize,
}

impl TransformHistory {
    fn latest(&self) -> TransformSnapshot {
        // Never empty: constructed with one snapshot and eviction keeps the newest.
        self.snapshots[self.snapshots.len() - 1]
    }

    fn evict(&mut self) {
        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
    }
}

/// Shared, thread-safe owner of the pan/zoom transform.
///
/// Cloning is cheap and yields a handle to the same transform; the compositor
/// publishes through one handle while the input thread maps through another.
#[derive(Clone)]
pub struct CoordinateTransformer {
    inner: Arc<RwLock<TransformHistory>>,
}

impl CoordinateTransformer {
    /// Create a transformer with an identity transform over `viewport`.
    pub fn new(viewport: HostRect) -> Self {
        Self::with_history(viewport, DEFAULT_TRANSFORM_HISTORY)
    }

    pub fn with_history(viewport: HostRect, capacity: usize) -> Self {
        let initial = TransformSnapshot {
            generation: TransformGeneration::default(),
            scroll: (0.0, 0.0),
            scale: 1.0,
            clip: viewport,
        };
        let mut snapshots = VecDeque::with_capacity(capacity.max(1));
        snapshots.push_back(initial);
        Self {
            inner: Arc::new(RwLock::new(TransformHistory {
                snapshots,
                capacity: capacity.max(1),
            })),
        }
    }

    /// Publish a new transform, returning its generation.
    pub fn publish(&self, update: TransformUpdate) -> TransformGeneration {
        let scale = if update.scale.is_finite() && update.scale >= MIN_SCALE {
            update.scale
        } else {
            warn!(scale = update.scale, "Rejecting degenerate scale, clamping");
            MIN_SCALE
        };

        let mut history = self.inner.write();
        let generation = history.latest().generation.next();
        history.snapshots.push_back(TransformSnapshot {
            generation,
            scroll: update.scroll,
            scale,
            clip: update.clip,
        });
        history.evict();
        trace!(%generation, scale, scroll = ?update.scroll, "Transform published");
        generation
    }

    /// Publish a transform derived from the current one.
    pub fn modify(&self, f: impl FnOnce(&mut TransformUpdate)) -> TransformGeneration {
        let current = self.snapshot();
        let mut update = TransformUpdate {
            scroll: current.scroll,
            scale: current.scale,
            clip: current.clip,
        };
        f(&mut update);
        self.publish(update)
    }

    /// Atomic copy of the latest transform
    pub fn snapshot(&self) -> TransformSnapshot {
        self.inner.read().latest()
    }

    pub fn current_generation(&self) -> TransformGeneration {
        self.inner.read().latest().generation
    }

    /// Map against the latest generation.
    pub fn map_to_content_space(&self, host: HostPoint) -> MappedPoint {
        let snapshot = self.snapshot();
        MappedPoint {
            host,
            content: snapshot.map(host),
            generation: snapshot.generation,
        }
    }

    /// Map against a specific retained generation.
    pub fn map_at(&self, host: HostPoint, generation: TransformGeneration) -> DndResult<MappedPoint> {
        let history = self.inner.read();
        let snapshot = history
            .snapshots
            .iter()
            .find(|s| s.generation == generation)
            .ok_or(DndError::UnknownGeneration(generation))?;
        Ok(MappedPoint {
            host,
            content: snapshot.map(host),
            generation,
        })
    }

    /// Fails with `StaleGeneration` when a newer transform has been published.
    pub fn ensure_current(&self, generation: TransformGeneration) -> DndResult<()> {
        let latest = self.current_generation();
        if generation < latest {
            Err(DndError::StaleGeneration {
                used: generation,
                latest,
            })
        } else {
            Ok(())
        }
    }

    /// Resize the retained history (settings reload).
    pub fn set_history_capacity(&self, capacity: usize) {
        let mut history = self.inner.write();
        history.capacity = capacity.max(1);
        history.evict();
    }

    pub fn retained_generations(&self) -> usize {
        self.inner.read().snapshots.len()
    }
}
