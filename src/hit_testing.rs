//! Hit testing against the content tree.
//!
//! The content tree is the narrow view of the document the drag pipeline
//! needs: node bounds in content space, stacking order, visibility and
//! whether a node accepts drops or can start a drag. Content may animate, so
//! the tree is shared behind a lock and every mutation bumps a revision.
//!
//! ## Resolution
//!
//! 1. Query the spatial index for nodes containing the point, topmost first
//!    by (z-index, paint order)
//! 2. Take the first that is effectively visible and hit-testable
//! 3. Walk from it towards the root for the first node that accepts drops

use crate::constants::HIT_TEST_WARN_MS;
use crate::error::{DndError, DndResult};
use crate::input::coords::{ContentPoint, MappedPoint};
use crate::perf::ScopedTimer;
use crate::profile_scope;
use crate::spatial_index::{SpatialIndex, Stacking};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

pub type NodeId = u64;

/// One node of the content tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    /// Selector-ish label for diagnostics ("#drop")
    pub name: String,
    pub position: (f32, f32),
    pub size: (f32, f32),
    pub z_index: i32,
    pub visible: bool,
    pub hit_testable: bool,
    pub accepts_drop: bool,
    pub draggable: bool,
    paint_order: u64,
}

impl ContentNode {
    pub fn new(id: NodeId, position: (f32, f32), size: (f32, f32)) -> Self {
        Self {
            id,
            parent: None,
            name: String::new(),
            position,
            size,
            z_index: 0,
            visible: true,
            hit_testable: true,
            accepts_drop: false,
            draggable: false,
            paint_order: 0,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn child_of(mut self, parent: NodeId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn accepting_drops(mut self) -> Self {
        self.accepts_drop = true;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn not_hit_testable(mut self) -> Self {
        self.hit_testable = false;
        self
    }

    fn stacking(&self) -> Stacking {
        Stacking::new(self.z_index, self.paint_order)
    }
}

/// The content-side document model used for hit testing.
#[derive(Default)]
pub struct ContentTree {
    nodes: HashMap<NodeId, ContentNode>,
    index: SpatialIndex,
    revision: u64,
    next_paint_order: u64,
}

/// Content tree shared between the content side and the input thread
pub type SharedContentTree = Arc<RwLock<ContentTree>>;

impl ContentTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedContentTree {
        Arc::new(RwLock::new(self))
    }

    /// Insert (or replace) a node. Later inserts paint above earlier ones.
    pub fn insert(&mut self, mut node: ContentNode) {
        node.paint_order = self.next_paint_order;
        self.next_paint_order += 1;
        self.index.insert(node.id, node.stacking(), node.position, node.size);
        self.nodes.insert(node.id, node);
        self.revision += 1;
    }

    /// Remove a node and its descendants. Returns the number removed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        if !self.nodes.contains_key(&id) {
            return 0;
        }
        let mut doomed = vec![id];
        let mut i = 0;
        while i < doomed.len() {
            let current = doomed[i];
            doomed.extend(
                self.nodes
                    .values()
                    .filter(|n| n.parent == Some(current))
                    .map(|n| n.id),
            );
            i += 1;
        }
        for id in &doomed {
            self.nodes.remove(id);
            self.index.remove(*id);
        }
        self.revision += 1;
        doomed.len()
    }

    /// Move or resize a node (layout change, animation step).
    pub fn set_bounds(&mut self, id: NodeId, position: (f32, f32), size: (f32, f32)) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.position = position;
        node.size = size;
        self.index.insert(id, node.stacking(), position, size);
        self.revision += 1;
        true
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.visible = visible;
        self.revision += 1;
        true
    }

    pub fn get(&self, id: NodeId) -> Option<&ContentNode> {
        self.nodes.get(&id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node followed by its ancestors, nearest first
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = &ContentNode> {
        let mut next = self.nodes.get(&id);
        // Bounded by node count so a malformed parent cycle cannot spin forever.
        let mut remaining = self.nodes.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let current = next?;
            next = current.parent.and_then(|p| self.nodes.get(&p));
            Some(current)
        })
    }

    fn effectively_visible(&self, id: NodeId) -> bool {
        self.ancestors_inclusive(id).all(|n| n.visible)
    }

    /// Topmost visible, hit-testable node under the point
    pub fn topmost_at(&self, point: ContentPoint) -> Option<&ContentNode> {
        self.index
            .hits(point.x, point.y)
            .into_iter()
            .filter_map(|id| self.nodes.get(&id))
            .find(|n| n.hit_testable && self.effectively_visible(n.id))
    }
}

/// A resolved drag target.
///
/// This is a reference into the content tree, not ownership: it is only
/// meaningful while `revision` matches the tree's current revision, i.e. for
/// the dispatch it was resolved for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitTestTarget {
    pub node: NodeId,
    pub name: String,
    pub revision: u64,
}

impl HitTestTarget {
    /// Whether the tree has not changed since resolution
    pub fn is_current(&self, tree: &ContentTree) -> bool {
        self.revision == tree.revision()
    }
}

/// Resolves content-space points to drag targets.
#[derive(Clone)]
pub struct HitTestResolver {
    tree: SharedContentTree,
}

impl HitTestResolver {
    pub fn new(tree: SharedContentTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &SharedContentTree {
        &self.tree
    }

    /// Deepest node at `point` that accepts drag input, if any.
    pub fn resolve(&self, point: ContentPoint) -> Option<HitTestTarget> {
        profile_scope!("hit_test");
        let _timer = ScopedTimer::new("hit_test", HIT_TEST_WARN_MS);

        let tree = self.tree.read();
        let topmost = tree.topmost_at(point)?;
        let target = tree.ancestors_inclusive(topmost.id).find(|n| n.accepts_drop);

        match target {
            Some(node) => {
                trace!(node = node.id, name = %node.name, x = point.x, y = point.y, "Hit test resolved");
                Some(HitTestTarget {
                    node: node.id,
                    name: node.name.clone(),
                    revision: tree.revision(),
                })
            }
            None => {
                trace!(topmost = topmost.id, "Topmost node has no drop-accepting ancestor");
                None
            }
        }
    }

    /// Resolve a mapped point, turning both the out-of-viewport sentinel and
    /// an empty hit into `HitTestMiss`.
    pub fn resolve_mapped(&self, mapped: &MappedPoint) -> DndResult<HitTestTarget> {
        let Some(point) = mapped.content else {
            debug!(x = mapped.host.x, y = mapped.host.y, "Point outside visible viewport");
            return Err(DndError::HitTestMiss {
                x: mapped.host.x,
                y: mapped.host.y,
            });
        };
        self.resolve(point).ok_or(DndError::HitTestMiss {
            x: point.x,
            y: point.y,
        })
    }

    /// Nearest draggable node (or ancestor) under the point.
    pub fn resolve_draggable(&self, point: ContentPoint) -> Option<HitTestTarget> {
        let tree = self.tree.read();
        let topmost = tree.topmost_at(point)?;
        let target = tree
            .ancestors_inclusive(topmost.id)
            .find(|n| n.draggable)
            .map(|node| HitTestTarget {
                node: node.id,
                name: node.name.clone(),
                revision: tree.revision(),
            });
        target
    }

    /// Target reference for a known node, if it still exists.
    pub fn target_for(&self, node: NodeId) -> Option<HitTestTarget> {
        let tree = self.tree.read();
        tree.get(node).map(|n| HitTestTarget {
            node: n.id,
            name: n.name.clone(),
            revision: tree.revision(),
        })
    }
}
