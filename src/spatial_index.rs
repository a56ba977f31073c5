//! Spatial Index Module
//!
//! R-tree over the content-space bounds of content nodes. Every drag
//! `Location` notification triggers a fresh hit test, so point queries stay
//! O(log n) and come back already in stacking order.
//!
//! Bounds are half-open like [`HostRect`](crate::input::coords::HostRect):
//! a node covers `[min, max)` on both axes, so two abutting nodes never both
//! claim their shared edge.

use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;

/// Paint stacking key. Higher compares as closer to the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Stacking {
    pub z_index: i32,
    pub paint_order: u64,
}

impl Stacking {
    pub fn new(z_index: i32, paint_order: u64) -> Self {
        Self { z_index, paint_order }
    }
}

/// One node's footprint in the index.
#[derive(Debug, Clone, Copy)]
struct Footprint {
    node_id: u64,
    stacking: Stacking,
    min: [f32; 2],
    max: [f32; 2],
}

impl Footprint {
    fn covers(&self, x: f32, y: f32) -> bool {
        x >= self.min[0] && x < self.max[0] && y >= self.min[1] && y < self.max[1]
    }
}

impl RTreeObject for Footprint {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl PartialEq for Footprint {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
    }
}

/// Stacking-aware spatial index keyed by node id.
#[derive(Default)]
pub struct SpatialIndex {
    tree: RTree<Footprint>,
    by_node: HashMap<u64, Footprint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, or replace its bounds and stacking.
    pub fn insert(&mut self, node_id: u64, stacking: Stacking, position: (f32, f32), size: (f32, f32)) {
        self.remove(node_id);
        let footprint = Footprint {
            node_id,
            stacking,
            min: [position.0, position.1],
            max: [position.0 + size.0, position.1 + size.1],
        };
        self.tree.insert(footprint);
        self.by_node.insert(node_id, footprint);
    }

    pub fn remove(&mut self, node_id: u64) -> bool {
        match self.by_node.remove(&node_id) {
            Some(footprint) => {
                self.tree.remove(&footprint);
                true
            }
            None => false,
        }
    }

    /// Nodes covering the point, topmost first.
    pub fn hits(&self, x: f32, y: f32) -> Vec<u64> {
        let mut hits: Vec<&Footprint> = self
            .tree
            .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
            .filter(|footprint| footprint.covers(x, y))
            .collect();
        hits.sort_unstable_by(|a, b| b.stacking.cmp(&a.stacking));
        hits.into_iter().map(|footprint| footprint.node_id).collect()
    }

    pub fn len(&self) -> usize {
        self.by_node.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_node.is_empty()
    }
}
