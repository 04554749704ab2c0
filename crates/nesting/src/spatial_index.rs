//! Occupancy index over placed footprints using an R*-tree.
//!
//! Provides the broad phase of the placement validity check: the tree answers
//! which footprints have bounding boxes touching a query box, and the caller
//! runs the exact geometric test on those candidates only.

use crate::geometry::{Bounds, Geometry};
use crate::placement::PlacedPiece;
use rstar::{RTree, RTreeObject, AABB};
use std::sync::Arc;

/// Handle returned by [`OccupancyIndex::insert`].
pub type Handle = usize;

/// An entry in the R*-tree: a handle and its bounding box.
#[derive(Debug, Clone)]
pub struct OccupancyEntry {
    pub handle: Handle,
    pub bounds: Bounds,
}

impl RTreeObject for OccupancyEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_x, self.bounds.min_y],
            [self.bounds.max_x, self.bounds.max_y],
        )
    }
}

/// Forward-only spatial index of geometries (insert and query, no removal).
#[derive(Debug, Default)]
pub struct OccupancyIndex {
    tree: RTree<OccupancyEntry>,
    geometries: Vec<Arc<Geometry>>,
}

impl OccupancyIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bulk-loads an index; handles follow iteration order.
    pub fn from_geometries(geometries: impl IntoIterator<Item = Arc<Geometry>>) -> Self {
        let geometries: Vec<Arc<Geometry>> = geometries.into_iter().collect();
        let entries = geometries
            .iter()
            .enumerate()
            .map(|(handle, g)| OccupancyEntry {
                handle,
                bounds: g.bounds(),
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            geometries,
        }
    }

    /// Index over the footprints of an existing solution; handles are
    /// positions in `pieces`.
    pub fn from_solution(pieces: &[PlacedPiece]) -> Self {
        Self::from_geometries(pieces.iter().map(|p| Arc::clone(p.footprint())))
    }

    /// Inserts a geometry and returns its handle.
    pub fn insert(&mut self, geometry: Arc<Geometry>) -> Handle {
        let handle = self.geometries.len();
        self.tree.insert(OccupancyEntry {
            handle,
            bounds: geometry.bounds(),
        });
        self.geometries.push(geometry);
        handle
    }

    /// Handles whose bounding boxes intersect `bounds` (closed boxes, so
    /// touching boxes are included).
    pub fn query_intersecting_candidates(&self, bounds: &Bounds) -> Vec<Handle> {
        let envelope = AABB::from_corners([bounds.min_x, bounds.min_y], [bounds.max_x, bounds.max_y]);
        let mut handles: Vec<Handle> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.handle)
            .collect();
        // Tree order depends on insertion history; callers want a stable order
        handles.sort_unstable();
        handles
    }

    /// The geometry stored under `handle`.
    pub fn geometry(&self, handle: Handle) -> Option<&Geometry> {
        self.geometries.get(handle).map(|g| g.as_ref())
    }

    /// All stored geometries in insertion order.
    pub fn geometries(&self) -> impl Iterator<Item = &Arc<Geometry>> {
        self.geometries.iter()
    }

    /// Returns the number of entries in the index.
    pub fn len(&self) -> usize {
        self.geometries.len()
    }

    /// Returns true if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.geometries.is_empty()
    }
}
