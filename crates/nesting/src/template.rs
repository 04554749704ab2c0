//! Piece templates: one per required instance of a piece shape.
//!
//! A template owns the admissible rotation angles of its shape and memoizes
//! rotated and buffer-expanded geometries. The caches sit behind `RwLock`s so
//! the same templates can be shared by every individual of a run, including
//! from the evaluation workers.

use crate::geometry::{
    buffer, is_approx_rectangle, open_ring, polygon_from_coords, rotate, Geometry,
    RECTANGLE_ANGLE_TOLERANCE,
};
use geo::{Area, Polygon};
use lamina_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Angles tried for approximately rectangular shapes.
pub const RIGHT_ANGLES: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// Angles tried for every other shape.
pub const OCTANT_ANGLES: [f64; 8] = [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0];

/// Hex digits of the shape hash used as template id prefix.
const ID_PREFIX_LEN: usize = 6;

/// Upper bound on the number of piece instances in one run.
pub const MAX_TOTAL_PIECES: usize = 10_000;

/// Resolution of cache keys.
const CACHE_QUANTUM: f64 = 1e-6;

/// A piece shape and how many copies are required.
#[derive(Debug, Clone)]
pub struct PieceSpec {
    pub shape: Arc<Polygon<f64>>,
    pub quantity: usize,
}

impl PieceSpec {
    /// Creates a spec from outline vertices.
    pub fn new(vertices: &[(f64, f64)], quantity: usize) -> Self {
        Self::from_polygon(polygon_from_coords(vertices), quantity)
    }

    pub fn from_polygon(shape: Polygon<f64>, quantity: usize) -> Self {
        Self {
            shape: Arc::new(shape),
            quantity,
        }
    }
}

/// Total number of instances requested by `specs`.
///
/// Fails with [`Error::InvalidRequest`] when the total exceeds
/// [`MAX_TOTAL_PIECES`].
pub fn total_quantity(specs: &[PieceSpec]) -> Result<usize> {
    specs
        .iter()
        .try_fold(0usize, |total, spec| total.checked_add(spec.quantity))
        .filter(|&total| total <= MAX_TOTAL_PIECES)
        .ok_or_else(|| {
            Error::InvalidRequest(format!(
                "total quantity exceeds the limit of {MAX_TOTAL_PIECES} pieces"
            ))
        })
}

fn quantize(value: f64) -> i64 {
    (value / CACHE_QUANTUM).round() as i64
}

/// One required instance of a piece shape.
#[derive(Debug)]
pub struct PieceTemplate {
    id: String,
    shape: Arc<Polygon<f64>>,
    angles: Vec<f64>,
    area: f64,
    rotated: RwLock<HashMap<i64, Arc<Polygon<f64>>>>,
    buffered: RwLock<HashMap<(i64, i64), Arc<Geometry>>>,
}

impl PieceTemplate {
    /// Creates a template with an explicit id.
    pub fn new(id: impl Into<String>, shape: Arc<Polygon<f64>>) -> Self {
        let angles = if is_approx_rectangle(&shape, RECTANGLE_ANGLE_TOLERANCE) {
            RIGHT_ANGLES.to_vec()
        } else {
            OCTANT_ANGLES.to_vec()
        };
        let area = shape.unsigned_area();

        Self {
            id: id.into(),
            shape,
            angles,
            area,
            rotated: RwLock::new(HashMap::new()),
            buffered: RwLock::new(HashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The unrotated outline shared by every template of this shape.
    pub fn shape(&self) -> &Arc<Polygon<f64>> {
        &self.shape
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Angles (degrees) the placement search may use.
    pub fn possible_angles(&self) -> &[f64] {
        &self.angles
    }

    /// The shape rotated about its centroid, memoized per angle.
    pub fn rotated(&self, angle: f64) -> Arc<Polygon<f64>> {
        let key = quantize(angle);
        if let Some(hit) = self
            .rotated
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(hit);
        }

        let value = Arc::new(rotate(&self.shape, angle));
        let mut cache = self.rotated.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(value))
    }

    /// The rotated shape expanded by `distance`, memoized per (angle, distance).
    pub fn buffered(&self, angle: f64, distance: f64) -> Arc<Geometry> {
        let key = (quantize(angle), quantize(distance));
        if let Some(hit) = self
            .buffered
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(hit);
        }

        let rotated = self.rotated(angle);
        let value = Arc::new(buffer(&rotated, distance));
        let mut cache = self.buffered.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cache.entry(key).or_insert(value))
    }

    /// The buffered geometry moved by `offset`.
    pub fn footprint_at(&self, angle: f64, distance: f64, offset: (f64, f64)) -> Geometry {
        self.buffered(angle, distance).translated(offset.0, offset.1)
    }

    /// The rotated piece moved by `offset`.
    pub fn geometry_at(&self, angle: f64, offset: (f64, f64)) -> Geometry {
        Geometry::Polygon(self.rotated(angle).as_ref().clone()).translated(offset.0, offset.1)
    }
}

/// Short content hash of a shape's outline.
pub fn shape_hash(shape: &Polygon<f64>) -> String {
    let mut hasher = Sha256::new();
    for (x, y) in open_ring(shape.exterior()) {
        hasher.update(x.to_le_bytes());
        hasher.update(y.to_le_bytes());
    }
    let digest = hex::encode(hasher.finalize());
    digest[..ID_PREFIX_LEN].to_string()
}

/// Expands piece specs into one template per required instance.
///
/// Ids are `<hash>-<nn>`; the sequence continues across specs with identical
/// outlines so ids stay unique within a run. Callers bound the total with
/// [`total_quantity`] first.
pub fn build_templates(specs: &[PieceSpec]) -> Vec<Arc<PieceTemplate>> {
    let mut next_index: HashMap<String, usize> = HashMap::new();
    let capacity = specs
        .iter()
        .fold(0usize, |total, spec| total.saturating_add(spec.quantity));
    let mut templates = Vec::with_capacity(capacity.min(MAX_TOTAL_PIECES));

    for spec in specs {
        let prefix = shape_hash(&spec.shape);
        let counter = next_index.entry(prefix.clone()).or_insert(0);
        for _ in 0..spec.quantity {
            let id = format!("{}-{:02}", prefix, counter);
            *counter += 1;
            templates.push(Arc::new(PieceTemplate::new(id, Arc::clone(&spec.shape))));
        }
    }

    templates
}
