//! 2D geometry types and utilities.
//!
//! Pieces and footprints are `geo` polygons wrapped in the [`Geometry`] sum
//! type: buffering a polygon can in principle yield several parts, so every
//! consumer matches on both variants explicitly.

use geo::{
    Area, BooleanOps, Centroid, Coord, Intersects, LineString, MapCoords, MultiPolygon, Polygon,
    Relate, Translate,
};
use i_overlay::core::fill_rule::FillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use lamina_core::robust::signed_area;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Segments used to approximate a quarter circle when buffering.
pub const QUADRANT_SEGMENTS: usize = 8;

/// Default angular tolerance (degrees) for [`is_approx_rectangle`].
pub const RECTANGLE_ANGLE_TOLERANCE: f64 = 0.5;

/// Default margin for [`bounds_intersect`].
pub const BOUNDS_MARGIN: f64 = 1e-9;

/// Slack allowed when comparing bounding boxes against the lamina.
pub const BOUNDS_TOLERANCE: f64 = 1e-6;

/// Overlap (or overhang) allowed, as a fraction of the smaller area.
pub const RELATIVE_AREA_TOLERANCE: f64 = 1e-6;

/// Distance below which two edges are considered to lie on the same line.
const COLLINEAR_TOLERANCE: f64 = 1e-7;

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Creates bounds from its corners.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// An empty box that any union will replace.
    pub fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    /// Bounds of a set of coordinates.
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord<f64>>) -> Self {
        coords.into_iter().fold(Self::empty(), |b, c| {
            Self::new(
                b.min_x.min(c.x),
                b.min_y.min(c.y),
                b.max_x.max(c.x),
                b.max_y.max(c.y),
            )
        })
    }

    /// Returns true if no point has been added.
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Lower-left corner.
    pub fn lower_left(&self) -> (f64, f64) {
        (self.min_x, self.min_y)
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Returns true if `other` lies inside this box, allowing `margin` of slack.
    pub fn contains(&self, other: &Bounds, margin: f64) -> bool {
        other.min_x >= self.min_x - margin
            && other.min_y >= self.min_y - margin
            && other.max_x <= self.max_x + margin
            && other.max_y <= self.max_y + margin
    }

    /// Box shifted by an offset.
    pub fn translated(&self, dx: f64, dy: f64) -> Bounds {
        Bounds::new(self.min_x + dx, self.min_y + dy, self.max_x + dx, self.max_y + dy)
    }
}

/// A placed or buffered shape: either a single polygon or several parts.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon<f64>),
    MultiPolygon(MultiPolygon<f64>),
}

impl Geometry {
    /// Name of the variant as used in serialized output.
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Unsigned area.
    pub fn area(&self) -> f64 {
        match self {
            Geometry::Polygon(p) => p.unsigned_area(),
            Geometry::MultiPolygon(mp) => mp.unsigned_area(),
        }
    }

    /// Axis-aligned bounding box of the exterior rings.
    pub fn bounds(&self) -> Bounds {
        match self {
            Geometry::Polygon(p) => Bounds::from_coords(p.exterior().0.iter()),
            Geometry::MultiPolygon(mp) => mp
                .0
                .iter()
                .map(|p| Bounds::from_coords(p.exterior().0.iter()))
                .fold(Bounds::empty(), |acc, b| acc.union(&b)),
        }
    }

    /// Geometry moved by an offset.
    pub fn translated(&self, dx: f64, dy: f64) -> Geometry {
        match self {
            Geometry::Polygon(p) => Geometry::Polygon(p.translate(dx, dy)),
            Geometry::MultiPolygon(mp) => Geometry::MultiPolygon(mp.translate(dx, dy)),
        }
    }

    /// The individual polygons.
    pub fn polygons(&self) -> Vec<&Polygon<f64>> {
        match self {
            Geometry::Polygon(p) => vec![p],
            Geometry::MultiPolygon(mp) => mp.0.iter().collect(),
        }
    }

    /// Copy as a multi-polygon (for boolean operations).
    pub fn to_multi_polygon(&self) -> MultiPolygon<f64> {
        match self {
            Geometry::Polygon(p) => MultiPolygon::new(vec![p.clone()]),
            Geometry::MultiPolygon(mp) => mp.clone(),
        }
    }

    /// Vertices of every exterior ring, closing vertex excluded.
    pub fn exterior_vertices(&self) -> Vec<(f64, f64)> {
        self.polygons()
            .into_iter()
            .flat_map(|p| open_ring(p.exterior()))
            .collect()
    }

    /// Exterior rings as closed coordinate lists.
    pub fn exterior_rings(&self) -> Vec<Vec<[f64; 2]>> {
        self.polygons()
            .into_iter()
            .map(|p| p.exterior().0.iter().map(|c| [c.x, c.y]).collect())
            .collect()
    }

    /// Returns true if the geometries share at least one point (touching included).
    pub fn intersects(&self, other: &Geometry) -> bool {
        match (self, other) {
            (Geometry::Polygon(a), Geometry::Polygon(b)) => a.intersects(b),
            (Geometry::Polygon(a), Geometry::MultiPolygon(b)) => a.intersects(b),
            (Geometry::MultiPolygon(a), Geometry::Polygon(b)) => a.intersects(b),
            (Geometry::MultiPolygon(a), Geometry::MultiPolygon(b)) => a.intersects(b),
        }
    }

    /// Returns true if the geometries meet only along their boundaries.
    pub fn touches(&self, other: &Geometry) -> bool {
        match (self, other) {
            (Geometry::Polygon(a), Geometry::Polygon(b)) => a.relate(b).is_touches(),
            (Geometry::Polygon(a), Geometry::MultiPolygon(b)) => a.relate(b).is_touches(),
            (Geometry::MultiPolygon(a), Geometry::Polygon(b)) => a.relate(b).is_touches(),
            (Geometry::MultiPolygon(a), Geometry::MultiPolygon(b)) => a.relate(b).is_touches(),
        }
    }

    /// Area shared by the two geometries.
    pub fn overlap_area(&self, other: &Geometry) -> f64 {
        self.to_multi_polygon()
            .intersection(&other.to_multi_polygon())
            .unsigned_area()
    }

    /// Area of this geometry lying outside `container`.
    pub fn area_outside(&self, container: &MultiPolygon<f64>) -> f64 {
        self.to_multi_polygon()
            .difference(container)
            .unsigned_area()
    }
}

impl From<Polygon<f64>> for Geometry {
    fn from(polygon: Polygon<f64>) -> Self {
        Geometry::Polygon(polygon)
    }
}

/// Builds a polygon from `(x, y)` vertices; the ring is closed automatically.
pub fn polygon_from_coords(vertices: &[(f64, f64)]) -> Polygon<f64> {
    Polygon::new(LineString::from(vertices.to_vec()), vec![])
}

/// Vertices of a ring without the repeated closing vertex.
pub fn open_ring(ring: &LineString<f64>) -> Vec<(f64, f64)> {
    let mut vertices: Vec<(f64, f64)> = ring.0.iter().map(|c| (c.x, c.y)).collect();
    if vertices.len() > 1 && vertices.first() == vertices.last() {
        vertices.pop();
    }
    vertices
}

/// Normalizes an angle in degrees to `[0, 360)`.
pub fn normalize_angle(angle_degrees: f64) -> f64 {
    let a = angle_degrees.rem_euclid(360.0);
    if a >= 360.0 {
        0.0
    } else {
        a
    }
}

/// Sine and cosine, exact for multiples of 90 degrees.
fn sin_cos_degrees(angle: f64) -> (f64, f64) {
    const EPS: f64 = 1e-12;
    if angle.abs() < EPS {
        (0.0, 1.0)
    } else if (angle - 90.0).abs() < EPS {
        (1.0, 0.0)
    } else if (angle - 180.0).abs() < EPS {
        (0.0, -1.0)
    } else if (angle - 270.0).abs() < EPS {
        (-1.0, 0.0)
    } else {
        angle.to_radians().sin_cos()
    }
}

/// Rotates a polygon counter-clockwise about its own centroid.
pub fn rotate(polygon: &Polygon<f64>, angle_degrees: f64) -> Polygon<f64> {
    let angle = normalize_angle(angle_degrees);
    if angle == 0.0 {
        return polygon.clone();
    }
    let Some(center) = polygon.centroid() else {
        return polygon.clone();
    };
    let (sin, cos) = sin_cos_degrees(angle);
    let (cx, cy) = (center.x(), center.y());

    polygon.map_coords(|c| {
        let dx = c.x - cx;
        let dy = c.y - cy;
        Coord {
            x: cx + dx * cos - dy * sin,
            y: cy + dx * sin + dy * cos,
        }
    })
}

/// Offsets a polygon outward by `distance` with round joins.
///
/// The result is the union of the polygon, the stadium around every edge and
/// a disk at every vertex, i.e. the Minkowski sum with a polygonal disk.
/// A non-positive distance returns the polygon unchanged.
pub fn buffer(polygon: &Polygon<f64>, distance: f64) -> Geometry {
    if distance <= 0.0 || !distance.is_finite() {
        return Geometry::Polygon(polygon.clone());
    }

    let mut ring: Vec<[f64; 2]> = open_ring(polygon.exterior())
        .into_iter()
        .map(|(x, y)| [x, y])
        .collect();
    if ring.len() < 3 {
        return Geometry::Polygon(polygon.clone());
    }
    let as_tuples: Vec<(f64, f64)> = ring.iter().map(|p| (p[0], p[1])).collect();
    if signed_area(&as_tuples) < 0.0 {
        ring.reverse();
    }

    let n = ring.len();
    let mut sweeps: Vec<Vec<[f64; 2]>> = Vec::with_capacity(2 * n);
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        sweeps.push(disk(a, distance));

        let (dx, dy) = (b[0] - a[0], b[1] - a[1]);
        let len = (dx * dx + dy * dy).sqrt();
        if len <= f64::EPSILON {
            continue;
        }
        let (nx, ny) = (-dy / len * distance, dx / len * distance);
        sweeps.push(vec![
            [a[0] - nx, a[1] - ny],
            [b[0] - nx, b[1] - ny],
            [b[0] + nx, b[1] + ny],
            [a[0] + nx, a[1] + ny],
        ]);
    }

    let subject = vec![ring];
    let shapes = subject.overlay(&sweeps, OverlayRule::Union, FillRule::NonZero);

    let mut polygons: Vec<Polygon<f64>> = shapes
        .into_iter()
        .filter_map(|shape| {
            let mut contours = shape
                .into_iter()
                .filter(|contour| contour.len() >= 3)
                .map(|contour| {
                    LineString::from(
                        contour
                            .into_iter()
                            .map(|[x, y]| Coord { x, y })
                            .collect::<Vec<_>>(),
                    )
                });
            let exterior = contours.next()?;
            Some(Polygon::new(exterior, contours.collect()))
        })
        .collect();

    match polygons.len() {
        0 => Geometry::Polygon(polygon.clone()),
        1 => Geometry::Polygon(polygons.remove(0)),
        _ => Geometry::MultiPolygon(MultiPolygon::new(polygons)),
    }
}

/// Counter-clockwise polygonal disk around `center`.
fn disk(center: [f64; 2], radius: f64) -> Vec<[f64; 2]> {
    let segments = QUADRANT_SEGMENTS * 4;
    let step = std::f64::consts::TAU / segments as f64;
    (0..segments)
        .map(|i| {
            let (sin, cos) = (i as f64 * step).sin_cos();
            [center[0] + radius * cos, center[1] + radius * sin]
        })
        .collect()
}

/// Returns true if the polygon has exactly four corners, each within
/// `angle_tolerance_degrees` of a right angle.
///
/// Zero-length edges make the test fail.
pub fn is_approx_rectangle(polygon: &Polygon<f64>, angle_tolerance_degrees: f64) -> bool {
    let vertices = open_ring(polygon.exterior());
    if vertices.len() != 4 {
        return false;
    }

    let n = vertices.len();
    for i in 0..n {
        let prev = vertices[(i + n - 1) % n];
        let curr = vertices[i];
        let next = vertices[(i + 1) % n];

        let v1 = (curr.0 - prev.0, curr.1 - prev.1);
        let v2 = (next.0 - curr.0, next.1 - curr.1);
        let m1 = v1.0.hypot(v1.1);
        let m2 = v2.0.hypot(v2.1);
        if m1 == 0.0 || m2 == 0.0 {
            return false;
        }

        let cos_turn = ((v1.0 * v2.0 + v1.1 * v2.1) / (m1 * m2)).clamp(-1.0, 1.0);
        let turn = cos_turn.acos().to_degrees();
        if (turn - 90.0).abs() > angle_tolerance_degrees {
            return false;
        }
    }

    true
}

/// Strict bounding-box overlap test with a small margin for floating-point noise.
///
/// Boxes that merely touch (or overlap by less than `margin`) do not count.
pub fn bounds_intersect(b1: &Bounds, b2: &Bounds, margin: f64) -> bool {
    !(b1.max_x <= b2.min_x + margin
        || b1.min_x >= b2.max_x - margin
        || b1.max_y <= b2.min_y + margin
        || b1.min_y >= b2.max_y - margin)
}

/// Area of the lamina left free by `occupied` footprints.
pub fn free_space(container: &Polygon<f64>, occupied: &[&Geometry]) -> MultiPolygon<f64> {
    let container = MultiPolygon::new(vec![container.clone()]);
    if occupied.is_empty() {
        return container;
    }
    let union = occupied
        .iter()
        .fold(MultiPolygon::<f64>::new(vec![]), |acc, g| {
            acc.union(&g.to_multi_polygon())
        });
    container.difference(&union)
}

/// Minimum distance between two geometries (0 when they intersect).
pub fn polygon_distance(a: &Geometry, b: &Geometry) -> f64 {
    if a.intersects(b) {
        return 0.0;
    }
    let mut best = f64::INFINITY;
    for pa in a.polygons() {
        for pb in b.polygons() {
            best = best.min(ring_distance(pa, pb));
        }
    }
    best
}

/// Total length of boundary two geometries have in common.
pub fn shared_boundary_length(a: &Geometry, b: &Geometry) -> f64 {
    let mut total = 0.0;
    for pa in a.polygons() {
        for pb in b.polygons() {
            total += polygon_shared_boundary(pa, pb);
        }
    }
    total
}

fn rings(polygon: &Polygon<f64>) -> impl Iterator<Item = &LineString<f64>> {
    std::iter::once(polygon.exterior()).chain(polygon.interiors().iter())
}

/// Minimum distance between the rings of two disjoint polygons.
fn ring_distance(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    let mut best = f64::INFINITY;
    for ra in rings(a) {
        for la in ra.lines() {
            for rb in rings(b) {
                for lb in rb.lines() {
                    best = best.min(segment_distance(
                        (la.start.x, la.start.y),
                        (la.end.x, la.end.y),
                        (lb.start.x, lb.start.y),
                        (lb.end.x, lb.end.y),
                    ));
                }
            }
        }
    }
    best
}

fn point_segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = dx * dx + dy * dy;
    let t = if len_sq > 0.0 {
        (((p.0 - a.0) * dx + (p.1 - a.1) * dy) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (qx, qy) = (a.0 + t * dx, a.1 + t * dy);
    (p.0 - qx).hypot(p.1 - qy)
}

fn segment_distance(p1: (f64, f64), p2: (f64, f64), q1: (f64, f64), q2: (f64, f64)) -> f64 {
    if lamina_core::robust::segments_intersect(p1, p2, q1, q2) {
        return 0.0;
    }
    point_segment_distance(p1, q1, q2)
        .min(point_segment_distance(p2, q1, q2))
        .min(point_segment_distance(q1, p1, p2))
        .min(point_segment_distance(q2, p1, p2))
}

/// Length of the collinear overlap between the rings of two polygons.
fn polygon_shared_boundary(a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
    let mut total = 0.0;
    for ra in rings(a) {
        for la in ra.lines() {
            let (dx, dy) = (la.end.x - la.start.x, la.end.y - la.start.y);
            let len = dx.hypot(dy);
            if len <= f64::EPSILON {
                continue;
            }
            let (ux, uy) = (dx / len, dy / len);

            for rb in rings(b) {
                for lb in rb.lines() {
                    // Perpendicular offsets of both endpoints from a's supporting line
                    let off_start = (lb.start.x - la.start.x) * uy - (lb.start.y - la.start.y) * ux;
                    let off_end = (lb.end.x - la.start.x) * uy - (lb.end.y - la.start.y) * ux;
                    if off_start.abs() > COLLINEAR_TOLERANCE || off_end.abs() > COLLINEAR_TOLERANCE {
                        continue;
                    }

                    let t0 = (lb.start.x - la.start.x) * ux + (lb.start.y - la.start.y) * uy;
                    let t1 = (lb.end.x - la.start.x) * ux + (lb.end.y - la.start.y) * uy;
                    let lo = t0.min(t1).max(0.0);
                    let hi = t0.max(t1).min(len);
                    if hi > lo {
                        total += hi - lo;
                    }
                }
            }
        }
    }
    total
}
