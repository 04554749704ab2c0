//! Robust geometric predicates for input validation.
//!
//! Orientation tests use Shewchuk's adaptive precision arithmetic (through the
//! `robust` crate) so that simplicity checks on user-supplied polygons give the
//! right answer for nearly collinear vertices.
//!
//! ## Example
//!
//! ```rust
//! use lamina_core::robust::{orient2d, Orientation};
//!
//! let a = (0.0, 0.0);
//! let b = (1.0, 0.0);
//! let c = (0.5, 1.0);
//!
//! assert_eq!(orient2d(a, b, c), Orientation::CounterClockwise);
//! ```

use robust::{orient2d as robust_orient2d, Coord};

/// Result of an orientation test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Points are arranged counter-clockwise (left turn).
    CounterClockwise,
    /// Points are arranged clockwise (right turn).
    Clockwise,
    /// Points are collinear (on the same line).
    Collinear,
}

impl Orientation {
    /// Returns true if the orientation is counter-clockwise.
    #[inline]
    pub fn is_ccw(self) -> bool {
        matches!(self, Orientation::CounterClockwise)
    }

    /// Returns true if the orientation is clockwise.
    #[inline]
    pub fn is_cw(self) -> bool {
        matches!(self, Orientation::Clockwise)
    }

    /// Returns true if the points are collinear.
    #[inline]
    pub fn is_collinear(self) -> bool {
        matches!(self, Orientation::Collinear)
    }
}

/// Determines the orientation of three 2D points.
///
/// Returns `CounterClockwise` if `pc` lies to the left of the directed line
/// from `pa` to `pb`, `Clockwise` if it lies to the right and `Collinear`
/// otherwise.
#[inline]
pub fn orient2d(pa: (f64, f64), pb: (f64, f64), pc: (f64, f64)) -> Orientation {
    let result = robust_orient2d(
        Coord { x: pa.0, y: pa.1 },
        Coord { x: pb.0, y: pb.1 },
        Coord { x: pc.0, y: pc.1 },
    );

    if result > 0.0 {
        Orientation::CounterClockwise
    } else if result < 0.0 {
        Orientation::Clockwise
    } else {
        Orientation::Collinear
    }
}

/// Computes the signed area of a ring (positive when counter-clockwise).
///
/// The ring may or may not repeat its first vertex at the end.
pub fn signed_area(ring: &[(f64, f64)]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }

    // Kahan summation
    let mut sum = 0.0;
    let mut c = 0.0;

    for i in 0..n {
        let j = (i + 1) % n;
        let term = ring[i].0 * ring[j].1 - ring[j].0 * ring[i].1;

        let y = term - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }

    sum / 2.0
}

/// Returns true if `p` lies on the closed segment `a`-`b`.
pub fn point_on_segment(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> bool {
    orient2d(a, b, p).is_collinear()
        && p.0 >= a.0.min(b.0)
        && p.0 <= a.0.max(b.0)
        && p.1 >= a.1.min(b.1)
        && p.1 <= a.1.max(b.1)
}

/// Returns true if the closed segments `p1`-`p2` and `q1`-`q2` share at least one point.
pub fn segments_intersect(p1: (f64, f64), p2: (f64, f64), q1: (f64, f64), q2: (f64, f64)) -> bool {
    let o1 = orient2d(p1, p2, q1);
    let o2 = orient2d(p1, p2, q2);
    let o3 = orient2d(q1, q2, p1);
    let o4 = orient2d(q1, q2, p2);

    let proper = !o1.is_collinear()
        && !o2.is_collinear()
        && !o3.is_collinear()
        && !o4.is_collinear()
        && o1 != o2
        && o3 != o4;
    if proper {
        return true;
    }

    point_on_segment(q1, p1, p2)
        || point_on_segment(q2, p1, p2)
        || point_on_segment(p1, q1, q2)
        || point_on_segment(p2, q1, q2)
}

/// Checks that a ring (without closing vertex) describes a simple polygon.
///
/// Non-adjacent edges must not touch, and adjacent edges must only share
/// their common vertex (no fold-backs onto the previous edge).
pub fn is_simple_polygon(ring: &[(f64, f64)]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    for i in 0..n {
        let a1 = ring[i];
        let a2 = ring[(i + 1) % n];
        if a1 == a2 {
            return false;
        }

        for j in (i + 1)..n {
            let b1 = ring[j];
            let b2 = ring[(j + 1) % n];
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);

            if adjacent {
                // Shared vertex is fine; overlapping collinear edges are not.
                let (shared, other_a, other_b) = if j == i + 1 { (a2, a1, b2) } else { (a1, a2, b1) };
                if orient2d(other_a, shared, other_b).is_collinear() {
                    let backtracks = (other_a.0 - shared.0) * (other_b.0 - shared.0)
                        + (other_a.1 - shared.1) * (other_b.1 - shared.1)
                        > 0.0;
                    if backtracks {
                        return false;
                    }
                }
                continue;
            }

            if segments_intersect(a1, a2, b1, b2) {
                return false;
            }
        }
    }

    true
}
