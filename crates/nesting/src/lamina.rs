//! The stock sheet pieces are cut from.

use crate::geometry::{
    open_ring, polygon_from_coords, Bounds, Geometry, BOUNDS_TOLERANCE, RELATIVE_AREA_TOLERANCE,
};
use geo::{Area, MultiPolygon, Polygon};
use lamina_core::{Error, Result};

/// A lamina (stock sheet): one simple polygon, immutable for a run.
#[derive(Debug, Clone)]
pub struct Lamina {
    polygon: Polygon<f64>,

    /// Same shape as a multi-polygon, kept for boolean operations.
    container: MultiPolygon<f64>,

    bounds: Bounds,

    area: f64,

    /// Axis-aligned rectangle: the bounding-box test alone decides containment.
    rectangular: bool,
}

impl Lamina {
    /// Creates a lamina from polygon vertices.
    pub fn new(vertices: &[(f64, f64)]) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(Error::InvalidGeometry(
                "lamina must have at least 3 vertices".into(),
            ));
        }
        Self::from_polygon(polygon_from_coords(vertices))
    }

    /// Creates a rectangular lamina with its lower-left corner at the origin.
    pub fn rectangle(width: f64, height: f64) -> Result<Self> {
        Self::new(&[(0.0, 0.0), (width, 0.0), (width, height), (0.0, height)])
    }

    /// Wraps an existing polygon.
    pub fn from_polygon(polygon: Polygon<f64>) -> Result<Self> {
        let area = polygon.unsigned_area();
        if !area.is_finite() || area <= 0.0 {
            return Err(Error::InvalidGeometry(
                "lamina must have a positive area".into(),
            ));
        }

        let bounds = Geometry::Polygon(polygon.clone()).bounds();
        let rectangular = polygon.interiors().is_empty()
            && (bounds.area() - area).abs() <= RELATIVE_AREA_TOLERANCE * area;

        Ok(Self {
            container: MultiPolygon::new(vec![polygon.clone()]),
            polygon,
            bounds,
            area,
            rectangular,
        })
    }

    /// The lamina outline.
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    /// Returns true if the lamina is an axis-aligned rectangle.
    pub fn is_rectangular(&self) -> bool {
        self.rectangular
    }

    /// Exterior vertices without the closing vertex.
    pub fn vertices(&self) -> Vec<(f64, f64)> {
        open_ring(self.polygon.exterior())
    }

    /// Closed exterior ring.
    pub fn exterior_ring(&self) -> Vec<[f64; 2]> {
        self.polygon
            .exterior()
            .0
            .iter()
            .map(|c| [c.x, c.y])
            .collect()
    }

    /// Returns true if `geometry` (with bounding box `bounds`) lies inside the
    /// lamina. Shapes flush with the boundary count as inside.
    pub fn contains(&self, geometry: &Geometry, bounds: &Bounds) -> bool {
        if !self.bounds.contains(bounds, BOUNDS_TOLERANCE) {
            return false;
        }
        if self.rectangular {
            return true;
        }
        geometry.area_outside(&self.container) <= RELATIVE_AREA_TOLERANCE * geometry.area()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_lamina() {
        let lamina = Lamina::rectangle(100.0, 50.0).unwrap();
        assert_relative_eq!(lamina.area(), 5000.0);
        assert!(lamina.is_rectangular());
        assert_eq!(lamina.bounds(), &Bounds::new(0.0, 0.0, 100.0, 50.0));
        assert_eq!(lamina.vertices().len(), 4);
        assert_eq!(lamina.exterior_ring().len(), 5);
    }

    #[test]
    fn test_l_shaped_lamina_is_not_rectangular() {
        let lamina = Lamina::new(&[
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 40.0),
            (40.0, 40.0),
            (40.0, 100.0),
            (0.0, 100.0),
        ])
        .unwrap();
        assert!(!lamina.is_rectangular());
        assert_relative_eq!(lamina.area(), 6400.0);
    }

    #[test]
    fn test_invalid_laminae() {
        assert!(matches!(
            Lamina::new(&[(0.0, 0.0), (1.0, 1.0)]),
            Err(Error::InvalidGeometry(_))
        ));
        assert!(matches!(
            Lamina::new(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]),
            Err(Error::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_contains_flush_piece() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let piece = Geometry::Polygon(polygon_from_coords(&[
            (90.0, 0.0),
            (100.0, 0.0),
            (100.0, 10.0),
            (90.0, 10.0),
        ]));
        assert!(lamina.contains(&piece, &piece.bounds()));

        let outside = piece.translated(1.0, 0.0);
        assert!(!lamina.contains(&outside, &outside.bounds()));
    }

    #[test]
    fn test_contains_in_notch() {
        let lamina = Lamina::new(&[
            (0.0, 0.0),
            (100.0, 0.0),
            (100.0, 40.0),
            (40.0, 40.0),
            (40.0, 100.0),
            (0.0, 100.0),
        ])
        .unwrap();

        let inside = Geometry::Polygon(polygon_from_coords(&[
            (50.0, 0.0),
            (100.0, 0.0),
            (100.0, 40.0),
            (50.0, 40.0),
        ]));
        assert!(lamina.contains(&inside, &inside.bounds()));

        // Inside the bounding box but in the cut-away corner
        let in_notch = Geometry::Polygon(polygon_from_coords(&[
            (60.0, 60.0),
            (80.0, 60.0),
            (80.0, 80.0),
            (60.0, 80.0),
        ]));
        assert!(!lamina.contains(&in_notch, &in_notch.bounds()));
    }
}
