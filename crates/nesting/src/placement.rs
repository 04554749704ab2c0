//! Placement engine: anchor generation, validity checks, compaction and the
//! center-out search that places one template into a partial solution.
//!
//! Every check runs on a candidate's *footprint*, the piece expanded by the
//! buffer distance. Footprints may touch each other and the lamina boundary
//! but never overlap, which keeps at least twice the buffer between pieces
//! and at least the buffer between a piece and the lamina edge.

use crate::geometry::{
    bounds_intersect, free_space, Bounds, Geometry, BOUNDS_MARGIN, BOUNDS_TOLERANCE,
    RELATIVE_AREA_TOLERANCE,
};
use crate::lamina::Lamina;
use crate::spatial_index::OccupancyIndex;
use crate::template::PieceTemplate;
use geo::{Area, BoundingRect};
use std::sync::Arc;

/// Initial compaction step as a fraction of the lamina extent.
pub const SNAP_STEP_FRACTION: f64 = 0.05;

/// Compaction stops once the step falls below this length.
pub const MIN_SNAP_STEP: f64 = 0.01;

/// Maximum compaction moves per axis.
pub const MAX_SNAP_ITERATIONS: usize = 100;

/// Anchors closer than this on both axes are merged.
const ANCHOR_TOLERANCE: f64 = 1e-9;

/// A piece placed on the lamina.
#[derive(Debug, Clone)]
pub struct PlacedPiece {
    template: Arc<PieceTemplate>,
    angle: f64,
    offset: (f64, f64),
    geometry: Arc<Geometry>,
    footprint: Arc<Geometry>,
}

impl PlacedPiece {
    /// Places `template` rotated by `angle` and moved by `offset`.
    pub fn new(template: Arc<PieceTemplate>, angle: f64, offset: (f64, f64), buffer: f64) -> Self {
        let geometry = Arc::new(template.geometry_at(angle, offset));
        let footprint = if buffer > 0.0 {
            Arc::new(template.footprint_at(angle, buffer, offset))
        } else {
            Arc::clone(&geometry)
        };
        Self {
            template,
            angle,
            offset,
            geometry,
            footprint,
        }
    }

    pub fn template(&self) -> &Arc<PieceTemplate> {
        &self.template
    }

    pub fn template_id(&self) -> &str {
        self.template.id()
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Translation applied to the template's rotated geometry.
    pub fn offset(&self) -> (f64, f64) {
        self.offset
    }

    /// The placed piece outline.
    pub fn geometry(&self) -> &Arc<Geometry> {
        &self.geometry
    }

    /// The buffer-expanded outline.
    pub fn footprint(&self) -> &Arc<Geometry> {
        &self.footprint
    }

    pub fn area(&self) -> f64 {
        self.template.area()
    }
}

/// Ordered placed pieces forming one layout.
pub type Solution = Vec<PlacedPiece>;

/// A partial solution being built on a lamina, with its occupancy index.
#[derive(Debug)]
pub struct PlacementContext<'a> {
    lamina: &'a Lamina,
    buffer: f64,
    index: OccupancyIndex,
    pieces: Solution,
}

impl<'a> PlacementContext<'a> {
    /// Creates an empty context.
    pub fn new(lamina: &'a Lamina, buffer: f64) -> Self {
        Self {
            lamina,
            buffer,
            index: OccupancyIndex::new(),
            pieces: Vec::new(),
        }
    }

    /// Creates a context around pieces that are already placed.
    pub fn with_pieces(lamina: &'a Lamina, buffer: f64, pieces: Solution) -> Self {
        let index = OccupancyIndex::from_solution(&pieces);
        Self {
            lamina,
            buffer,
            index,
            pieces,
        }
    }

    pub fn lamina(&self) -> &Lamina {
        self.lamina
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    pub fn pieces(&self) -> &[PlacedPiece] {
        &self.pieces
    }

    /// Consumes the context, returning the solution.
    pub fn into_pieces(self) -> Solution {
        self.pieces
    }

    /// Returns true if a piece of template `id` is already placed.
    pub fn contains_template(&self, id: &str) -> bool {
        self.pieces.iter().any(|p| p.template_id() == id)
    }

    /// Candidate positions for the lower-left corner of a new footprint,
    /// nearest to the origin first.
    pub fn find_gaps_and_anchors(&self) -> Vec<(f64, f64)> {
        let mut anchors = self.lamina.vertices();

        for piece in &self.pieces {
            let footprint = piece.footprint();
            anchors.push(footprint.bounds().lower_left());
            anchors.extend(footprint.exterior_vertices());
        }

        let occupied: Vec<&Geometry> = self.pieces.iter().map(|p| p.footprint().as_ref()).collect();
        let free = free_space(self.lamina.polygon(), &occupied);
        let largest = free
            .0
            .iter()
            .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()));
        match largest.and_then(|component| component.bounding_rect()) {
            Some(rect) => anchors.push((rect.min().x, rect.min().y)),
            None => log::trace!("no free space left on the lamina"),
        }

        sort_anchors(&mut anchors);
        anchors
    }

    /// Returns true if `footprint` lies in the lamina and overlaps no placed
    /// footprint. Touching is allowed.
    pub fn check_valid_placement(&self, footprint: &Geometry) -> bool {
        let bounds = footprint.bounds();
        if bounds.is_empty() || !self.lamina.contains(footprint, &bounds) {
            return false;
        }

        let candidates = self.index.query_intersecting_candidates(&bounds);
        if candidates.is_empty() {
            return true;
        }

        let area = footprint.area();
        for handle in candidates {
            let Some(placed) = self.index.geometry(handle) else {
                continue;
            };
            if !bounds_intersect(&placed.bounds(), &bounds, BOUNDS_MARGIN) {
                continue;
            }
            if !placed.intersects(footprint) {
                continue;
            }
            let tolerance = RELATIVE_AREA_TOLERANCE * area.min(placed.area());
            if placed.overlap_area(footprint) > tolerance {
                return false;
            }
        }

        true
    }

    /// Slides a valid placement down, then left, with halving steps.
    pub fn snap_toward_origin(
        &self,
        template: &PieceTemplate,
        angle: f64,
        offset: (f64, f64),
    ) -> (f64, f64) {
        let bounds = self.lamina.bounds();
        let lowered = self.slide(template, angle, offset, (0.0, -1.0), bounds.height());
        self.slide(template, angle, lowered, (-1.0, 0.0), bounds.width())
    }

    /// Moves along `direction` while the placement stays valid, halving the
    /// step on every rejected move.
    fn slide(
        &self,
        template: &PieceTemplate,
        angle: f64,
        start: (f64, f64),
        direction: (f64, f64),
        extent: f64,
    ) -> (f64, f64) {
        let mut current = start;
        let mut step = (extent * SNAP_STEP_FRACTION).max(MIN_SNAP_STEP);

        for _ in 0..MAX_SNAP_ITERATIONS {
            let trial = (current.0 + direction.0 * step, current.1 + direction.1 * step);
            if self.check_valid_placement(&template.footprint_at(angle, self.buffer, trial)) {
                current = trial;
                continue;
            }
            if step < MIN_SNAP_STEP {
                break;
            }
            step /= 2.0;
        }

        current
    }

    /// Tries every admissible angle against every anchor and returns the
    /// first valid, compacted placement.
    pub fn find_valid_placement_center_out(
        &self,
        template: &Arc<PieceTemplate>,
    ) -> Option<PlacedPiece> {
        let lamina_bounds = self.lamina.bounds();
        let anchors = self.find_gaps_and_anchors();

        for &angle in template.possible_angles() {
            let footprint_bounds = template.buffered(angle, self.buffer).bounds();
            if footprint_bounds.is_empty() || !fits_extent(&footprint_bounds, lamina_bounds) {
                continue;
            }

            for &(ax, ay) in &anchors {
                let offset = (ax - footprint_bounds.min_x, ay - footprint_bounds.min_y);
                if !self.check_valid_placement(&template.footprint_at(angle, self.buffer, offset)) {
                    continue;
                }

                let snapped = self.snap_toward_origin(template, angle, offset);
                if self.check_valid_placement(&template.footprint_at(angle, self.buffer, snapped)) {
                    return Some(PlacedPiece::new(
                        Arc::clone(template),
                        angle,
                        snapped,
                        self.buffer,
                    ));
                }
            }
        }

        log::trace!("no valid placement for template {}", template.id());
        None
    }

    /// Appends a placed piece and indexes its footprint.
    pub fn push(&mut self, piece: PlacedPiece) {
        self.index.insert(Arc::clone(piece.footprint()));
        self.pieces.push(piece);
    }

    /// Places one template; returns false when it does not fit.
    pub fn place(&mut self, template: &Arc<PieceTemplate>) -> bool {
        match self.find_valid_placement_center_out(template) {
            Some(piece) => {
                self.push(piece);
                true
            }
            None => false,
        }
    }

    /// Places templates in order, skipping those that do not fit.
    /// Returns the number placed.
    pub fn place_greedily<'t>(
        &mut self,
        templates: impl IntoIterator<Item = &'t Arc<PieceTemplate>>,
    ) -> usize {
        templates
            .into_iter()
            .filter(|template| self.place(template))
            .count()
    }
}

/// Returns true if a box of these dimensions can fit in the lamina box at all.
fn fits_extent(footprint: &Bounds, lamina: &Bounds) -> bool {
    footprint.width() <= lamina.width() + 2.0 * BOUNDS_TOLERANCE
        && footprint.height() <= lamina.height() + 2.0 * BOUNDS_TOLERANCE
}

/// Sorts anchors by distance from the origin (then x, then y) and removes
/// near-duplicates.
fn sort_anchors(anchors: &mut Vec<(f64, f64)>) {
    anchors.retain(|(x, y)| x.is_finite() && y.is_finite());
    anchors.sort_by(|a, b| {
        a.0.hypot(a.1)
            .total_cmp(&b.0.hypot(b.1))
            .then_with(|| a.0.total_cmp(&b.0))
            .then_with(|| a.1.total_cmp(&b.1))
    });

    let mut unique: Vec<(f64, f64)> = Vec::with_capacity(anchors.len());
    for &anchor in anchors.iter() {
        let reach = anchor.0.hypot(anchor.1) - 2.0 * ANCHOR_TOLERANCE;
        // Sorted by distance: only the tail of `unique` can hold a near-duplicate
        let duplicate = unique
            .iter()
            .rev()
            .take_while(|u| u.0.hypot(u.1) >= reach)
            .any(|u| {
                (u.0 - anchor.0).abs() <= ANCHOR_TOLERANCE
                    && (u.1 - anchor.1).abs() <= ANCHOR_TOLERANCE
            });
        if !duplicate {
            unique.push(anchor);
        }
    }
    *anchors = unique;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::polygon_from_coords;
    use crate::template::{build_templates, PieceSpec};
    use approx::assert_relative_eq;

    fn squares(size: f64, quantity: usize) -> Vec<Arc<PieceTemplate>> {
        build_templates(&[PieceSpec::new(
            &[(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)],
            quantity,
        )])
    }

    fn square_geometry(x: f64, y: f64, size: f64) -> Geometry {
        Geometry::Polygon(polygon_from_coords(&[
            (x, y),
            (x + size, y),
            (x + size, y + size),
            (x, y + size),
        ]))
    }

    #[test]
    fn test_first_piece_goes_to_origin() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 1);
        let ctx = PlacementContext::new(&lamina, 0.0);

        let piece = ctx.find_valid_placement_center_out(&templates[0]).unwrap();
        let bounds = piece.geometry().bounds();
        assert_relative_eq!(bounds.min_x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(bounds.min_y, 0.0, epsilon = 1e-9);
        assert_eq!(piece.template_id(), templates[0].id());
    }

    #[test]
    fn test_buffer_keeps_piece_off_the_edge() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 1);
        let ctx = PlacementContext::new(&lamina, 2.0);

        let piece = ctx.find_valid_placement_center_out(&templates[0]).unwrap();
        let bounds = piece.geometry().bounds();
        assert!(bounds.min_x >= 2.0 - 1e-3);
        assert!(bounds.min_y >= 2.0 - 1e-3);
        assert!(lamina.contains(piece.footprint(), &piece.footprint().bounds()));
    }

    #[test]
    fn test_check_valid_placement() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 1);
        let mut ctx = PlacementContext::new(&lamina, 0.0);
        ctx.push(PlacedPiece::new(Arc::clone(&templates[0]), 0.0, (0.0, 0.0), 0.0));

        // Touching the placed square is fine, overlapping it is not
        assert!(ctx.check_valid_placement(&square_geometry(10.0, 0.0, 10.0)));
        assert!(!ctx.check_valid_placement(&square_geometry(5.0, 5.0, 10.0)));
        // Outside the lamina
        assert!(!ctx.check_valid_placement(&square_geometry(95.0, 0.0, 10.0)));
        // Flush with the far corner
        assert!(ctx.check_valid_placement(&square_geometry(90.0, 90.0, 10.0)));
    }

    #[test]
    fn test_anchors_sorted_and_unique() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 1);
        let mut ctx = PlacementContext::new(&lamina, 0.0);
        ctx.push(PlacedPiece::new(Arc::clone(&templates[0]), 0.0, (0.0, 0.0), 0.0));

        let anchors = ctx.find_gaps_and_anchors();
        assert_eq!(anchors[0], (0.0, 0.0));
        for pair in anchors.windows(2) {
            assert!(pair[0].0.hypot(pair[0].1) <= pair[1].0.hypot(pair[1].1));
            assert_ne!(pair[0], pair[1]);
        }
        assert!(anchors.contains(&(10.0, 0.0)));
        assert!(anchors.contains(&(0.0, 10.0)));
        assert!(anchors.contains(&(100.0, 100.0)));
    }

    #[test]
    fn test_anchors_include_free_space_corner() {
        // Diamond lamina: the free region's bounding box corner is not a vertex
        let diamond = [(50.0, 0.0), (100.0, 50.0), (50.0, 100.0), (0.0, 50.0)];
        let lamina = Lamina::new(&diamond).unwrap();
        let templates = squares(10.0, 1);
        let mut ctx = PlacementContext::new(&lamina, 0.0);
        ctx.push(PlacedPiece::new(Arc::clone(&templates[0]), 0.0, (45.0, 80.0), 0.0));

        let piece_corners = ctx.pieces()[0].footprint().exterior_vertices();
        assert!(!diamond.contains(&(0.0, 0.0)));
        assert!(piece_corners.iter().all(|&(x, y)| x.hypot(y) > 1.0));

        let anchors = ctx.find_gaps_and_anchors();
        assert!(anchors.iter().any(|&(x, y)| x.abs() < 1e-6 && y.abs() < 1e-6));
        assert!(anchors[0].0.hypot(anchors[0].1) < 1e-6);
    }

    #[test]
    fn test_snap_toward_origin() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 1);
        let ctx = PlacementContext::new(&lamina, 0.0);

        let (x, y) = ctx.snap_toward_origin(&templates[0], 0.0, (40.0, 60.0));
        assert!(x.abs() < 0.05);
        assert!(y.abs() < 0.05);
        assert!(ctx.check_valid_placement(&templates[0].footprint_at(0.0, 0.0, (x, y))));
    }

    #[test]
    fn test_place_greedily_fills_row() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 4);
        let mut ctx = PlacementContext::new(&lamina, 0.0);

        assert_eq!(ctx.place_greedily(templates.iter()), 4);
        let pieces = ctx.into_pieces();
        for (i, a) in pieces.iter().enumerate() {
            for b in pieces.iter().skip(i + 1) {
                assert!(a.footprint().overlap_area(b.footprint()) < 1e-6);
            }
        }
    }

    #[test]
    fn test_piece_larger_than_lamina() {
        let lamina = Lamina::rectangle(5.0, 5.0).unwrap();
        let templates = squares(10.0, 2);
        let mut ctx = PlacementContext::new(&lamina, 0.0);

        assert!(ctx.find_valid_placement_center_out(&templates[0]).is_none());
        assert_eq!(ctx.place_greedily(templates.iter()), 0);
        assert!(ctx.pieces().is_empty());
    }

    #[test]
    fn test_with_pieces_rebuilds_index() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let templates = squares(10.0, 2);
        let first = PlacedPiece::new(Arc::clone(&templates[0]), 0.0, (0.0, 0.0), 0.0);
        let ctx = PlacementContext::with_pieces(&lamina, 0.0, vec![first]);

        assert!(ctx.contains_template(templates[0].id()));
        assert!(!ctx.contains_template(templates[1].id()));
        assert!(!ctx.check_valid_placement(&square_geometry(0.0, 0.0, 10.0)));
    }

    #[test]
    fn test_sort_anchors_dedups() {
        let mut anchors = vec![(10.0, 0.0), (0.0, 10.0), (0.0, 0.0), (10.0, 0.0), (1e-12, 0.0)];
        sort_anchors(&mut anchors);
        assert_eq!(anchors, vec![(0.0, 0.0), (0.0, 10.0), (10.0, 0.0)]);
    }
}
