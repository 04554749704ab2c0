//! Layout scoring.
//!
//! A layout is rewarded for packing its pieces tightly (compactness) and for
//! pieces that sit close to or against each other (cohesion), and penalized
//! for every required piece it failed to place.

use crate::geometry::{polygon_distance, shared_boundary_length, Bounds};
use crate::placement::PlacedPiece;
use crate::spatial_index::OccupancyIndex;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Weight of the compactness ratio.
pub const COMPACTNESS_WEIGHT: f64 = 5000.0;

/// Weight of the normalized cohesion reward.
pub const COHESION_WEIGHT: f64 = 200.0;

/// Penalty per required piece left unplaced.
pub const UNPLACED_PENALTY: f64 = 1000.0;

/// Fitness of a layout with no pieces.
pub const EMPTY_SOLUTION_FITNESS: f64 = -10000.0;

/// Reward per unit of clearance below the buffer for near neighbours.
const PROXIMITY_REWARD: f64 = 10.0;

/// Reward per unit of shared boundary for touching neighbours.
const CONTACT_REWARD: f64 = 10.0;

/// The components of a fitness value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FitnessBreakdown {
    pub compactness: f64,
    pub cohesion: f64,
    /// `compactness * 5000 + cohesion * 200`.
    pub combined: f64,
    pub placed: usize,
    pub required: usize,
    pub fitness: f64,
}

/// Total piece area over the area of the box enclosing every piece.
pub fn compactness(pieces: &[PlacedPiece]) -> f64 {
    if pieces.is_empty() {
        return 0.0;
    }

    let bounds = pieces
        .iter()
        .map(|p| p.geometry().bounds())
        .fold(Bounds::empty(), |acc, b| acc.union(&b));
    let box_area = bounds.area();
    if box_area <= 0.0 {
        return 0.0;
    }

    let used: f64 = pieces.iter().map(|p| p.geometry().area()).sum();
    used / box_area
}

/// Adjacency reward normalized by the square root of the lamina area.
///
/// Pairs closer than half the buffer earn `(buffer - distance) * 10`; pairs
/// that touch earn ten times the length of their shared boundary.
pub fn cohesion(pieces: &[PlacedPiece], buffer: f64, lamina_area: f64) -> f64 {
    if lamina_area <= 0.0 || pieces.len() < 2 {
        return 0.0;
    }

    let index = OccupancyIndex::from_geometries(pieces.iter().map(|p| Arc::clone(p.geometry())));
    let mut score = 0.0;

    for (i, piece) in pieces.iter().enumerate() {
        let g1 = piece.geometry();
        for j in index.query_intersecting_candidates(&g1.bounds()) {
            if i >= j {
                continue;
            }
            let g2 = pieces[j].geometry();

            let distance = polygon_distance(g1, g2);
            if distance < buffer * 0.5 {
                score += (buffer - distance) * PROXIMITY_REWARD;
            }
            if g1.touches(g2) {
                score += shared_boundary_length(g1, g2) * CONTACT_REWARD;
            }
        }
    }

    score / lamina_area.sqrt()
}

/// Scores a layout that should have placed `required` pieces.
pub fn evaluate_fitness(
    pieces: &[PlacedPiece],
    lamina_area: f64,
    buffer: f64,
    required: usize,
) -> FitnessBreakdown {
    if pieces.is_empty() {
        return FitnessBreakdown {
            compactness: 0.0,
            cohesion: 0.0,
            combined: 0.0,
            placed: 0,
            required,
            fitness: EMPTY_SOLUTION_FITNESS,
        };
    }

    let compactness = compactness(pieces);
    let cohesion = cohesion(pieces, buffer, lamina_area);
    let combined = compactness * COMPACTNESS_WEIGHT + cohesion * COHESION_WEIGHT;
    let missing = required as f64 - pieces.len() as f64;

    FitnessBreakdown {
        compactness,
        cohesion,
        combined,
        placed: pieces.len(),
        required,
        fitness: combined - missing * UNPLACED_PENALTY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{build_templates, PieceSpec};
    use approx::assert_relative_eq;

    fn square_pieces(offsets: &[(f64, f64)], buffer: f64) -> Vec<PlacedPiece> {
        let templates = build_templates(&[PieceSpec::new(
            &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
            offsets.len(),
        )]);
        templates
            .into_iter()
            .zip(offsets)
            .map(|(t, &offset)| PlacedPiece::new(t, 0.0, offset, buffer))
            .collect()
    }

    #[test]
    fn test_empty_solution() {
        let breakdown = evaluate_fitness(&[], 10000.0, 5.0, 4);
        assert_eq!(breakdown.fitness, EMPTY_SOLUTION_FITNESS);
        assert_eq!(compactness(&[]), 0.0);
    }

    #[test]
    fn test_compactness() {
        // Two squares side by side fill their bounding box
        let pieces = square_pieces(&[(0.0, 0.0), (10.0, 0.0)], 0.0);
        assert_relative_eq!(compactness(&pieces), 1.0, epsilon = 1e-9);

        // Diagonal squares fill half of it
        let pieces = square_pieces(&[(0.0, 0.0), (10.0, 10.0)], 0.0);
        assert_relative_eq!(compactness(&pieces), 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cohesion_for_touching_pieces() {
        let pieces = square_pieces(&[(0.0, 0.0), (10.0, 0.0)], 0.0);
        // Shared edge of 10, distance 0 is not below half of a zero buffer
        assert_relative_eq!(cohesion(&pieces, 0.0, 10000.0), 100.0 / 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cohesion_for_near_pieces() {
        // Bounding boxes must intersect for a pair to be considered
        let near = square_pieces(&[(0.0, 0.0), (10.0, 0.0)], 4.0);
        let reward = cohesion(&near, 4.0, 10000.0);
        // Touching: (4 - 0) * 10 proximity plus 10 * 10 contact
        assert_relative_eq!(reward, (40.0 + 100.0) / 100.0, epsilon = 1e-9);

        let apart = square_pieces(&[(0.0, 0.0), (30.0, 0.0)], 4.0);
        assert_relative_eq!(cohesion(&apart, 4.0, 10000.0), 0.0);
    }

    #[test]
    fn test_cohesion_without_lamina_area() {
        let pieces = square_pieces(&[(0.0, 0.0), (10.0, 0.0)], 0.0);
        assert_eq!(cohesion(&pieces, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_penalty_for_unplaced() {
        let pieces = square_pieces(&[(0.0, 0.0), (10.0, 0.0)], 0.0);
        let full = evaluate_fitness(&pieces, 10000.0, 0.0, 2);
        let short = evaluate_fitness(&pieces, 10000.0, 0.0, 4);

        assert_relative_eq!(full.combined, 5000.0 + 200.0, epsilon = 1e-6);
        assert_relative_eq!(full.fitness, full.combined);
        assert_relative_eq!(short.fitness, full.fitness - 2000.0, epsilon = 1e-9);
        assert_eq!(short.placed, 2);
        assert_eq!(short.required, 4);
    }
}
