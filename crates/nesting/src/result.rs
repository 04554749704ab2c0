//! Nesting result.

use crate::fitness::FitnessBreakdown;
use crate::placement::{PlacedPiece, Solution};
use std::time::Duration;

/// Outcome of a nesting run: the best layout seen and how it was found.
#[derive(Debug, Clone)]
pub struct NestingResult {
    /// Placed pieces of the best layout.
    pub placed: Solution,

    /// Required pieces missing from the layout.
    pub unplaced_count: usize,

    /// Total pieces requested.
    pub required: usize,

    /// Score of the layout and its components.
    pub fitness: FitnessBreakdown,

    /// Reproduction rounds run.
    pub generations: u32,

    /// Whether the run ended because the best fitness stopped improving.
    pub stopped_early: bool,

    /// Best fitness after each generation.
    pub history: Vec<f64>,

    /// Wall-clock time of the optimization.
    pub elapsed: Duration,
}

impl NestingResult {
    pub fn placed_count(&self) -> usize {
        self.placed.len()
    }

    /// Returns true if every requested piece was placed.
    pub fn is_complete(&self) -> bool {
        self.unplaced_count == 0
    }

    /// Placed area over lamina area.
    pub fn utilization(&self, lamina_area: f64) -> f64 {
        if lamina_area <= 0.0 {
            return 0.0;
        }
        self.placed.iter().map(PlacedPiece::area).sum::<f64>() / lamina_area
    }
}
