//! # Lamina Nesting
//!
//! 2D irregular nesting of polygonal pieces on a single stock sheet (lamina).
//!
//! Pieces are placed with a greedy anchor-based placement engine and the
//! resulting layouts are improved by a genetic algorithm whose fitness favours
//! compact, cohesive arrangements and penalizes unplaced pieces.
//!
//! ## Features
//!
//! - Arbitrary simple polygons for both pieces and lamina
//! - Mandatory clearance (buffer) between pieces and to the lamina edge
//! - Right-angle rotations for rectangles, 45 degree steps for other shapes
//! - R*-tree occupancy index for fast overlap checks
//! - Parallel fitness evaluation, reproducible with a fixed seed
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lamina_nesting::{Config, Lamina, Nester, PieceSpec};
//!
//! let lamina = Lamina::rectangle(500.0, 300.0).unwrap();
//! let pieces = vec![
//!     PieceSpec::new(&[(0.0, 0.0), (100.0, 0.0), (100.0, 50.0), (0.0, 50.0)], 5),
//!     PieceSpec::new(&[(0.0, 0.0), (60.0, 0.0), (30.0, 40.0)], 3),
//! ];
//!
//! let config = Config::new().with_buffer_size(2.0).with_seed(7);
//! let result = Nester::new(config).solve(&lamina, &pieces).unwrap();
//!
//! println!(
//!     "Placed {} of {} pieces, fitness {:.1}",
//!     result.placed_count(),
//!     result.required,
//!     result.fitness.fitness
//! );
//! ```

pub mod fitness;
pub mod ga_nesting;
pub mod geometry;
pub mod lamina;
pub mod nester;
pub mod placement;
pub mod result;
pub mod spatial_index;
pub mod template;

// Re-exports
pub use fitness::{evaluate_fitness, FitnessBreakdown};
pub use geometry::{Bounds, Geometry};
pub use lamina::Lamina;
pub use nester::Nester;
pub use placement::{PlacedPiece, PlacementContext, Solution};
pub use result::NestingResult;
pub use spatial_index::OccupancyIndex;
pub use template::{build_templates, total_quantity, PieceSpec, PieceTemplate, MAX_TOTAL_PIECES};
pub use lamina_core::{Config, Error, GaProgress, Result, MIN_GENERATIONS, MIN_POPULATION_SIZE};
