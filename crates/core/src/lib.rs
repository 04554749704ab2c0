//! # Lamina Core
//!
//! Shared building blocks for the lamina-nest cutting optimizer.
//!
//! ## Core Components
//!
//! - **Errors**: [`Error`], [`Result`] - one error type for validation and optimization
//! - **Configuration**: [`Config`] - buffer, population, generations, seed, threads
//! - **GA framework**: [`GaRunner`], [`GaProblem`] - generational loop with
//!   parallel fitness evaluation, elitism and roulette-wheel selection
//! - **Robust predicates**: [`robust`] - orientation and simplicity tests used
//!   to validate input polygons
//!
//! ## Configuration
//!
//! ```rust
//! use lamina_core::Config;
//!
//! let config = Config::new()
//!     .with_buffer_size(2.0)
//!     .with_population_size(60)
//!     .with_generations(80)
//!     .with_seed(42);
//!
//! assert_eq!(config.effective().population_size, 60);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization of [`Config`]

pub mod error;
pub mod ga;
pub mod robust;
pub mod solver;

// Re-exports
pub use error::{Error, Result};
pub use ga::{GaConfig, GaProblem, GaProgress, GaResult, GaRunner};
pub use solver::{Config, MIN_GENERATIONS, MIN_POPULATION_SIZE};
