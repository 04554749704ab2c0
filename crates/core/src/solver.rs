//! Solver configuration.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest population the optimizer will run with.
pub const MIN_POPULATION_SIZE: usize = 40;

/// Smallest number of generations the optimizer will run for.
pub const MIN_GENERATIONS: u32 = 50;

/// Upper bound on the default number of evaluation threads.
pub const MAX_DEFAULT_THREADS: usize = 6;

/// Configuration for a nesting run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// Mandatory clearance around every placed piece.
    pub buffer_size: f64,

    /// Population size (floored to [`MIN_POPULATION_SIZE`]).
    pub population_size: usize,

    /// Number of generations (floored to [`MIN_GENERATIONS`]).
    pub generations: u32,

    /// Probability that a child is mutated (0.0 - 1.0).
    pub mutation_rate: f64,

    /// Fraction of the population carried over unchanged (at least one individual).
    pub elite_fraction: f64,

    /// Generations without improvement before stopping early (None = never).
    pub early_stop_patience: Option<u32>,

    /// Number of evaluation threads (0 = auto).
    pub threads: usize,

    /// Seed for the random number generator (None = from entropy).
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buffer_size: 5.0,
            population_size: MIN_POPULATION_SIZE,
            generations: 10,
            mutation_rate: 0.2,
            elite_fraction: 0.1,
            early_stop_patience: Some(20),
            threads: 0,
            seed: None,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the clearance between pieces.
    pub fn with_buffer_size(mut self, buffer: f64) -> Self {
        self.buffer_size = buffer;
        self
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    /// Sets the number of generations.
    pub fn with_generations(mut self, generations: u32) -> Self {
        self.generations = generations;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite fraction.
    pub fn with_elite_fraction(mut self, fraction: f64) -> Self {
        self.elite_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Sets the early stopping patience.
    pub fn with_early_stop_patience(mut self, patience: Option<u32>) -> Self {
        self.early_stop_patience = patience;
        self
    }

    /// Sets the number of evaluation threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns the configuration actually used for a run.
    ///
    /// Population size and generation count are raised to their minimums so
    /// every run gets a baseline amount of search effort.
    pub fn effective(&self) -> Self {
        let mut config = self.clone();
        if config.population_size < MIN_POPULATION_SIZE {
            log::warn!(
                "population_size {} raised to minimum {}",
                config.population_size,
                MIN_POPULATION_SIZE
            );
            config.population_size = MIN_POPULATION_SIZE;
        }
        if config.generations < MIN_GENERATIONS {
            log::warn!(
                "generations {} raised to minimum {}",
                config.generations,
                MIN_GENERATIONS
            );
            config.generations = MIN_GENERATIONS;
        }
        config.mutation_rate = config.mutation_rate.clamp(0.0, 1.0);
        config.elite_fraction = config.elite_fraction.clamp(0.0, 1.0);
        config
    }

    /// Number of individuals preserved by elitism.
    pub fn elite_count(&self) -> usize {
        ((self.population_size as f64 * self.elite_fraction).floor() as usize)
            .max(1)
            .min(self.population_size.max(1))
    }

    /// Number of threads used for parallel fitness evaluation.
    pub fn worker_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            default_worker_threads(num_cpus::get())
        }
    }
}

/// Default pool size: one core is left to the orchestrating thread, capped.
pub fn default_worker_threads(cores: usize) -> usize {
    cores.saturating_sub(1).clamp(1, MAX_DEFAULT_THREADS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_request_defaults() {
        let config = Config::default();
        assert_eq!(config.buffer_size, 5.0);
        assert_eq!(config.population_size, 40);
        assert_eq!(config.generations, 10);
        assert_eq!(config.early_stop_patience, Some(20));
    }

    #[test]
    fn test_effective_floors_search_effort() {
        let config = Config::new().with_population_size(1).with_generations(1);
        let effective = config.effective();
        assert_eq!(effective.population_size, MIN_POPULATION_SIZE);
        assert_eq!(effective.generations, MIN_GENERATIONS);

        let large = Config::new().with_population_size(120).with_generations(300);
        let effective = large.effective();
        assert_eq!(effective.population_size, 120);
        assert_eq!(effective.generations, 300);
    }

    #[test]
    fn test_elite_count_at_least_one() {
        assert_eq!(Config::new().with_population_size(40).elite_count(), 4);
        assert_eq!(Config::new().with_population_size(5).elite_count(), 1);
        assert_eq!(
            Config::new()
                .with_population_size(40)
                .with_elite_fraction(0.0)
                .elite_count(),
            1
        );
    }

    #[test]
    fn test_default_worker_threads() {
        assert_eq!(default_worker_threads(1), 1);
        assert_eq!(default_worker_threads(2), 1);
        assert_eq!(default_worker_threads(4), 3);
        assert_eq!(default_worker_threads(32), MAX_DEFAULT_THREADS);
        assert_eq!(Config::new().with_threads(3).worker_threads(), 3);
    }
}
