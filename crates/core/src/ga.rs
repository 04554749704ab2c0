//! Genetic algorithm framework.
//!
//! [`GaRunner`] drives a generational loop over a [`GaProblem`]:
//!
//! 1. the problem builds an initial population,
//! 2. every individual is evaluated in parallel on a dedicated `rayon` pool,
//! 3. the best individuals are copied unchanged (elitism),
//! 4. the rest of the next generation is bred by roulette-wheel selection,
//!    crossover and probabilistic mutation,
//! 5. the loop stops after the configured number of generations or when the
//!    best fitness stagnates.
//!
//! Evaluation is the only parallel phase. The problem is shared by reference
//! with the workers, so it must not hold mutable state that evaluation
//! touches; breeding runs on the calling thread with the caller's RNG, which
//! makes seeded runs reproducible.

use crate::solver::{default_worker_threads, Config, MIN_GENERATIONS, MIN_POPULATION_SIZE};
use crate::{Error, Result};
use rand::distributions::{Distribution, WeightedIndex};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::{Duration, Instant};

/// Offset added to shifted fitness values so every individual keeps a
/// non-zero chance of being selected.
const SELECTION_EPSILON: f64 = 1e-6;

/// Configuration for the genetic algorithm.
#[derive(Debug, Clone)]
pub struct GaConfig {
    /// Population size.
    pub population_size: usize,
    /// Number of reproduction rounds after the initial population.
    pub max_generations: u32,
    /// Mutation probability per child (0.0 - 1.0).
    pub mutation_rate: f64,
    /// Number of elite individuals to preserve each generation.
    pub elite_count: usize,
    /// Generations without improvement before stopping early.
    pub stagnation_limit: Option<u32>,
    /// Evaluation threads (0 = auto).
    pub threads: usize,
    /// RNG seed used by [`GaRunner::run`] (None = entropy).
    pub seed: Option<u64>,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: MIN_POPULATION_SIZE,
            max_generations: MIN_GENERATIONS,
            mutation_rate: 0.2,
            elite_count: 4,
            stagnation_limit: Some(20),
            threads: default_worker_threads(num_cpus::get()),
            seed: None,
        }
    }
}

impl From<&Config> for GaConfig {
    fn from(config: &Config) -> Self {
        Self {
            population_size: config.population_size,
            max_generations: config.generations,
            mutation_rate: config.mutation_rate,
            elite_count: config.elite_count(),
            stagnation_limit: config.early_stop_patience,
            threads: config.worker_threads(),
            seed: config.seed,
        }
    }
}

impl GaConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the population size.
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size.max(1);
        self
    }

    /// Sets the maximum generations.
    pub fn with_max_generations(mut self, gen: u32) -> Self {
        self.max_generations = gen;
        self
    }

    /// Sets the mutation rate.
    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Sets the elite count.
    pub fn with_elite_count(mut self, count: usize) -> Self {
        self.elite_count = count.max(1);
        self
    }

    /// Sets the stagnation limit.
    pub fn with_stagnation_limit(mut self, limit: Option<u32>) -> Self {
        self.stagnation_limit = limit;
        self
    }

    /// Sets the number of evaluation threads.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Sets the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Problem-specific GA operations.
///
/// Breeding operators live on the problem rather than on the individual
/// because they need the problem's shared context (templates, container).
pub trait GaProblem: Sync {
    /// The individual type for this problem.
    type Individual: Clone + Send + Sync;

    /// Creates an initial population of `size` individuals.
    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Self::Individual>;

    /// Evaluates the fitness of an individual (higher is better).
    ///
    /// Called concurrently from worker threads.
    fn evaluate(&self, individual: &Self::Individual) -> Result<f64>;

    /// Produces one child from two parents.
    fn crossover<R: Rng>(
        &self,
        parent1: &Self::Individual,
        parent2: &Self::Individual,
        rng: &mut R,
    ) -> Self::Individual;

    /// Perturbs an individual. Only called once the mutation roll succeeded.
    fn mutate<R: Rng>(&self, individual: Self::Individual, rng: &mut R) -> Self::Individual;

    /// Called after each generation (for logging).
    fn on_generation(&self, _generation: u32, _best: &Self::Individual, _best_fitness: f64) {}
}

/// Progress information during GA execution.
#[derive(Debug, Clone)]
pub struct GaProgress {
    /// Current generation number (0 = initial population).
    pub generation: u32,
    /// Maximum generations configured.
    pub max_generations: u32,
    /// Best fitness seen so far in the run.
    pub best_fitness: f64,
    /// Best fitness of the current generation.
    pub generation_best: f64,
    /// Average fitness of the current generation.
    pub avg_fitness: f64,
    /// Elapsed time since start.
    pub elapsed: Duration,
}

/// Result of a GA run.
#[derive(Debug, Clone)]
pub struct GaResult<I> {
    /// The best individual seen during the whole run.
    pub best: I,
    /// Fitness of `best`.
    pub best_fitness: f64,
    /// Reproduction rounds completed.
    pub generations: u32,
    /// Total elapsed time.
    pub elapsed: Duration,
    /// Whether the run stopped because the best fitness stagnated.
    pub stopped_early: bool,
    /// Best-seen fitness after each evaluated generation (non-decreasing).
    pub history: Vec<f64>,
}

/// Genetic algorithm runner.
pub struct GaRunner<P: GaProblem> {
    config: GaConfig,
    problem: P,
}

impl<P: GaProblem> GaRunner<P> {
    /// Creates a new GA runner.
    pub fn new(config: GaConfig, problem: P) -> Self {
        Self { config, problem }
    }

    /// Returns the problem being optimized.
    pub fn problem(&self) -> &P {
        &self.problem
    }

    /// Returns the configuration.
    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Runs the genetic algorithm, seeding the RNG from the configuration.
    pub fn run(&self) -> Result<GaResult<P::Individual>> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng(&mut rng)
    }

    /// Runs the genetic algorithm with a progress callback.
    pub fn run_with_progress<F>(&self, progress_callback: F) -> Result<GaResult<P::Individual>>
    where
        F: Fn(GaProgress),
    {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        self.run_with_rng_and_progress(&mut rng, Some(progress_callback))
    }

    /// Runs the genetic algorithm with a specific RNG.
    pub fn run_with_rng<R: Rng>(&self, rng: &mut R) -> Result<GaResult<P::Individual>> {
        self.run_with_rng_and_progress::<R, fn(GaProgress)>(rng, None)
    }

    /// Runs the genetic algorithm with a specific RNG and optional progress callback.
    pub fn run_with_rng_and_progress<R: Rng, F>(
        &self,
        rng: &mut R,
        progress_callback: Option<F>,
    ) -> Result<GaResult<P::Individual>>
    where
        F: Fn(GaProgress),
    {
        let start = Instant::now();
        let population_size = self.config.population_size.max(1);
        let elite_count = self.config.elite_count.clamp(1, population_size);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .thread_name(|i| format!("fitness-worker-{i}"))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build evaluation pool: {e}")))?;

        let mut population = self.problem.initialize_population(population_size, rng);
        if population.is_empty() {
            return Err(Error::Internal("problem produced an empty population".into()));
        }
        let mut fitness = pool.install(|| self.evaluate_all(&population))?;

        let first_best = best_index(&fitness);
        let mut best = population[first_best].clone();
        let mut best_fitness = fitness[first_best];
        let mut history = vec![best_fitness];
        let mut stagnation_count = 0u32;
        let mut generation = 0u32;
        let mut stopped_early = false;

        log::info!(
            "Generation 0: initial population ({}) best fitness = {:.6}",
            population.len(),
            best_fitness
        );
        self.report(&progress_callback, 0, best_fitness, &fitness, start);

        while generation < self.config.max_generations {
            generation += 1;

            // Elitism: carry the best individuals over with their known fitness
            let mut ranked: Vec<usize> = (0..population.len()).collect();
            ranked.sort_by(|&a, &b| fitness[b].total_cmp(&fitness[a]));

            let mut next_population = Vec::with_capacity(population_size);
            let mut next_fitness = Vec::with_capacity(population_size);
            for &idx in ranked.iter().take(elite_count) {
                next_population.push(population[idx].clone());
                next_fitness.push(fitness[idx]);
            }

            // Breed the remainder on this thread so the RNG sequence stays deterministic
            let selector = RouletteWheel::new(&fitness);
            let mut children = Vec::with_capacity(population_size - next_population.len());
            while next_population.len() + children.len() < population_size {
                let parent1 = &population[selector.select(rng)];
                let parent2 = &population[selector.select(rng)];

                let mut child = self.problem.crossover(parent1, parent2, rng);
                if rng.gen::<f64>() < self.config.mutation_rate {
                    child = self.problem.mutate(child, rng);
                }
                children.push(child);
            }

            let child_fitness = pool.install(|| self.evaluate_all(&children))?;
            next_population.extend(children);
            next_fitness.extend(child_fitness);

            population = next_population;
            fitness = next_fitness;

            let gen_best = best_index(&fitness);
            let gen_best_fitness = fitness[gen_best];
            if gen_best_fitness > best_fitness {
                best = population[gen_best].clone();
                best_fitness = gen_best_fitness;
                stagnation_count = 0;
            } else {
                stagnation_count += 1;
            }
            history.push(best_fitness);

            log::info!(
                "Generation {}: generation best = {:.6}, best = {:.6}",
                generation,
                gen_best_fitness,
                best_fitness
            );
            self.problem.on_generation(generation, &best, best_fitness);
            self.report(&progress_callback, generation, best_fitness, &fitness, start);

            if let Some(limit) = self.config.stagnation_limit {
                if limit > 0 && stagnation_count >= limit {
                    log::info!(
                        "No improvement for {} generations, stopping at generation {}",
                        limit,
                        generation
                    );
                    stopped_early = true;
                    break;
                }
            }
        }

        Ok(GaResult {
            best,
            best_fitness,
            generations: generation,
            elapsed: start.elapsed(),
            stopped_early,
            history,
        })
    }

    /// Evaluates every individual in parallel, failing fast on the first error.
    fn evaluate_all(&self, individuals: &[P::Individual]) -> Result<Vec<f64>> {
        individuals
            .par_iter()
            .map(|individual| self.evaluate_guarded(individual))
            .collect()
    }

    /// Evaluates one individual, turning panics and non-finite scores into errors.
    fn evaluate_guarded(&self, individual: &P::Individual) -> Result<f64> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.problem.evaluate(individual)));
        match outcome {
            Ok(Ok(value)) if value.is_finite() => Ok(value),
            Ok(Ok(value)) => Err(Error::WorkerFailure(format!(
                "non-finite fitness value {value}"
            ))),
            Ok(Err(Error::WorkerFailure(msg))) => Err(Error::WorkerFailure(msg)),
            Ok(Err(other)) => Err(Error::WorkerFailure(other.to_string())),
            Err(payload) => Err(Error::WorkerFailure(panic_message(payload.as_ref()))),
        }
    }

    fn report<F>(
        &self,
        callback: &Option<F>,
        generation: u32,
        best_fitness: f64,
        fitness: &[f64],
        start: Instant,
    ) where
        F: Fn(GaProgress),
    {
        let Some(callback) = callback else {
            return;
        };
        let generation_best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let avg_fitness = fitness.iter().sum::<f64>() / fitness.len().max(1) as f64;
        log::debug!(
            "Generation {}: average fitness = {:.4}",
            generation,
            avg_fitness
        );
        callback(GaProgress {
            generation,
            max_generations: self.config.max_generations,
            best_fitness,
            generation_best,
            avg_fitness,
            elapsed: start.elapsed(),
        });
    }
}

/// Fitness-proportionate selection over fitness values shifted to be positive.
struct RouletteWheel {
    distribution: Option<WeightedIndex<f64>>,
    len: usize,
}

impl RouletteWheel {
    fn new(fitness: &[f64]) -> Self {
        let min = fitness.iter().copied().fold(f64::INFINITY, f64::min);
        let weights: Vec<f64> = fitness
            .iter()
            .map(|&f| f - min + SELECTION_EPSILON)
            .collect();
        Self {
            distribution: WeightedIndex::new(&weights).ok(),
            len: fitness.len(),
        }
    }

    fn select<R: Rng>(&self, rng: &mut R) -> usize {
        match &self.distribution {
            Some(distribution) => distribution.sample(rng),
            None => rng.gen_range(0..self.len),
        }
    }
}

/// Index of the highest fitness (first one on ties).
fn best_index(fitness: &[f64]) -> usize {
    let mut best = 0;
    for (i, &value) in fitness.iter().enumerate() {
        if value > fitness[best] {
            best = i;
        }
    }
    best
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "evaluation panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Maximizes -(x^2); optimum at x = 0.
    struct Parabola;

    impl GaProblem for Parabola {
        type Individual = f64;

        fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<f64> {
            (0..size).map(|_| rng.gen_range(-100.0..100.0)).collect()
        }

        fn evaluate(&self, individual: &f64) -> Result<f64> {
            Ok(-individual * individual)
        }

        fn crossover<R: Rng>(&self, parent1: &f64, parent2: &f64, rng: &mut R) -> f64 {
            let t: f64 = rng.gen();
            parent1 * t + parent2 * (1.0 - t)
        }

        fn mutate<R: Rng>(&self, individual: f64, rng: &mut R) -> f64 {
            individual + rng.gen_range(-5.0..5.0)
        }
    }

    fn small_config() -> GaConfig {
        GaConfig::new()
            .with_population_size(30)
            .with_max_generations(40)
            .with_elite_count(2)
            .with_mutation_rate(0.3)
            .with_threads(2)
            .with_stagnation_limit(None)
    }

    #[test]
    fn test_ga_basic() {
        let runner = GaRunner::new(small_config().with_seed(7), Parabola);
        let result = runner.run().unwrap();

        assert!(result.best.abs() < 5.0);
        assert_eq!(result.generations, 40);
        assert_eq!(result.history.len(), 41);
    }

    #[test]
    fn test_history_never_decreases() {
        let runner = GaRunner::new(small_config().with_seed(11), Parabola);
        let result = runner.run().unwrap();

        for pair in result.history.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        assert_eq!(*result.history.last().unwrap(), result.best_fitness);
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = GaRunner::new(small_config().with_seed(3), Parabola).run().unwrap();
        let b = GaRunner::new(small_config().with_seed(3), Parabola).run().unwrap();

        assert_eq!(a.best, b.best);
        assert_eq!(a.history, b.history);
    }

    struct Flat;

    impl GaProblem for Flat {
        type Individual = u8;

        fn initialize_population<R: Rng>(&self, size: usize, _rng: &mut R) -> Vec<u8> {
            vec![0; size]
        }

        fn evaluate(&self, _individual: &u8) -> Result<f64> {
            Ok(-10000.0)
        }

        fn crossover<R: Rng>(&self, parent1: &u8, _parent2: &u8, _rng: &mut R) -> u8 {
            *parent1
        }

        fn mutate<R: Rng>(&self, individual: u8, _rng: &mut R) -> u8 {
            individual
        }
    }

    #[test]
    fn test_stagnation_stops_early() {
        let config = small_config().with_stagnation_limit(Some(5)).with_seed(1);
        let result = GaRunner::new(config, Flat).run().unwrap();

        assert!(result.stopped_early);
        assert_eq!(result.generations, 5);
        assert_eq!(result.best_fitness, -10000.0);
    }

    struct Exploding {
        calls: AtomicUsize,
    }

    impl GaProblem for Exploding {
        type Individual = u8;

        fn initialize_population<R: Rng>(&self, size: usize, _rng: &mut R) -> Vec<u8> {
            (0..size).map(|i| i as u8).collect()
        }

        fn evaluate(&self, individual: &u8) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if *individual == 3 {
                panic!("geometry blew up");
            }
            Ok(*individual as f64)
        }

        fn crossover<R: Rng>(&self, parent1: &u8, _parent2: &u8, _rng: &mut R) -> u8 {
            *parent1
        }

        fn mutate<R: Rng>(&self, individual: u8, _rng: &mut R) -> u8 {
            individual
        }
    }

    #[test]
    fn test_worker_panic_aborts_run() {
        let problem = Exploding {
            calls: AtomicUsize::new(0),
        };
        let config = small_config().with_population_size(8).with_seed(5);
        let err = GaRunner::new(config, problem).run().unwrap_err();

        match err {
            Error::WorkerFailure(msg) => assert!(msg.contains("geometry blew up")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_roulette_prefers_fitter() {
        let wheel = RouletteWheel::new(&[-10000.0, -10000.0, 500.0]);
        let mut rng = StdRng::seed_from_u64(42);
        let picks_best = (0..200).filter(|_| wheel.select(&mut rng) == 2).count();
        assert!(picks_best > 190);
    }

    #[test]
    fn test_roulette_uniform_when_equal() {
        let wheel = RouletteWheel::new(&[-10000.0; 4]);
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = [false; 4];
        for _ in 0..200 {
            seen[wheel.select(&mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
