//! Nesting solver.

use crate::fitness::evaluate_fitness;
use crate::ga_nesting::{run_ga_nesting, run_ga_nesting_with_progress, NestingProblem};
use crate::lamina::Lamina;
use crate::placement::Solution;
use crate::result::NestingResult;
use crate::template::{build_templates, total_quantity, PieceSpec};
use lamina_core::ga::{GaConfig, GaProgress, GaResult};
use lamina_core::{Config, Error, Result};

/// Places pieces on a lamina with the genetic algorithm.
pub struct Nester {
    config: Config,
}

impl Nester {
    /// Creates a new nester with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Creates a nester with default configuration.
    pub fn default_config() -> Self {
        Self::new(Config::default())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Finds the best layout of `pieces` on `lamina`.
    pub fn solve(&self, lamina: &Lamina, pieces: &[PieceSpec]) -> Result<NestingResult> {
        self.solve_inner(lamina, pieces, None::<fn(GaProgress)>)
    }

    /// Like [`Nester::solve`], calling `progress` after every generation.
    pub fn solve_with_progress<F>(
        &self,
        lamina: &Lamina,
        pieces: &[PieceSpec],
        progress: F,
    ) -> Result<NestingResult>
    where
        F: Fn(GaProgress),
    {
        self.solve_inner(lamina, pieces, Some(progress))
    }

    fn solve_inner<F>(
        &self,
        lamina: &Lamina,
        pieces: &[PieceSpec],
        progress: Option<F>,
    ) -> Result<NestingResult>
    where
        F: Fn(GaProgress),
    {
        let buffer = self.config.buffer_size;
        if !buffer.is_finite() || buffer < 0.0 {
            return Err(Error::InvalidRequest(format!(
                "buffer_size must be a finite value >= 0, got {buffer}"
            )));
        }

        if total_quantity(pieces)? == 0 {
            return Err(Error::EmptyRequest);
        }
        let templates = build_templates(pieces);
        let required = templates.len();

        let config = self.config.effective();
        let ga_config = GaConfig::from(&config);
        log::info!(
            "Nesting {} pieces on a {:.1}x{:.1} lamina: buffer {}, population {}, generations {}, {} threads",
            required,
            lamina.bounds().width(),
            lamina.bounds().height(),
            buffer,
            ga_config.population_size,
            ga_config.max_generations,
            ga_config.threads
        );

        let problem = NestingProblem::new(lamina.clone(), templates, buffer);
        let ga_result: GaResult<Solution> = match progress {
            Some(callback) => run_ga_nesting_with_progress(problem, ga_config, callback)?,
            None => run_ga_nesting(problem, ga_config)?,
        };

        let placed = ga_result.best;
        let fitness = evaluate_fitness(&placed, lamina.area(), buffer, required);
        let unplaced_count = required - placed.len();

        log::info!(
            "Nesting finished after {} generations in {:.2?}: placed {}/{}, fitness {:.4}",
            ga_result.generations,
            ga_result.elapsed,
            placed.len(),
            required,
            fitness.fitness
        );

        Ok(NestingResult {
            placed,
            unplaced_count,
            required,
            fitness,
            generations: ga_result.generations,
            stopped_early: ga_result.stopped_early,
            history: ga_result.history,
            elapsed: ga_result.elapsed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::MAX_TOTAL_PIECES;

    fn square(size: f64, quantity: usize) -> PieceSpec {
        PieceSpec::new(&[(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)], quantity)
    }

    fn quick_config() -> Config {
        Config::new()
            .with_buffer_size(0.0)
            .with_generations(1)
            .with_population_size(1)
            .with_early_stop_patience(Some(3))
            .with_threads(2)
            .with_seed(9)
    }

    #[test]
    fn test_empty_request() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let nester = Nester::new(quick_config());
        assert!(matches!(nester.solve(&lamina, &[]), Err(Error::EmptyRequest)));
        assert!(matches!(
            nester.solve(&lamina, &[square(10.0, 0)]),
            Err(Error::EmptyRequest)
        ));
    }

    #[test]
    fn test_oversized_quantity_rejected() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let nester = Nester::new(quick_config());
        assert!(matches!(
            nester.solve(
                &lamina,
                &[square(10.0, usize::MAX / 2), square(5.0, usize::MAX / 2 + 2)]
            ),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            nester.solve(&lamina, &[square(10.0, MAX_TOTAL_PIECES + 1)]),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_negative_buffer_rejected() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let nester = Nester::new(quick_config().with_buffer_size(-1.0));
        assert!(matches!(
            nester.solve(&lamina, &[square(10.0, 1)]),
            Err(Error::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_simple_nesting() {
        let lamina = Lamina::rectangle(100.0, 100.0).unwrap();
        let result = Nester::new(quick_config())
            .solve(&lamina, &[square(20.0, 3)])
            .unwrap();

        assert_eq!(result.placed_count(), 3);
        assert!(result.is_complete());
        assert_eq!(result.required, 3);
        assert!(result.fitness.fitness > 0.0);
        assert!(result.utilization(lamina.area()) > 0.11);
        assert_eq!(result.history.len() as u32, result.generations + 1);
    }

    #[test]
    fn test_progress_callback() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let lamina = Lamina::rectangle(50.0, 50.0).unwrap();
        let calls = AtomicU32::new(0);
        let result = Nester::new(quick_config())
            .solve_with_progress(&lamina, &[square(10.0, 2)], |_| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), result.generations + 1);
    }
}
