//! Genetic algorithm based nesting.
//!
//! Individuals are complete layouts ([`Solution`]s). Crossover keeps a prefix
//! of one parent and re-places the other parent's remaining pieces with the
//! placement engine; mutation either rearranges a couple of pieces or tries to
//! fit one that is still missing.

use crate::fitness::{evaluate_fitness, FitnessBreakdown};
use crate::lamina::Lamina;
use crate::placement::{PlacementContext, Solution};
use crate::template::PieceTemplate;
use lamina_core::ga::{GaConfig, GaProblem, GaProgress, GaResult, GaRunner};
use lamina_core::{Error, Result};
use rand::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// Problem definition for GA-based nesting on one lamina.
pub struct NestingProblem {
    lamina: Lamina,
    /// Every required instance, largest area first.
    templates: Vec<Arc<PieceTemplate>>,
    buffer: f64,
}

impl NestingProblem {
    /// Creates a new nesting problem.
    pub fn new(lamina: Lamina, mut templates: Vec<Arc<PieceTemplate>>, buffer: f64) -> Self {
        templates.sort_by(|a, b| b.area().total_cmp(&a.area()));
        Self {
            lamina,
            templates,
            buffer,
        }
    }

    pub fn lamina(&self) -> &Lamina {
        &self.lamina
    }

    /// Templates in largest-area-first order.
    pub fn templates(&self) -> &[Arc<PieceTemplate>] {
        &self.templates
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    /// Total number of pieces requested.
    pub fn required(&self) -> usize {
        self.templates.len()
    }

    /// Scores a layout and returns every component of the score.
    pub fn fitness_breakdown(&self, solution: &Solution) -> FitnessBreakdown {
        evaluate_fitness(solution, self.lamina.area(), self.buffer, self.required())
    }

    fn context(&self, pieces: Solution) -> PlacementContext<'_> {
        PlacementContext::with_pieces(&self.lamina, self.buffer, pieces)
    }

    /// Removes one or two random pieces and places their templates again in
    /// random order.
    fn rearrange<R: Rng>(&self, individual: Solution, rng: &mut R) -> Solution {
        let count = [1usize, 2].choose(rng).copied().unwrap_or(1).min(individual.len());
        if count == 0 {
            return individual;
        }

        let removed: HashSet<usize> = rand::seq::index::sample(rng, individual.len(), count)
            .into_iter()
            .collect();
        let mut to_place = Vec::with_capacity(count);
        let mut remaining = Vec::with_capacity(individual.len() - count);
        for (i, piece) in individual.into_iter().enumerate() {
            if removed.contains(&i) {
                to_place.push(Arc::clone(piece.template()));
            } else {
                remaining.push(piece);
            }
        }
        to_place.shuffle(rng);

        let mut ctx = self.context(remaining);
        ctx.place_greedily(to_place.iter());
        ctx.into_pieces()
    }

    /// Tries to add one randomly chosen template that is not placed yet.
    fn add_unplaced<R: Rng>(&self, individual: Solution, rng: &mut R) -> Solution {
        let placed: HashSet<&str> = individual.iter().map(|p| p.template_id()).collect();
        let unplaced: Vec<&Arc<PieceTemplate>> = self
            .templates
            .iter()
            .filter(|t| !placed.contains(t.id()))
            .collect();

        let Some(&template) = unplaced.choose(rng) else {
            return individual;
        };
        let template = Arc::clone(template);

        let mut ctx = self.context(individual);
        ctx.place(&template);
        ctx.into_pieces()
    }
}

impl GaProblem for NestingProblem {
    type Individual = Solution;

    fn initialize_population<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<Solution> {
        (0..size)
            .map(|_| {
                let mut order = self.templates.clone();
                order.shuffle(rng);

                let mut ctx = PlacementContext::new(&self.lamina, self.buffer);
                ctx.place_greedily(order.iter());
                ctx.into_pieces()
            })
            .collect()
    }

    fn evaluate(&self, individual: &Solution) -> Result<f64> {
        let fitness = self.fitness_breakdown(individual).fitness;
        if fitness.is_finite() {
            Ok(fitness)
        } else {
            Err(Error::WorkerFailure(format!(
                "fitness of a {}-piece layout is not finite",
                individual.len()
            )))
        }
    }

    fn crossover<R: Rng>(&self, parent1: &Solution, parent2: &Solution, rng: &mut R) -> Solution {
        if parent1.is_empty() || parent2.is_empty() {
            return Vec::new();
        }

        let split = rng.gen_range(1..=parent1.len().min(parent2.len()));
        let child: Solution = parent1[..split].to_vec();
        let inherited: HashSet<&str> = child.iter().map(|p| p.template_id()).collect();

        let mut from_parent2: Vec<Arc<PieceTemplate>> = parent2
            .iter()
            .filter(|p| !inherited.contains(p.template_id()))
            .map(|p| Arc::clone(p.template()))
            .collect();
        from_parent2.sort_by(|a, b| b.area().total_cmp(&a.area()));

        // Pieces that no longer fit are dropped from the child
        let mut ctx = self.context(child);
        ctx.place_greedily(from_parent2.iter());
        ctx.into_pieces()
    }

    fn mutate<R: Rng>(&self, individual: Solution, rng: &mut R) -> Solution {
        if rng.gen_bool(0.5) {
            self.rearrange(individual, rng)
        } else {
            self.add_unplaced(individual, rng)
        }
    }

    fn on_generation(&self, generation: u32, best: &Solution, best_fitness: f64) {
        log::debug!(
            "GA generation {}: fitness={:.4}, placed={}/{}",
            generation,
            best_fitness,
            best.len(),
            self.required()
        );
    }
}

/// Runs GA-based nesting and returns the best layout seen.
pub fn run_ga_nesting(problem: NestingProblem, ga_config: GaConfig) -> Result<GaResult<Solution>> {
    GaRunner::new(ga_config, problem).run()
}

/// Runs GA-based nesting, reporting progress after every generation.
pub fn run_ga_nesting_with_progress<F>(
    problem: NestingProblem,
    ga_config: GaConfig,
    progress: F,
) -> Result<GaResult<Solution>>
where
    F: Fn(GaProgress),
{
    GaRunner::new(ga_config, problem).run_with_progress(progress)
}
