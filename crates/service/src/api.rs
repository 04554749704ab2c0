//! Validation and the `optimize` operation.

use crate::types::*;
use lamina_core::robust::{is_simple_polygon, signed_area};
use lamina_core::{Config, Error, Result};
use lamina_nesting::{total_quantity, Geometry, Lamina, Nester, NestingResult, PieceSpec};
use std::time::Instant;

/// A request that passed validation, ready for the optimizer.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub lamina: Lamina,
    pub pieces: Vec<PieceSpec>,
    pub config: Config,
}

impl ValidatedRequest {
    /// Total number of piece instances requested.
    pub fn total_quantity(&self) -> usize {
        self.pieces.iter().map(|p| p.quantity).sum()
    }
}

/// Decodes a JSON request body.
pub fn parse_request(body: &str) -> Result<CuttingRequest> {
    serde_json::from_str(body).map_err(|e| Error::InvalidRequest(format!("malformed JSON: {e}")))
}

/// Checks every field of `request` and converts it into optimizer inputs.
pub fn validate_request(request: &CuttingRequest) -> Result<ValidatedRequest> {
    let lamina = Lamina::new(&clean_ring(&request.lamina_coords, "lamina")?)?;

    let mut pieces = Vec::with_capacity(request.pieces_to_cut.len());
    for (i, piece) in request.pieces_to_cut.iter().enumerate() {
        let label = format!("piece {i}");
        let ring = clean_ring(&piece.shape_coords, &label)?;
        let quantity = usize::try_from(piece.quantity).map_err(|_| {
            Error::InvalidRequest(format!(
                "{label}: quantity must be >= 1, got {}",
                piece.quantity
            ))
        })?;
        pieces.push(PieceSpec::new(&ring, quantity));
    }

    if total_quantity(&pieces)? == 0 {
        return Err(Error::EmptyRequest);
    }
    if let Some(i) = pieces.iter().position(|p| p.quantity == 0) {
        return Err(Error::InvalidRequest(format!(
            "piece {i}: quantity must be >= 1, got 0"
        )));
    }

    Ok(ValidatedRequest {
        lamina,
        pieces,
        config: build_config(request)?,
    })
}

/// Validates `request`, runs the optimizer and shapes the response.
pub fn optimize(request: &CuttingRequest) -> Result<CuttingResponse> {
    let start = Instant::now();
    let validated = validate_request(request)?;

    log::info!(
        "Cutting request: {} shapes, {} pieces, lamina area {:.2}",
        validated.pieces.len(),
        validated.total_quantity(),
        validated.lamina.area()
    );

    let result = Nester::new(validated.config).solve(&validated.lamina, &validated.pieces)?;
    Ok(to_response(&validated.lamina, &result, start.elapsed().as_secs_f64()))
}

/// Decodes, optimizes and maps any error to an [`ErrorBody`].
pub fn optimize_json(body: &str) -> ApiResponse {
    let response = ApiResponse::from(parse_request(body).and_then(|request| optimize(&request)));
    if let ApiResponse::Error(error) = &response {
        if error.status >= 500 {
            log::error!("Request failed: {}", error.message);
        } else {
            log::warn!("Rejected request: {}", error.message);
        }
    }
    response
}

fn build_config(request: &CuttingRequest) -> Result<Config> {
    let buffer = request.buffer_size;
    if !buffer.is_finite() || buffer < 0.0 {
        return Err(Error::InvalidRequest(format!(
            "buffer_size must be a finite value >= 0, got {buffer}"
        )));
    }
    if request.generations < 1 {
        return Err(Error::InvalidRequest(format!(
            "generations must be >= 1, got {}",
            request.generations
        )));
    }
    if request.population_size < 1 {
        return Err(Error::InvalidRequest(format!(
            "population_size must be >= 1, got {}",
            request.population_size
        )));
    }
    let generations = u32::try_from(request.generations)
        .map_err(|_| Error::InvalidRequest("generations too large".into()))?;
    let population = usize::try_from(request.population_size)
        .map_err(|_| Error::InvalidRequest("population_size too large".into()))?;

    let mut config = Config::new()
        .with_buffer_size(buffer)
        .with_generations(generations)
        .with_population_size(population);

    if let Some(rate) = request.mutation_rate {
        if !(0.0..=1.0).contains(&rate) {
            return Err(Error::InvalidRequest(format!(
                "mutation_rate must be within [0, 1], got {rate}"
            )));
        }
        config = config.with_mutation_rate(rate);
    }
    if let Some(patience) = request.early_stop_patience {
        config = config.with_early_stop_patience(Some(patience));
    }
    if let Some(threads) = request.threads {
        config = config.with_threads(threads);
    }
    if let Some(seed) = request.seed {
        config = config.with_seed(seed);
    }
    Ok(config)
}

/// Checks a coordinate list and returns it as an open ring without repeated vertices.
fn clean_ring(coords: &[[f64; 2]], label: &str) -> Result<Vec<(f64, f64)>> {
    if coords.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "{label}: at least 3 points required, got {}",
            coords.len()
        )));
    }
    if coords.iter().flatten().any(|v| !v.is_finite()) {
        return Err(Error::InvalidGeometry(format!("{label}: coordinates must be finite")));
    }

    let mut ring: Vec<(f64, f64)> = Vec::with_capacity(coords.len());
    for &[x, y] in coords {
        if ring.last() != Some(&(x, y)) {
            ring.push((x, y));
        }
    }
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }

    if ring.len() < 3 {
        return Err(Error::InvalidGeometry(format!(
            "{label}: fewer than 3 distinct vertices"
        )));
    }
    if signed_area(&ring) == 0.0 {
        return Err(Error::InvalidGeometry(format!("{label}: polygon has zero area")));
    }
    if !is_simple_polygon(&ring) {
        return Err(Error::InvalidGeometry(format!("{label}: polygon is self-intersecting")));
    }
    Ok(ring)
}

fn to_response(lamina: &Lamina, result: &NestingResult, runtime: f64) -> CuttingResponse {
    let placed = result
        .placed
        .iter()
        .map(|piece| {
            let template_id = piece.template_id().to_string();
            let mut rings = piece.geometry().exterior_rings();
            match piece.geometry().as_ref() {
                Geometry::Polygon(_) if rings.len() == 1 => PlacedShape::Polygon {
                    coords: rings.remove(0),
                    template_id,
                },
                _ => PlacedShape::MultiPolygon {
                    coords: rings,
                    template_id,
                },
            }
        })
        .collect();

    CuttingResponse {
        lamina: lamina.exterior_ring(),
        placed,
        unplaced_count: result.unplaced_count,
        runtime,
        fitness: result.fitness.fitness,
        generations: result.generations,
    }
}
