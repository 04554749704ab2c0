//! Request and response types of the cutting service.

use lamina_core::Error;
use serde::{Deserialize, Serialize};

fn default_buffer_size() -> f64 {
    5.0
}

fn default_generations() -> i64 {
    10
}

fn default_population_size() -> i64 {
    40
}

/// Request to cut pieces from a single lamina.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuttingRequest {
    /// Lamina outline as [[x, y], ...].
    pub lamina_coords: Vec<[f64; 2]>,

    /// Pieces to cut.
    pub pieces_to_cut: Vec<PieceRequest>,

    /// Clearance around every piece.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: f64,

    /// GA generations (floored to 50 by the optimizer).
    #[serde(default = "default_generations")]
    pub generations: i64,

    /// GA population size (floored to 40 by the optimizer).
    #[serde(default = "default_population_size")]
    pub population_size: i64,

    /// Seed for reproducible runs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Mutation probability (0.0 - 1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutation_rate: Option<f64>,

    /// Generations without improvement before stopping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stop_patience: Option<u32>,

    /// Evaluation threads (0 = auto).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
}

/// One piece shape and how many copies to cut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceRequest {
    /// Piece outline as [[x, y], ...].
    pub shape_coords: Vec<[f64; 2]>,

    /// Number of copies.
    pub quantity: i64,
}

/// Geometry of a placed piece, tagged with its GeoJSON-style type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlacedShape {
    Polygon {
        /// Closed exterior ring.
        coords: Vec<[f64; 2]>,
        template_id: String,
    },
    MultiPolygon {
        /// One closed exterior ring per part.
        coords: Vec<Vec<[f64; 2]>>,
        template_id: String,
    },
}

impl PlacedShape {
    pub fn template_id(&self) -> &str {
        match self {
            PlacedShape::Polygon { template_id, .. } => template_id,
            PlacedShape::MultiPolygon { template_id, .. } => template_id,
        }
    }
}

/// Successful cutting plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CuttingResponse {
    /// Closed exterior ring of the lamina.
    pub lamina: Vec<[f64; 2]>,

    /// Pieces placed on the lamina.
    pub placed: Vec<PlacedShape>,

    /// Requested pieces that could not be placed.
    pub unplaced_count: usize,

    /// Wall-clock seconds spent on the request.
    pub runtime: f64,

    /// Fitness of the returned layout.
    pub fitness: f64,

    /// Generations the optimizer ran.
    pub generations: u32,
}

/// Error body returned for a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// 400 for bad input, 500 for internal failures.
    pub status: u16,

    /// Machine-readable error kind.
    pub kind: String,

    /// Plain-text message.
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(error: &Error) -> Self {
        Self {
            status: error.status_code(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Outcome of a JSON request: either a plan or an error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApiResponse {
    Ok(CuttingResponse),
    Error(ErrorBody),
}

impl ApiResponse {
    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            ApiResponse::Ok(_) => 200,
            ApiResponse::Error(body) => body.status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ApiResponse::Ok(_))
    }

    /// Serializes the response body.
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl From<lamina_core::Result<CuttingResponse>> for ApiResponse {
    fn from(result: lamina_core::Result<CuttingResponse>) -> Self {
        match result {
            Ok(response) => ApiResponse::Ok(response),
            Err(error) => ApiResponse::Error(ErrorBody::from(&error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: CuttingRequest = serde_json::from_str(
            r#"{"lamina_coords": [[0,0],[10,0],[10,10]], "pieces_to_cut": []}"#,
        )
        .unwrap();

        assert_eq!(request.buffer_size, 5.0);
        assert_eq!(request.generations, 10);
        assert_eq!(request.population_size, 40);
        assert!(request.seed.is_none());
        assert!(request.threads.is_none());
    }

    #[test]
    fn test_placed_shape_is_tagged() {
        let shape = PlacedShape::Polygon {
            coords: vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]],
            template_id: "abc123-00".into(),
        };
        let value = serde_json::to_value(&shape).unwrap();

        assert_eq!(value["type"], "Polygon");
        assert_eq!(value["template_id"], "abc123-00");
        assert_eq!(value["coords"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_error_body_from_error() {
        let body = ErrorBody::from(&Error::EmptyRequest);
        assert_eq!(body.status, 400);
        assert_eq!(body.kind, "empty_request");

        let response = ApiResponse::Error(body);
        assert_eq!(response.status(), 400);
        assert!(!response.is_success());

        let json: serde_json::Value =
            serde_json::from_str(&response.to_json(false).unwrap()).unwrap();
        assert_eq!(json["status"], 400);
        assert!(json.get("placed").is_none());
    }
}
