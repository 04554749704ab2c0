//! # Lamina Service
//!
//! JSON surface of the lamina-nest optimizer: request and response types,
//! input validation and the `optimize` operation used by the `lamina-nest`
//! binary.
//!
//! ```rust,no_run
//! use lamina_service::optimize_json;
//!
//! let body = r#"{
//!     "lamina_coords": [[0, 0], [200, 0], [200, 100], [0, 100]],
//!     "pieces_to_cut": [{"shape_coords": [[0, 0], [40, 0], [40, 30], [0, 30]], "quantity": 4}],
//!     "buffer_size": 2.0
//! }"#;
//!
//! let response = optimize_json(body);
//! println!("{}", response.to_json(true).unwrap());
//! ```

pub mod api;
pub mod types;

pub use api::{optimize, optimize_json, parse_request, validate_request, ValidatedRequest};
pub use types::{ApiResponse, CuttingRequest, CuttingResponse, ErrorBody, PieceRequest, PlacedShape};
