//! Marker-detection service client
//!
//! The service receives one JPEG still per check and answers with the
//! number of corner markers found, their positions, a geometric quality
//! score and its own readiness verdict.

pub mod http;
pub mod still;

pub use http::HttpMarkerDetector;
pub use still::prepare_still;
