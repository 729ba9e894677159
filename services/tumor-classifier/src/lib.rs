//! Brain-MRI tumour classifier service.
//!
//! Pipeline per request: multipart upload -> decode -> [`preprocess`] ->
//! [`inference`] against the model held by [`loader::ModelSlot`] -> JSON.

pub mod artifact;
pub mod error;
pub mod inference;
pub mod labels;
pub mod loader;
pub mod metrics;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;
pub mod routes;

pub use error::{ApiError, ArtifactError, ModelError};
pub use inference::{InferenceBackend, Prediction};
pub use labels::TumorClass;
pub use loader::{fetch_and_load, ModelPhase, ModelSlot};
pub use routes::{router, AppState};
