//! Binary gender classification over acoustic feature vectors.
//!
//! # Architecture
//!
//! 1. [`GenderModel`]: opaque predict capability, loaded once at startup
//! 2. [`DenseModel`]: feed-forward implementation backed by a JSON weights
//!    artifact
//! 3. [`DecisionEngine`]: feature vector -> [`Prediction`] (label, both
//!    probabilities, confidence tier, latency)
//!
//! The engine is handed its model explicitly at construction; when loading
//! fails at startup the caller keeps no engine and fails every request fast
//! with [`ClassifyError::ModelUnavailable`] instead of retrying per request.

mod decision;
mod dense;
mod error;
mod model;

pub use decision::{Confidence, DecisionEngine, Gender, Prediction};
pub use dense::{Activation, DenseLayer, DenseModel, DenseSpec};
pub use error::ClassifyError;
pub use model::GenderModel;
