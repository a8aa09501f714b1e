//! Turning a raw classifier score into a stable user-facing decision.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::error::ClassifyError;
use crate::model::GenderModel;

/// Binary gender label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

/// Coarse confidence bucket derived from the winning class probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Tier boundaries are policy, not per-request tunables:
    /// score > 0.8 is High, score > 0.6 is Medium, anything else Low.
    pub fn from_score(score: f32) -> Self {
        if score > 0.8 {
            Confidence::High
        } else if score > 0.6 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

/// Per-request classification result, serialized verbatim as the response
/// payload. Probabilities are raw floats; percentage formatting is the
/// caller's concern.
#[derive(Debug, Clone, Serialize)]
pub struct Prediction {
    pub gender: Gender,
    pub male_probability: f32,
    pub female_probability: f32,
    pub confidence: Confidence,
    pub confidence_score: f32,
    /// Wall-clock seconds from the start of request handling, rounded to
    /// two decimal places.
    pub processing_time: f64,
}

/// Consumes feature vectors through a pretrained classifier.
///
/// Holds an explicitly constructed, immutable model handle; "model
/// unavailable" is a state of the caller (no engine), never of an engine
/// instance.
pub struct DecisionEngine {
    model: Arc<dyn GenderModel>,
}

impl DecisionEngine {
    pub fn new(model: Arc<dyn GenderModel>) -> Self {
        Self { model }
    }

    /// Feature vector width the underlying classifier expects.
    pub fn input_width(&self) -> usize {
        self.model.input_width()
    }

    /// Classifies one feature vector.
    ///
    /// `started` marks the beginning of the full request handling (including
    /// decode), so `processing_time` reflects end-to-end latency.
    ///
    /// The vector width is checked before inference; a disagreement with the
    /// classifier is [`ClassifyError::ShapeMismatch`] and indicates
    /// extractor/model version skew. Classifier failures surface as
    /// [`ClassifyError::Inference`] with the underlying message; both are
    /// request-scoped.
    pub fn decide(&self, features: &[f32], started: Instant) -> Result<Prediction, ClassifyError> {
        let expected = self.model.input_width();
        if features.len() != expected {
            return Err(ClassifyError::ShapeMismatch {
                expected,
                got: features.len(),
            });
        }

        // Single-row batch, matching the classifier's (1, width) input shape.
        let batch = vec![features.to_vec()];
        let rows = self
            .model
            .predict(&batch)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;

        let male_probability = rows
            .first()
            .and_then(|row| row.first())
            .copied()
            .ok_or_else(|| ClassifyError::Inference("classifier returned no output".into()))?;

        let female_probability = 1.0 - male_probability;
        // Strict comparison: a tie at exactly 0.5 resolves to female.
        let gender = if male_probability > female_probability {
            Gender::Male
        } else {
            Gender::Female
        };
        let confidence_score = male_probability.max(female_probability);

        debug!(
            "decided {gender:?} (male={male_probability:.4}, score={confidence_score:.4})"
        );

        Ok(Prediction {
            gender,
            male_probability,
            female_probability,
            confidence: Confidence::from_score(confidence_score),
            confidence_score,
            processing_time: round2(started.elapsed().as_secs_f64()),
        })
    }

    /// Cheap liveness probe: one zero-vector prediction through the model.
    pub fn warmup(&self) -> Result<(), ClassifyError> {
        let batch = vec![vec![0.0f32; self.model.input_width()]];
        self.model
            .predict(&batch)
            .map_err(|e| ClassifyError::Inference(e.to_string()))?;
        Ok(())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
