use crate::error::ClassifyError;

/// A pretrained binary gender classifier, consumed as an opaque capability.
///
/// `predict` takes a batch of feature rows and returns one output row per
/// input row. For this binary task every output row holds a single scalar:
/// the probability that the clip's speaker is male.
///
/// Any persisted-weights classifier satisfying this contract is
/// substitutable; the decision engine does not depend on a concrete model
/// format.
///
/// # Thread Safety
///
/// Inference must not mutate model state. One instance is shared across all
/// concurrent requests.
pub trait GenderModel: Send + Sync {
    /// Runs the classifier on a batch of feature rows.
    fn predict(&self, batch: &[Vec<f32>]) -> Result<Vec<Vec<f32>>, ClassifyError>;

    /// Width of the feature vector the classifier expects.
    fn input_width(&self) -> usize;
}
