//! Scorer trait

use toxiguard_core::{LabelMatrix, Result};

/// The wrapped scoring capability.
///
/// Scoring is CPU bound and synchronous; callers run it off the async
/// executor. Implementations are expected to vectorize over the whole batch.
pub trait Scorer: Send + Sync {
    /// Score a batch of texts.
    ///
    /// Returns a label-major matrix: one row per label in the model's label
    /// order, one cell per input text in input order.
    fn score(&self, texts: &[String]) -> Result<LabelMatrix>;

    /// Get the scorer name
    fn name(&self) -> &str;
}
