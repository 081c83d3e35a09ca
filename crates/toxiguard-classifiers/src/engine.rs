//! Classifier engine: batching and adaptation layer over the scorer

use crate::model::ClassifierModel;
use crate::pivot::pivot;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use toxiguard_core::{Error, LabelMatrix, PredictionResult, Result};
use tracing::{debug, error, info};

#[derive(Clone)]
enum ModelState {
    Loaded(Arc<ClassifierModel>),
    Unavailable(Arc<str>),
}

/// Wraps a loaded model, or the reason it failed to load.
///
/// Each [`score`](Self::score) call makes exactly one scorer call, on the
/// tokio blocking pool, bounded by a fixed number of concurrent jobs.
#[derive(Clone)]
pub struct ClassifierEngine {
    state: ModelState,
    permits: Arc<Semaphore>,
}

impl ClassifierEngine {
    /// Create an engine over a loaded model with `workers` concurrent scoring jobs
    pub fn new(model: ClassifierModel, workers: usize) -> Self {
        info!(
            "Classifier engine ready: model={}, labels={}, workers={}",
            model.name(),
            model.labels().len(),
            workers.max(1)
        );
        Self {
            state: ModelState::Loaded(Arc::new(model)),
            permits: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Create an engine whose every call fails with `ModelUnavailable`
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        error!("Classifier model unavailable: {}", reason);
        Self {
            state: ModelState::Unavailable(reason.into()),
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Build from the outcome of the artifact loader.
    ///
    /// A load failure is permanent for this engine; there is no retry.
    pub fn from_load_result(result: Result<ClassifierModel>, workers: usize) -> Self {
        match result {
            Ok(model) => Self::new(model, workers),
            Err(e) => Self::unavailable(e.to_string()),
        }
    }

    /// Default worker count: one per CPU
    pub fn default_workers() -> usize {
        num_cpus::get()
    }

    /// Whether the model loaded successfully
    pub fn is_loaded(&self) -> bool {
        matches!(self.state, ModelState::Loaded(_))
    }

    /// The loaded model, or `ModelUnavailable`
    pub fn model(&self) -> Result<&Arc<ClassifierModel>> {
        match &self.state {
            ModelState::Loaded(model) => Ok(model),
            ModelState::Unavailable(reason) => Err(Error::model_unavailable(reason.to_string())),
        }
    }

    /// Ordered labels, empty when the model is unavailable
    pub fn labels(&self) -> &[String] {
        match &self.state {
            ModelState::Loaded(model) => model.labels(),
            ModelState::Unavailable(_) => &[],
        }
    }

    /// Score a batch, returning a `[label][sample]` matrix.
    ///
    /// Empty input returns an empty matrix without calling the scorer.
    pub async fn score(&self, texts: Vec<String>) -> Result<LabelMatrix> {
        let model = self.model()?.clone();
        let num_labels = model.labels().len();
        let num_samples = texts.len();

        if num_samples == 0 {
            return Ok(LabelMatrix::empty(num_labels));
        }

        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::internal("scoring pool closed"))?;

        let start = Instant::now();
        let matrix = tokio::task::spawn_blocking(move || {
            // Held by the job so an abandoned request still occupies its slot
            let _permit = permit;
            model.scorer().score(&texts)
        })
        .await
        .map_err(|e| Error::internal(format!("scoring task failed: {}", e)))?
        .map_err(|e| match e {
            Error::ModelUnavailable(_) | Error::Internal(_) => e,
            other => Error::model_unavailable(format!("scorer failed: {}", other)),
        })?;

        debug!(
            "Scored {} texts in {}us",
            num_samples,
            start.elapsed().as_micros()
        );

        validate_matrix(&matrix, num_labels, num_samples)?;
        Ok(matrix)
    }

    /// Score a batch and pivot into one result per text, in input order
    pub async fn predict(&self, texts: Vec<String>) -> Result<Vec<PredictionResult>> {
        let matrix = self.score(texts).await?;
        pivot(&matrix, self.labels())
    }
}

fn validate_matrix(matrix: &LabelMatrix, num_labels: usize, num_samples: usize) -> Result<()> {
    if matrix.num_labels() != num_labels || matrix.num_samples() != num_samples {
        return Err(Error::internal(format!(
            "scorer returned a {}x{} matrix, expected {}x{}",
            matrix.num_labels(),
            matrix.num_samples(),
            num_labels,
            num_samples
        )));
    }

    let out_of_range = matrix
        .rows()
        .iter()
        .flatten()
        .any(|p| !(0.0..=1.0).contains(p));
    if out_of_range {
        return Err(Error::internal("scorer returned a probability outside [0, 1]"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorer::Scorer;

    struct ConstScorer(f32, usize);

    impl Scorer for ConstScorer {
        fn score(&self, texts: &[String]) -> Result<LabelMatrix> {
            LabelMatrix::from_rows(vec![vec![self.0; texts.len()]; self.1], texts.len())
        }

        fn name(&self) -> &str {
            "const"
        }
    }

    fn engine(p: f32, rows: usize, labels: &[&str]) -> ClassifierEngine {
        let model = ClassifierModel::new(
            Arc::new(ConstScorer(p, rows)),
            labels.iter().map(|s| s.to_string()).collect(),
        )
        .unwrap();
        ClassifierEngine::new(model, 2)
    }

    #[tokio::test]
    async fn test_unavailable_engine_fails_every_call() {
        let engine = ClassifierEngine::unavailable("file not found");
        assert!(!engine.is_loaded());
        assert!(engine.labels().is_empty());

        for _ in 0..3 {
            let err = engine.score(vec!["x".to_string()]).await.unwrap_err();
            assert!(matches!(err, Error::ModelUnavailable(ref m) if m == "file not found"));
        }

        // Even an empty batch needs a model
        let err = engine.score(vec![]).await.unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_from_load_result_error() {
        let engine = ClassifierEngine::from_load_result(Err(Error::config("bad artifact")), 1);
        assert!(!engine.is_loaded());
    }

    #[tokio::test]
    async fn test_shape_mismatch_is_internal() {
        let engine = engine(0.5, 1, &["a", "b"]);
        let err = engine.score(vec!["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_out_of_range_probability_is_internal() {
        let engine = engine(1.5, 1, &["a"]);
        let err = engine.score(vec!["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[tokio::test]
    async fn test_predict_pivots() {
        let engine = engine(0.1, 2, &["toxic", "insult"]);
        let results = engine
            .predict(vec!["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].get("toxic"), Some(0.1));
        assert_eq!(results[1].get("insult"), Some(0.1));
    }
}
