//! Engine batching tests with a counting mock scorer

use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use toxiguard_classifiers::{load_model, ClassifierEngine, ClassifierModel, Scorer};
use toxiguard_core::{Error, LabelMatrix, Result};

/// Deterministic scorer: label `j` of text `t` scores `(len(t) + j) % 10 / 10`
struct MockScorer {
    num_labels: usize,
    calls: AtomicU32,
    fail: bool,
}

impl MockScorer {
    fn new(num_labels: usize) -> Self {
        Self {
            num_labels,
            calls: AtomicU32::new(0),
            fail: false,
        }
    }

    fn failing(num_labels: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(num_labels)
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Scorer for MockScorer {
    fn score(&self, texts: &[String]) -> Result<LabelMatrix> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Error::invalid_input("backend exploded"));
        }

        let rows = (0..self.num_labels)
            .map(|j| {
                texts
                    .iter()
                    .map(|t| ((t.len() + j) % 10) as f32 / 10.0)
                    .collect()
            })
            .collect();
        LabelMatrix::from_rows(rows, texts.len())
    }

    fn name(&self) -> &str {
        "mock"
    }
}

fn label_names() -> Vec<String> {
    ["toxic", "obscene", "insult"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn engine_with(scorer: Arc<MockScorer>) -> ClassifierEngine {
    let model = ClassifierModel::new(scorer, label_names()).unwrap();
    ClassifierEngine::new(model, 4)
}

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_one_scorer_call_per_batch() {
    let scorer = Arc::new(MockScorer::new(3));
    let engine = engine_with(scorer.clone());

    let matrix = engine
        .score(texts(&["a", "bb", "ccc", "dddd", "eeeee"]))
        .await
        .unwrap();

    assert_eq!(scorer.call_count(), 1);
    assert_eq!(matrix.num_labels(), 3);
    assert_eq!(matrix.num_samples(), 5);
}

#[tokio::test]
async fn test_empty_batch_skips_scorer() {
    let scorer = Arc::new(MockScorer::new(3));
    let engine = engine_with(scorer.clone());

    let results = engine.predict(vec![]).await.unwrap();

    assert!(results.is_empty());
    assert_eq!(scorer.call_count(), 0);
}

#[tokio::test]
async fn test_batch_is_order_preserving() {
    let scorer = Arc::new(MockScorer::new(3));
    let engine = engine_with(scorer);

    let batch = engine.predict(texts(&["a", "bbbb"])).await.unwrap();
    let first = engine.predict(texts(&["a"])).await.unwrap();
    let second = engine.predict(texts(&["bbbb"])).await.unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0], first[0]);
    assert_eq!(batch[1], second[0]);
}

#[tokio::test]
async fn test_every_result_has_every_label() {
    let scorer = Arc::new(MockScorer::new(3));
    let engine = engine_with(scorer);

    let results = engine.predict(texts(&["x", "", "hello"])).await.unwrap();

    for result in &results {
        assert_eq!(result.len(), 3);
        for label in label_names() {
            assert!(result.get(&label).is_some(), "missing label {}", label);
        }
    }
}

#[tokio::test]
async fn test_scorer_failure_is_model_unavailable() {
    let scorer = Arc::new(MockScorer::failing(3));
    let engine = engine_with(scorer.clone());

    let err = engine.score(texts(&["a"])).await.unwrap_err();

    assert!(matches!(err, Error::ModelUnavailable(_)));
    assert_eq!(scorer.call_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches() {
    let scorer = Arc::new(MockScorer::new(3));
    let engine = engine_with(scorer.clone());

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let input: Vec<String> = (0..i).map(|n| "x".repeat(n)).collect();
                let results = engine.predict(input).await.unwrap();
                assert_eq!(results.len(), i);
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    // Batch 0 is empty and never reaches the scorer
    assert_eq!(scorer.call_count(), 15);
}

#[tokio::test]
async fn test_load_model_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
name: toxic-lexicon-test
labels:
  - name: toxic
    bias: -2.0
    terms:
      idiot: 4.0
  - name: threat
    bias: -4.0
    terms:
      kill: 5.0
"#
    )
    .unwrap();

    let model = load_model(file.path()).unwrap();
    assert_eq!(model.labels(), ["toxic".to_string(), "threat".to_string()]);

    let engine = ClassifierEngine::new(model, 1);
    let results = engine.predict(texts(&["what an idiot", "nice"])).await.unwrap();

    assert!(results[0].get("toxic").unwrap() > 0.5);
    assert!(results[1].get("toxic").unwrap() < 0.5);
    assert!(results[0].get("threat").unwrap() < 0.5);
}

#[test]
fn test_load_model_missing_file() {
    let result = load_model("/nonexistent/toxic_model.yaml");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_load_model_without_labels() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name: empty\nlabels: []").unwrap();

    let result = load_model(file.path());
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_shipped_artifact() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../resources/toxic_model.yaml");
    let model = load_model(path).unwrap();
    assert_eq!(
        model.labels(),
        [
            "toxic",
            "severe_toxic",
            "obscene",
            "threat",
            "insult",
            "identity_hate"
        ]
        .map(String::from)
    );

    let engine = ClassifierEngine::new(model, 1);
    let results = engine
        .predict(texts(&["Thanks for the helpful review!", "you stupid idiot"]))
        .await
        .unwrap();

    assert!(results[0].get("toxic").unwrap() < 0.2);
    assert!(results[1].get("toxic").unwrap() > 0.5);
    assert!(results[1].get("insult").unwrap() > 0.5);
    assert!(results[1].get("threat").unwrap() < 0.2);
}
