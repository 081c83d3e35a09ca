//! Core types for Toxiguard

use serde::ser::{Serialize, SerializeMap, Serializer};
use sha2::{Digest, Sha256};
use std::borrow::Borrow;
use std::fmt;
use std::net::IpAddr;

/// An opaque API key presented by a client.
///
/// Comparison is exact and case-sensitive. `Debug` never prints the key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a key string
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the raw key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ApiKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Rate-limit partition key for a client
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// Identity derived from the connection's origin address
    pub fn from_addr(addr: IpAddr) -> Self {
        Self(format!("ip:{}", addr))
    }

    /// Identity derived from a presented API key.
    ///
    /// Only the SHA-256 digest of the key is kept.
    pub fn from_api_key(key: &str) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let hex: String = digest.iter().take(16).map(|b| format!("{:02x}", b)).collect();
        Self(format!("key:{}", hex))
    }

    /// Arbitrary identity, mostly useful in tests
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identity string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An inbound prediction request, resolved once at the router boundary
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionRequest {
    /// One text; the response carries a single result
    Single { text: String },

    /// Ordered texts; the response carries one result per text, in order
    Batch { texts: Vec<String> },
}

impl PredictionRequest {
    /// Create a single-text request
    pub fn single(text: impl Into<String>) -> Self {
        Self::Single { text: text.into() }
    }

    /// Create a batch request
    pub fn batch<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Batch {
            texts: texts.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of texts carried by this request
    pub fn len(&self) -> usize {
        match self {
            Self::Single { .. } => 1,
            Self::Batch { texts } => texts.len(),
        }
    }

    /// Whether the request carries no texts (only possible for a batch)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is the batch shape
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch { .. })
    }

    /// Normalize into an ordered batch of texts
    pub fn into_texts(self) -> Vec<String> {
        match self {
            Self::Single { text } => vec![text],
            Self::Batch { texts } => texts,
        }
    }
}

/// Label-major probability matrix: `rows[label_index][sample_index]`
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMatrix {
    rows: Vec<Vec<f32>>,
    num_samples: usize,
}

impl LabelMatrix {
    /// Build a matrix from label-major rows.
    ///
    /// Every row must hold exactly `num_samples` cells.
    pub fn from_rows(rows: Vec<Vec<f32>>, num_samples: usize) -> crate::Result<Self> {
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != num_samples) {
            return Err(crate::Error::internal(format!(
                "label row {} has {} cells, expected {}",
                i,
                row.len(),
                num_samples
            )));
        }
        Ok(Self { rows, num_samples })
    }

    /// A matrix with `num_labels` rows and no samples
    pub fn empty(num_labels: usize) -> Self {
        Self {
            rows: vec![Vec::new(); num_labels],
            num_samples: 0,
        }
    }

    /// Label dimension
    pub fn num_labels(&self) -> usize {
        self.rows.len()
    }

    /// Sample dimension
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    /// Cell for `(label, sample)`
    pub fn get(&self, label: usize, sample: usize) -> Option<f32> {
        self.rows.get(label).and_then(|row| row.get(sample)).copied()
    }

    /// Borrow all rows
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }
}

/// Per-sample mapping from label to probability.
///
/// Entries keep the model's label order and serialize as a JSON object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PredictionResult {
    scores: Vec<(String, f32)>,
}

impl PredictionResult {
    /// Create an empty result with room for `capacity` labels
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            scores: Vec::with_capacity(capacity),
        }
    }

    /// Append a label score
    pub fn push(&mut self, label: impl Into<String>, probability: f32) {
        self.scores.push((label.into(), probability));
    }

    /// Probability for a label, if present
    pub fn get(&self, label: &str) -> Option<f32> {
        self.scores
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, p)| *p)
    }

    /// Number of labels in this result
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Whether the result holds no labels
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterate `(label, probability)` in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.scores.iter().map(|(l, p)| (l.as_str(), *p))
    }
}

impl Serialize for PredictionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.scores.len()))?;
        for (label, probability) in &self.scores {
            map.serialize_entry(label, probability)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("secret-key");
        assert_eq!(format!("{:?}", key), "ApiKey(***)");
        assert_eq!(key.as_str(), "secret-key");
    }

    #[test]
    fn test_identity_from_api_key_hides_key() {
        let id = ClientIdentity::from_api_key("frontend-dev-key");
        assert!(id.as_str().starts_with("key:"));
        assert!(!id.as_str().contains("frontend"));
        assert_eq!(id, ClientIdentity::from_api_key("frontend-dev-key"));
        assert_ne!(id, ClientIdentity::from_api_key("Frontend-dev-key"));
    }

    #[test]
    fn test_identity_from_addr() {
        let id = ClientIdentity::from_addr("10.1.2.3".parse().unwrap());
        assert_eq!(id.as_str(), "ip:10.1.2.3");
    }

    #[test]
    fn test_request_normalization() {
        let single = PredictionRequest::single("hello");
        assert_eq!(single.len(), 1);
        assert!(!single.is_batch());
        assert_eq!(single.into_texts(), vec!["hello".to_string()]);

        let batch = PredictionRequest::batch(["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
        assert!(batch.is_batch());
        assert_eq!(batch.into_texts(), vec!["a", "b", "c"]);

        let empty = PredictionRequest::batch(Vec::<String>::new());
        assert!(empty.is_empty());
    }

    #[test]
    fn test_matrix_shape_validation() {
        let ok = LabelMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3, 0.4]], 2).unwrap();
        assert_eq!(ok.num_labels(), 2);
        assert_eq!(ok.num_samples(), 2);
        assert_eq!(ok.get(1, 0), Some(0.3));
        assert_eq!(ok.get(2, 0), None);

        let bad = LabelMatrix::from_rows(vec![vec![0.1, 0.2], vec![0.3]], 2);
        assert!(bad.is_err());

        let empty = LabelMatrix::empty(3);
        assert_eq!(empty.num_labels(), 3);
        assert_eq!(empty.num_samples(), 0);
    }

    #[test]
    fn test_result_serializes_in_label_order() {
        let mut result = PredictionResult::with_capacity(3);
        result.push("toxic", 0.5);
        result.push("insult", 0.25);
        result.push("threat", 0.125);

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"toxic":0.5,"insult":0.25,"threat":0.125}"#);
        assert_eq!(result.get("insult"), Some(0.25));
        assert_eq!(result.get("missing"), None);
    }
}
