//! Loaded classifier model

use crate::scorer::Scorer;
use std::collections::HashSet;
use std::sync::Arc;
use toxiguard_core::{Error, Result};

/// Immutable scorer plus its ordered labels.
///
/// Label order fixes the row position of every matrix the scorer returns.
#[derive(Clone)]
pub struct ClassifierModel {
    scorer: Arc<dyn Scorer>,
    labels: Arc<[String]>,
}

impl ClassifierModel {
    /// Create a model from a scorer and its labels
    pub fn new(scorer: Arc<dyn Scorer>, labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(Error::config("model must define at least one label"));
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(Error::config(format!("duplicate label '{}'", label)));
            }
        }

        Ok(Self {
            scorer,
            labels: labels.into(),
        })
    }

    /// Ordered labels
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The wrapped scorer
    pub fn scorer(&self) -> &Arc<dyn Scorer> {
        &self.scorer
    }

    /// Scorer name
    pub fn name(&self) -> &str {
        self.scorer.name()
    }
}

impl std::fmt::Debug for ClassifierModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierModel")
            .field("scorer", &self.scorer.name())
            .field("labels", &self.labels)
            .finish()
    }
}
