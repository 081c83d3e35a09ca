//! Lexicon-weighted logistic scorer
//!
//! Each label is an independent logistic model over term counts:
//! `p = sigmoid(bias + sum(weight(term) * count(term)))`. All labels share a
//! single Aho-Corasick automaton, so a text is scanned once no matter how
//! many labels the model defines.

use crate::scorer::Scorer;
use aho_corasick::{AhoCorasick, MatchKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use toxiguard_core::{Error, LabelMatrix, Result};

/// On-disk artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LexiconArtifact {
    /// Model name or version
    pub name: String,

    /// Labels, in output order
    pub labels: Vec<LabelSpec>,
}

/// One label's logistic weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSpec {
    /// Label name
    pub name: String,

    /// Intercept
    #[serde(default)]
    pub bias: f32,

    /// Term weights; matched case-insensitively on word boundaries
    #[serde(default)]
    pub terms: BTreeMap<String, f32>,
}

/// Scorer built from a [`LexiconArtifact`]
pub struct LexiconScorer {
    name: String,
    matcher: AhoCorasick,
    /// Indexed by pattern id: the `(label index, weight)` pairs it contributes
    contributions: Vec<Vec<(usize, f32)>>,
    biases: Vec<f32>,
}

impl LexiconScorer {
    /// Build the scorer from an artifact
    pub fn new(artifact: &LexiconArtifact) -> Result<Self> {
        let mut pattern_ids: HashMap<String, usize> = HashMap::new();
        let mut patterns: Vec<String> = Vec::new();
        let mut contributions: Vec<Vec<(usize, f32)>> = Vec::new();

        for (label_idx, label) in artifact.labels.iter().enumerate() {
            for (term, &weight) in &label.terms {
                let term = term.trim().to_lowercase();
                if term.is_empty() {
                    return Err(Error::config(format!(
                        "label '{}' has an empty term",
                        label.name
                    )));
                }

                let id = *pattern_ids.entry(term.clone()).or_insert_with(|| {
                    patterns.push(term);
                    contributions.push(Vec::new());
                    patterns.len() - 1
                });
                contributions[id].push((label_idx, weight));
            }
        }

        // Standard semantics so overlapping candidates survive until the
        // boundary filter has run
        let matcher = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| Error::config(format!("Failed to build term matcher: {}", e)))?;

        Ok(Self {
            name: artifact.name.clone(),
            matcher,
            contributions,
            biases: artifact.labels.iter().map(|l| l.bias).collect(),
        })
    }

    /// Whole-word matches, leftmost first, longest wins among those sharing a start
    fn term_matches(&self, text: &str) -> Vec<usize> {
        let mut candidates: Vec<(usize, usize, usize)> = self
            .matcher
            .find_overlapping_iter(text)
            .filter(|m| is_word_boundary(text, m.start(), m.end()))
            .map(|m| (m.start(), m.end(), m.pattern().as_usize()))
            .collect();
        candidates.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));

        let mut chosen = Vec::new();
        let mut cursor = 0;
        for (start, end, pattern) in candidates {
            if start >= cursor {
                chosen.push(pattern);
                cursor = end;
            }
        }
        chosen
    }

    fn logits(&self, text: &str) -> Vec<f32> {
        let mut logits = self.biases.clone();
        let text = text.to_lowercase();

        for pattern in self.term_matches(&text) {
            for &(label, weight) in &self.contributions[pattern] {
                logits[label] += weight;
            }
        }

        logits
    }
}

impl Scorer for LexiconScorer {
    fn score(&self, texts: &[String]) -> Result<LabelMatrix> {
        let mut rows = vec![Vec::with_capacity(texts.len()); self.biases.len()];

        for text in texts {
            for (row, logit) in rows.iter_mut().zip(self.logits(text)) {
                row.push(sigmoid(logit));
            }
        }

        LabelMatrix::from_rows(rows, texts.len())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text
        .get(..start)
        .and_then(|s| s.chars().next_back())
        .map_or(true, |c| !is_word_char(c));
    let after = text
        .get(end..)
        .and_then(|s| s.chars().next())
        .map_or(true, |c| !is_word_char(c));
    before && after
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
