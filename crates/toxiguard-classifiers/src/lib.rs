//! Toxiguard Classifiers
//!
//! Batch scoring for multi-label text classification.
//!
//! The model itself is a black box behind the [`Scorer`] trait. This crate
//! wraps it with:
//! - [`ClassifierModel`]: the scorer plus its fixed, ordered label list
//! - [`ClassifierEngine`]: one scorer call per batch, run on the blocking pool
//! - [`pivot`]: label-major matrix to per-sample result maps
//! - [`load_model`]: loader for the lexicon artifact format

pub mod engine;
pub mod lexicon;
pub mod loader;
pub mod model;
pub mod pivot;
pub mod scorer;

pub use engine::ClassifierEngine;
pub use lexicon::{LabelSpec, LexiconArtifact, LexiconScorer};
pub use loader::load_model;
pub use model::ClassifierModel;
pub use pivot::pivot;
pub use scorer::Scorer;
