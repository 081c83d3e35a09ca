//! Toxiguard Core
//!
//! Core types and error handling shared across Toxiguard components.
//!
//! This crate provides:
//! - Request shapes (single text, batch of texts) and per-sample results
//! - Client identity and API key types used for admission control
//! - The label-major probability matrix produced by scorers
//! - Error types and result handling

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{ApiKey, ClientIdentity, LabelMatrix, PredictionRequest, PredictionResult};
