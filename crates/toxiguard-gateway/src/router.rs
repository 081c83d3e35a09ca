//! Request pipeline: authenticate, admit, score, pivot
//!
//! Both request shapes run through the same path. A request is rejected at
//! the first failing step and is never retried:
//!
//! ```text
//! Received -> Authenticated -> Admitted -> Scored -> Pivoted -> Responded
//!    |              |              |
//!    Unauthorized   RateLimited    ModelUnavailable
//! ```

use crate::auth::CredentialStore;
use crate::config::{BatchCost, GatewayConfig};
use crate::rate_limit::{Admission, RateLimiter};
use serde::Serialize;
use std::time::{Duration, Instant};
use toxiguard_classifiers::ClassifierEngine;
use toxiguard_core::{ClientIdentity, Error, PredictionRequest, PredictionResult, Result};
use tracing::debug;

/// Successful response, shaped after the request
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResponse {
    /// The lone result of a single-text request
    Single(PredictionResult),
    /// One result per input text, in input order
    Batch(Vec<PredictionResult>),
}

impl PredictionResponse {
    /// Results as a slice, one per input text
    pub fn results(&self) -> &[PredictionResult] {
        match self {
            Self::Single(result) => std::slice::from_ref(result),
            Self::Batch(results) => results,
        }
    }
}

impl Serialize for PredictionResponse {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Body<'a, T: Serialize> {
            results: &'a T,
        }

        match self {
            Self::Single(result) => Body { results: result }.serialize(serializer),
            Self::Batch(results) => Body { results }.serialize(serializer),
        }
    }
}

/// Admission and batching limits applied by the router
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    pub requests_per_window: u64,
    pub window: Duration,
    pub batch_cost: BatchCost,
    pub max_batch_size: usize,
    pub score_timeout: Duration,
}

impl RoutingPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            requests_per_window: config.rate_limit.requests_per_window,
            window: config.rate_limit.window(),
            batch_cost: config.rate_limit.batch_cost,
            max_batch_size: config.max_batch_size,
            score_timeout: config.score_timeout(),
        }
    }
}

/// Entry point for prediction requests
pub struct RequestRouter {
    credentials: CredentialStore,
    limiter: RateLimiter,
    engine: ClassifierEngine,
    policy: RoutingPolicy,
}

impl RequestRouter {
    pub fn new(
        credentials: CredentialStore,
        limiter: RateLimiter,
        engine: ClassifierEngine,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            credentials,
            limiter,
            engine,
            policy,
        }
    }

    /// Wire up a router from configuration and an already-built engine
    pub fn from_config(config: &GatewayConfig, engine: ClassifierEngine) -> Self {
        Self::new(
            CredentialStore::new(config.api_keys.iter().cloned()),
            RateLimiter::new(config.rate_limit.shards, config.rate_limit.max_identities),
            engine,
            RoutingPolicy::from_config(config),
        )
    }

    /// Run one request through the pipeline
    pub async fn handle(
        &self,
        api_key: Option<&str>,
        identity: &ClientIdentity,
        request: PredictionRequest,
    ) -> Result<PredictionResponse> {
        let result = self.process(api_key, identity, request).await;
        if let Err(ref e) = result {
            record_rejection(e.kind());
        }
        result
    }

    /// Check the credential alone, without touching the limiter
    pub fn authorize(&self, api_key: Option<&str>, identity: &ClientIdentity) -> Result<()> {
        if self.credentials.validate(api_key) {
            Ok(())
        } else {
            debug!("Rejected request from {}: invalid API key", identity);
            Err(Error::Unauthorized)
        }
    }

    async fn process(
        &self,
        api_key: Option<&str>,
        identity: &ClientIdentity,
        request: PredictionRequest,
    ) -> Result<PredictionResponse> {
        self.authorize(api_key, identity)?;

        if request.len() > self.policy.max_batch_size {
            return Err(Error::invalid_input(format!(
                "batch of {} texts exceeds the maximum of {}",
                request.len(),
                self.policy.max_batch_size
            )));
        }

        let cost = self.policy.batch_cost.units(request.len());
        let admission = self.limiter.admit(
            identity,
            self.policy.requests_per_window,
            self.policy.window,
            cost,
        );
        if let Admission::Rejected { retry_after } = admission {
            debug!("Rate limited {} for {}s", identity, retry_after.as_secs());
            return Err(Error::RateLimited { retry_after });
        }

        // Cheap standing check before any work is dispatched
        self.engine.model()?;

        let is_batch = request.is_batch();
        let texts = request.into_texts();
        let num_texts = texts.len();

        let start = Instant::now();
        let mut results = tokio::time::timeout(self.policy.score_timeout, self.engine.predict(texts))
            .await
            .map_err(|_| Error::Timeout)??;

        metrics::histogram!("toxiguard_scoring_latency_us")
            .record(start.elapsed().as_micros() as f64);
        metrics::counter!("toxiguard_texts_scored_total").increment(num_texts as u64);

        if is_batch {
            Ok(PredictionResponse::Batch(results))
        } else {
            results
                .pop()
                .map(PredictionResponse::Single)
                .ok_or_else(|| Error::internal("no result for single-text request"))
        }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &ClassifierEngine {
        &self.engine
    }

    /// The rate limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Count a failed request under `toxiguard_rejections_total`
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("toxiguard_rejections_total", "reason" => reason).increment(1);
}
