//! Application state shared across all requests

use crate::config::GatewayConfig;
use crate::router::RequestRouter;
use axum::http::HeaderName;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use toxiguard_classifiers::ClassifierEngine;
use toxiguard_core::{Error, Result};
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<GatewayConfig>,

    /// Request pipeline
    pub router: Arc<RequestRouter>,

    /// Parsed API key header name
    pub api_key_header: HeaderName,

    /// Prometheus metrics handle for rendering, when a recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Build state from configuration and an engine produced at startup
    pub fn new(
        config: GatewayConfig,
        engine: ClassifierEngine,
        metrics_handle: Option<PrometheusHandle>,
    ) -> Result<Self> {
        let api_key_header = HeaderName::try_from(config.api_key_header.as_str())
            .map_err(|e| Error::config(format!("invalid api_key_header: {}", e)))?;

        let router = RequestRouter::from_config(&config, engine);
        info!(
            "Gateway ready: {} API keys, {} req/{}s per client, max batch {}",
            config.api_keys.len(),
            config.rate_limit.requests_per_window,
            config.rate_limit.window_secs,
            config.max_batch_size
        );

        Ok(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            api_key_header,
            metrics_handle,
        })
    }
}
