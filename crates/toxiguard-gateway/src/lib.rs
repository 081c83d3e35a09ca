//! Toxiguard Gateway
//!
//! Authenticated, rate-limited HTTP front for a multi-label text classifier.
//!
//! A request flows through [`auth::CredentialStore`], then
//! [`rate_limit::RateLimiter`], then the classifier engine, and the
//! engine's label-major output is pivoted into one result map per text.

pub mod auth;
pub mod config;
pub mod identity;
pub mod rate_limit;
pub mod router;
pub mod routes;
pub mod state;

pub use auth::CredentialStore;
pub use config::{BatchCost, GatewayConfig, IdentitySource, RateLimitConfig};
pub use rate_limit::{Admission, RateLimiter, RateWindow};
pub use router::{PredictionResponse, RequestRouter, RoutingPolicy};
pub use routes::create_router;
pub use state::AppState;
