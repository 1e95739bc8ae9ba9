//! affectlens HTTP server
//!
//! Axum front end over the analysis service: request validation, per-client
//! rate limiting, URL fetching with SSRF protection and health, readiness and
//! Prometheus endpoints.

pub mod config;
pub mod error;
pub mod fetch;
pub mod rate_limit;
pub mod routes;
pub mod security;
pub mod state;

pub use config::{FetchConfig, RateLimit, RateLimitsConfig, ServerConfig};
pub use error::AppError;
pub use rate_limit::{Endpoint, RateLimiters};
pub use routes::create_router;
pub use state::AppState;
