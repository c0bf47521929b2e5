//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (preflight short-circuit, response headers)
//!     → rate_limit.rs (per-client fixed-window quota)
//!     → token.rs (bearer header or auth cookie)
//!     → Pass to route callback
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Cheap checks first: rate limiting runs before any body parsing
//! - Token validity is the backend's call; the gateway only checks presence

pub mod cors;
pub mod rate_limit;
pub mod token;

pub use cors::{CorsError, CorsPolicy};
pub use rate_limit::{client_identifier, MemoryStore, RateDecision, RateLimitStore, RateLimiter, RateScope};
pub use token::{extract_refresh_token, extract_token};
