//! Roomy API gateway.
//!
//! The HTTP edge of the Roomy group expense-splitting app. Every `/api`
//! request runs through a fixed pipeline and is then answered locally or
//! relayed to the backend service; every answer uses one JSON envelope.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server ──▶ api::* route ──▶ pipeline
//!                                                         │
//!                     ┌───────────────────────────────────┘
//!                     ▼
//!        [CORS] ─▶ [rate limit] ─▶ [validation] ─▶ [auth] ─▶ callback ─▶ upstream ─▶ Backend
//!                                                                │
//!     ◀──────────── http::response envelope ◀────────────────────┘
//!
//!     Cross-cutting: config, observability, lifecycle, security, error
//! ```

// Core subsystems
pub mod api;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod routing;
pub mod schedule;
pub mod upstream;
pub mod validation;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use error::{ApiError, ApiResult};
