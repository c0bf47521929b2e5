//! Routing for paths outside the API table.
//!
//! # Data Flow
//! ```text
//! Unmatched request (path, cookies)
//!     → page_gate.rs (/api/*: 404 envelope; pages: decide)
//!     → matcher.rs (evaluate path conditions)
//!     → Return: redirect or 404 envelope
//! ```
//!
//! # Design Decisions
//! - Matchers built once at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same path and cookie state always give the same answer

pub mod matcher;
pub mod page_gate;

pub use page_gate::{PageDecision, PageGate};
