//! Input validation subsystem.
//!
//! # Responsibilities
//! - Parse and validate JSON bodies against a declared type (schema.rs)
//! - Check UUID path parameters and pagination queries (params.rs)
//!
//! # Design Decisions
//! - Every failure is an `ApiError`; nothing panics past this boundary
//! - Malformed JSON is distinguishable from a well-formed body that breaks
//!   the rules: only the latter carries a field map

pub mod params;
pub mod schema;

pub use params::{is_valid_uuid, require_uuid, Pagination};
pub use schema::{field_errors, parse_body};
