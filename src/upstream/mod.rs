//! Backend proxy subsystem.
//!
//! # Data Flow
//! ```text
//! route handler
//!     → client.rs (build URL, attach bearer + request id)
//!     → backend service
//!     → client.rs (2xx: JSON body; otherwise BackendError)
//!     → handler maps BackendError to ApiError
//! ```

pub mod client;

pub use client::{BackendClient, BackendError, Upstream};

use serde_json::Value;

/// Many backend endpoints wrap lists as `{"<key>": [...]}`. Return the inner
/// value when present, otherwise the body unchanged.
pub fn unwrap_field(body: Value, key: &str) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_field() {
        assert_eq!(unwrap_field(json!({"bills": [1, 2]}), "bills"), json!([1, 2]));
        assert_eq!(unwrap_field(json!([3]), "bills"), json!([3]));
        assert_eq!(
            unwrap_field(json!({"items": []}), "bills"),
            json!({"items": []})
        );
    }
}
