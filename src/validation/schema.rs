//! Request body validation.
//!
//! A body goes through three steps, each with its own failure:
//! 1. JSON syntax (`InvalidJson`, no field map)
//! 2. shape: serde deserialization into the declared type
//! 3. rules: `validator` constraints on the typed value
//!
//! Steps 2 and 3 both produce `Validation` with a field-path map.

use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::error::{ApiError, ApiResult};
use crate::http::response::FieldErrors;

/// Key used when a problem cannot be pinned to a field.
const BODY_KEY: &str = "body";

/// Parse and validate a raw body as `T`.
pub fn parse_body<T>(bytes: &[u8]) -> ApiResult<T>
where
    T: DeserializeOwned + Validate,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::InvalidJson);
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|_| ApiError::InvalidJson)?;

    let data: T = serde_json::from_value(value).map_err(|e| ApiError::Validation(shape_errors(&e)))?;
    data.validate()
        .map_err(|e| ApiError::Validation(field_errors(&e)))?;
    Ok(data)
}

/// Map a serde shape error onto the field it names, if any.
fn shape_errors(err: &serde_json::Error) -> FieldErrors {
    let text = err.to_string();
    let field = ["missing field `", "unknown field `"]
        .iter()
        .find_map(|prefix| text.strip_prefix(prefix))
        .and_then(|rest| rest.split('`').next())
        .map(str::to_string)
        .unwrap_or_else(|| BODY_KEY.to_string());

    let message = match text.split_once(" at line ") {
        Some((head, _)) => head.to_string(),
        None => text.clone(),
    };

    let mut errors = FieldErrors::new();
    errors.insert(field, vec![capitalize(&message)]);
    errors
}

/// Flatten `validator` errors into dotted camelCase paths.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    let mut out = FieldErrors::new();
    flatten("", errors, &mut out);
    out
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut FieldErrors) {
    for (field, kind) in errors.errors() {
        let name = camel_case(&field.to_string());
        let path = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}.{name}")
        };

        match kind {
            ValidationErrorsKind::Field(list) => {
                out.entry(path).or_default().extend(list.iter().map(message_for));
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{path}.{index}"), inner, out);
                }
            }
        }
    }
}

/// Human message for one rule violation.
fn message_for(err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    let param = |name: &str| err.params.get(name).map(|v| v.to_string());
    match err.code.as_ref() {
        "length" => match (param("equal"), param("min"), param("max")) {
            (Some(n), _, _) => format!("Must be exactly {n} characters"),
            (None, Some(min), None) => format!("Must be at least {min} characters"),
            (None, None, Some(max)) => format!("Must be at most {max} characters"),
            (None, Some(min), Some(max)) => format!("Must be between {min} and {max} characters"),
            (None, None, None) => "Has an invalid length".to_string(),
        },
        "range" => match (param("min"), param("max")) {
            (Some(min), None) => format!("Must be at least {min}"),
            (None, Some(max)) => format!("Must be at most {max}"),
            (Some(min), Some(max)) => format!("Must be between {min} and {max}"),
            (None, None) => "Is out of range".to_string(),
        },
        "email" => "Must be a valid email address".to_string(),
        "url" => "Must be a valid URL".to_string(),
        "required" => "Is required".to_string(),
        "regex" => "Has an invalid format".to_string(),
        code => format!("Failed the {code} rule"),
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Signup {
        #[validate(email(message = "Invalid email address"))]
        email: String,
        #[validate(length(min = 8))]
        password: String,
        #[validate(nested)]
        home_address: Option<Address>,
    }

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Address {
        #[validate(length(min = 1, max = 10))]
        postal_code: String,
    }

    fn errors_of(result: ApiResult<Signup>) -> FieldErrors {
        match result {
            Err(ApiError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_body() {
        let body = br#"{"email":"a@b.co","password":"longenough"}"#;
        let signup: Signup = parse_body(body).unwrap();
        assert_eq!(signup.email, "a@b.co");
    }

    #[test]
    fn test_malformed_json_is_distinct() {
        assert!(matches!(parse_body::<Signup>(b"{not json"), Err(ApiError::InvalidJson)));
        assert!(matches!(parse_body::<Signup>(b"  "), Err(ApiError::InvalidJson)));
    }

    #[test]
    fn test_rule_violations_are_keyed_by_field() {
        let errors = errors_of(parse_body(br#"{"email":"nope","password":"short"}"#));
        assert_eq!(errors["email"], vec!["Invalid email address".to_string()]);
        assert_eq!(errors["password"], vec!["Must be at least 8 characters".to_string()]);
    }

    #[test]
    fn test_nested_paths_are_dotted_camel_case() {
        let body = br#"{"email":"a@b.co","password":"longenough","homeAddress":{"postalCode":""}}"#;
        let errors = errors_of(parse_body(body));
        assert_eq!(
            errors["homeAddress.postalCode"],
            vec!["Must be between 1 and 10 characters".to_string()]
        );
    }

    #[test]
    fn test_missing_field_is_reported_under_its_name() {
        let errors = errors_of(parse_body(br#"{"email":"a@b.co"}"#));
        let messages = &errors["password"];
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Missing field"), "{messages:?}");
    }

    #[test]
    fn test_wrong_type_falls_back_to_body_key() {
        let errors = errors_of(parse_body(br#"{"email":5,"password":"longenough"}"#));
        assert!(errors.contains_key("body"));
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("due_date"), "dueDate");
        assert_eq!(camel_case("email"), "email");
        assert_eq!(camel_case("_private"), "private");
    }
}
