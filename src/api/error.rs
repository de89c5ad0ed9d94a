// Handler error module
// Every variant carries the backtrace text captured where it was raised, which
// the dispatcher writes straight into the 500 response body.

use std::backtrace::Backtrace;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unexpected token in JSON: {source}")]
    InvalidJson {
        source: serde_json::Error,
        trace: String,
    },
    #[error("request body must be a JSON object, got {found}")]
    NotAnObject {
        found: &'static str,
        trace: String,
    },
    #[error("record {id}: field '{field}' is {found}, expected a string")]
    TypeMismatch {
        id: String,
        field: &'static str,
        found: &'static str,
        trace: String,
    },
}

impl ApiError {
    pub fn invalid_json(source: serde_json::Error) -> Self {
        Self::InvalidJson {
            source,
            trace: capture_trace(),
        }
    }

    pub fn not_an_object(value: &serde_json::Value) -> Self {
        Self::NotAnObject {
            found: json_type_name(value),
            trace: capture_trace(),
        }
    }

    pub fn type_mismatch(id: String, field: &'static str, value: Option<&serde_json::Value>) -> Self {
        Self::TypeMismatch {
            id,
            field,
            found: value.map_or("undefined", json_type_name),
            trace: capture_trace(),
        }
    }

    /// Backtrace text captured when the error was raised
    pub fn trace(&self) -> &str {
        match self {
            Self::InvalidJson { trace, .. }
            | Self::NotAnObject { trace, .. }
            | Self::TypeMismatch { trace, .. } => trace,
        }
    }

    /// Error name, message and backtrace in one string
    pub fn stack(&self) -> String {
        let name = match self {
            Self::InvalidJson { .. } => "SyntaxError",
            Self::NotAnObject { .. } | Self::TypeMismatch { .. } => "TypeError",
        };
        format!("{name}: {self}\n{}", self.trace())
    }
}

fn capture_trace() -> String {
    Backtrace::force_capture().to_string()
}

pub const fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_messages() {
        let err = ApiError::not_an_object(&json!([1, 2]));
        assert_eq!(err.to_string(), "request body must be a JSON object, got an array");

        let err = ApiError::type_mismatch("4".to_string(), "username", Some(&json!(42)));
        assert_eq!(
            err.to_string(),
            "record 4: field 'username' is a number, expected a string"
        );

        let err = ApiError::type_mismatch("5".to_string(), "username", None);
        assert!(err.to_string().contains("is undefined"));
    }

    #[test]
    fn test_stack_starts_with_name() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ApiError::invalid_json(source);
        let stack = err.stack();
        assert!(stack.starts_with("SyntaxError: Unexpected token in JSON"));
        assert!(stack.lines().count() > 1);
    }
}
