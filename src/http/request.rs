//! Normalized request type
//!
//! Both the hyper server and the API Gateway event runner reduce a request
//! to an [`ApiRequest`] before dispatch.

use hyper::Method;
use std::collections::HashMap;

/// Transport-independent request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    /// Decoded query parameters; the last occurrence of a name wins
    pub query: HashMap<String, String>,
    /// Raw request body, if any
    pub body: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            body: None,
        }
    }

    /// Parse and attach a raw query string (`a=1&b=two%20words`)
    #[must_use]
    pub fn with_query_string(mut self, raw: &str) -> Self {
        self.query = parse_query(raw);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// Strip an API Gateway stage prefix (`/dev/users` -> `/users`)
    pub fn strip_stage(&mut self, stage: &str) {
        if let Some(stripped) = strip_stage_prefix(&self.path, stage) {
            self.path = stripped.to_string();
        }
    }
}

/// Percent-decode a query string into a map
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect()
}

/// `Some(rest)` when `path` starts with `/<stage>/`; the leading slash of `rest` is kept
pub fn strip_stage_prefix<'a>(path: &'a str, stage: &str) -> Option<&'a str> {
    if stage.is_empty() {
        return None;
    }
    let rest = path.strip_prefix('/')?.strip_prefix(stage)?;
    rest.starts_with('/').then_some(rest)
}
