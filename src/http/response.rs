//! HTTP response building module
//!
//! [`ApiResponse`] is what the dispatcher returns; it is turned into a hyper
//! response here or into an API Gateway proxy response by `api::event`.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use crate::logger;

/// Wildcard CORS headers sent with every response
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Headers", "*"),
    ("Access-Control-Allow-Methods", "*"),
];

/// Transport-independent response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    /// JSON response with the CORS headers
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(json) => Self {
                status,
                headers: json_headers(),
                body: json,
            },
            Err(e) => {
                logger::log_error(&format!("Failed to serialize response: {e}"));
                Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    headers: json_headers(),
                    body: r#"{"error":"Internal server error"}"#.to_string(),
                }
            }
        }
    }

    /// `{"error": message}` with the given status
    pub fn error(status: StatusCode, message: &str) -> Self {
        Self::json(status, &serde_json::json!({ "error": message }))
    }

    /// CORS preflight: 200, CORS headers only, empty body
    pub fn preflight() -> Self {
        Self {
            status: StatusCode::OK,
            headers: cors_headers(),
            body: String::new(),
        }
    }

    #[cfg(test)]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Convert into a hyper response, adding a `Server` header
    pub fn into_hyper(self, server_name: &str) -> Response<Full<Bytes>> {
        let status = self.status;
        let mut builder = Response::builder()
            .status(status)
            .header("Server", server_name);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|e| {
                log_build_error(status.as_str(), &e);
                let mut fallback = Response::new(Full::new(Bytes::new()));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

fn cors_headers() -> Vec<(String, String)> {
    CORS_HEADERS
        .iter()
        .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
        .collect()
}

fn json_headers() -> Vec<(String, String)> {
    let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
    headers.extend(cors_headers());
    headers
}

/// Build 413 Payload Too Large response
pub fn build_413_response(max_body_size: u64) -> ApiResponse {
    ApiResponse::error(
        StatusCode::PAYLOAD_TOO_LARGE,
        &format!("Request body exceeds {max_body_size} bytes"),
    )
}

/// Build 400 Bad Request response
pub fn build_400_response(message: &str) -> ApiResponse {
    ApiResponse::error(StatusCode::BAD_REQUEST, message)
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    logger::log_error(&format!("Failed to build {status} response: {error}"));
}
