//! Request routing dispatch module
//!
//! Entry point for HTTP requests from hyper: enforces the body size limit,
//! reduces the request to an [`ApiRequest`], dispatches it and writes the
//! access log line.

use crate::api;
use crate::config::AppState;
use crate::http::{self, ApiRequest, ApiResponse};
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::{Request, Response, Version};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

/// Main entry point for HTTP request handling
pub async fn handle_request(
    req: Request<Incoming>,
    state: Arc<AppState>,
    peer_addr: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let mut entry = access_entry(&req, peer_addr);

    let max_body_size = state.config.http.max_body_size;
    let response = match check_body_size(&req, max_body_size) {
        Some(resp) => resp,
        None => match read_request(req, max_body_size).await {
            Ok(mut api_req) => {
                if let Some(stage) = state.config.http.stage.as_deref() {
                    api_req.strip_stage(stage);
                }
                entry.path.clone_from(&api_req.path);
                api::dispatch(&api_req, &state.store).await
            }
            Err(resp) => resp,
        },
    };

    if state.config.logging.access_log {
        entry.finish(response.status.as_u16(), response.body.len());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response.into_hyper(&state.config.http.server_name))
}

fn access_entry(req: &Request<Incoming>, peer_addr: SocketAddr) -> AccessLogEntry {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string)
    };

    let mut entry = AccessLogEntry::new(
        peer_addr.ip().to_string(),
        req.method().to_string(),
        req.uri().path().to_string(),
    );
    entry.query = req.uri().query().map(ToString::to_string);
    entry.http_version = version_label(req.version()).to_string();
    entry.referer = header("referer");
    entry.user_agent = header("user-agent");
    entry
}

const fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "0.9",
        Version::HTTP_10 => "1.0",
        Version::HTTP_2 => "2",
        Version::HTTP_3 => "3",
        _ => "1.1",
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(req: &Request<Incoming>, max_body_size: u64) -> Option<ApiResponse> {
    let content_length = req.headers().get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_warning(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response(max_body_size))
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

/// Collect the body and build the normalized request
async fn read_request(req: Request<Incoming>, max_body_size: u64) -> Result<ApiRequest, ApiResponse> {
    let (parts, body) = req.into_parts();

    let bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            return Err(http::build_400_response("Failed to read request body"));
        }
    };
    // Chunked bodies carry no Content-Length
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > max_body_size {
        return Err(http::build_413_response(max_body_size));
    }

    let api_req = ApiRequest::new(parts.method, parts.uri.path())
        .with_query_string(parts.uri.query().unwrap_or_default());
    if bytes.is_empty() {
        return Ok(api_req);
    }
    Ok(api_req.with_body(String::from_utf8_lossy(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Version::HTTP_10), "1.0");
        assert_eq!(version_label(Version::HTTP_11), "1.1");
        assert_eq!(version_label(Version::HTTP_2), "2");
    }
}
