//! API Gateway proxy events
//!
//! Normalizes REST API (v1) and HTTP API (v2) proxy payloads into an
//! [`ApiRequest`], runs them through [`dispatch`](super::dispatch) and
//! produces the proxy response shape `{statusCode, headers, body}`.

use hyper::Method;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::export::value_text;
use crate::http::{strip_stage_prefix, ApiRequest, ApiResponse};
use crate::logger::{self, AccessLogEntry};
use crate::store::UserStore;

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event has no string field '{0}'")]
    MissingField(&'static str),
    #[error("event method '{0}' is not a valid HTTP method")]
    InvalidMethod(String),
}

/// Proxy integration response
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<ApiResponse> for ProxyResponse {
    fn from(resp: ApiResponse) -> Self {
        Self {
            status_code: resp.status.as_u16(),
            headers: resp.headers.into_iter().collect(),
            body: resp.body,
        }
    }
}

/// v2 payloads say so in `version` or carry `requestContext.http`
pub fn is_v2(event: &Value) -> bool {
    event.get("version").and_then(Value::as_str) == Some("2.0")
        || event
            .pointer("/requestContext/http")
            .is_some_and(|http| !http.is_null())
}

fn string_at<'a>(event: &'a Value, pointer: &str, name: &'static str) -> Result<&'a str, EventError> {
    event
        .pointer(pointer)
        .and_then(Value::as_str)
        .ok_or(EventError::MissingField(name))
}

/// Build the normalized request for an event
pub fn normalize(event: &Value) -> Result<ApiRequest, EventError> {
    let v2 = is_v2(event);
    let (path, method) = if v2 {
        (
            string_at(event, "/rawPath", "rawPath")?,
            string_at(event, "/requestContext/http/method", "requestContext.http.method")?,
        )
    } else {
        (
            string_at(event, "/path", "path")?,
            string_at(event, "/httpMethod", "httpMethod")?,
        )
    };

    let method = Method::from_bytes(method.as_bytes())
        .map_err(|_| EventError::InvalidMethod(method.to_string()))?;

    let stage = if v2 {
        event.pointer("/requestContext/stage").and_then(Value::as_str)
    } else {
        None
    };
    let path = stage
        .and_then(|stage| strip_stage_prefix(path, stage))
        .unwrap_or(path);

    let mut req = ApiRequest::new(method, path);
    if let Some(params) = event.get("queryStringParameters").and_then(Value::as_object) {
        req.query = params
            .iter()
            .map(|(name, value)| (name.clone(), value_text(value)))
            .collect();
    }
    // Non-string bodies are parsed from their text form, so objects fail as JSON
    req.body = match event.get("body") {
        None | Some(Value::Null | Value::Bool(false)) => None,
        Some(Value::String(body)) => Some(body.clone()),
        Some(other) => Some(value_text(other)),
    };
    Ok(req)
}

/// Handle one proxy event end to end
pub async fn handle_event(
    event: &Value,
    store: &RwLock<UserStore>,
    access_log_format: Option<&str>,
) -> Result<ProxyResponse, EventError> {
    logger::log_debug(&format!(
        "Received event: {}",
        serde_json::to_string_pretty(event).unwrap_or_default()
    ));

    let req = normalize(event)?;
    let mut entry = AccessLogEntry::new("lambda".to_string(), req.method.to_string(), req.path.clone());
    let resp = super::dispatch(&req, store).await;

    if let Some(format) = access_log_format {
        entry.finish(resp.status.as_u16(), resp.body.len());
        logger::log_access(&entry, format);
    }
    Ok(resp.into())
}
