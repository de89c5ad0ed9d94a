// Endpoint handlers
//
// None of these authenticate the caller, authorize access to a record or
// filter fields; that is what the demo exists to show.

use hyper::StatusCode;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::error::ApiError;
use super::export::{self, value_text, ExportFormat};
use crate::http::{ApiRequest, ApiResponse};
use crate::logger;
use crate::store::{timestamp_now, Record, User, UserStore};

/// Parse the request body as a JSON object; an absent or empty body is `{}`
fn parse_body(req: &ApiRequest) -> Result<Record, ApiError> {
    let raw = match req.body.as_deref() {
        None | Some("") => return Ok(Record::new()),
        Some(raw) => raw,
    };
    let mut value = serde_json::from_str(raw).map_err(ApiError::invalid_json)?;
    integral_numbers(&mut value);
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::not_an_object(&other)),
    }
}

/// Whole-number floats (`1.0`) become integers, as a JavaScript parser reads them
fn integral_numbers(value: &mut Value) {
    match value {
        Value::Number(n) => {
            let whole = n
                .as_f64()
                .filter(|f| n.is_f64() && f.fract() == 0.0)
                .and_then(|f| format!("{f:.0}").parse::<i64>().ok());
            if let Some(int) = whole {
                *n = int.into();
            }
        }
        Value::Array(items) => items.iter_mut().for_each(integral_numbers),
        Value::Object(map) => map.values_mut().for_each(integral_numbers),
        Value::Null | Value::Bool(_) | Value::String(_) => {}
    }
}

/// Last path segment, used as the record id
fn path_id(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or_default()
}

/// JavaScript-style truthiness for optional body fields
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// `GET /users`: every record, passwords included
pub async fn list_users(store: &RwLock<UserStore>) -> Result<ApiResponse, ApiError> {
    let store = store.read().await;
    Ok(ApiResponse::json(StatusCode::OK, store.all()))
}

/// `POST /users`: every body field lands in the stored record, `isAdmin` included
pub async fn create_user(
    req: &ApiRequest,
    store: &RwLock<UserStore>,
) -> Result<ApiResponse, ApiError> {
    let body = parse_body(req)?;
    let mut store = store.write().await;

    let mut user = User::default();
    user.set("id", Value::String((store.len() + 1).to_string()));
    // Filled from the body below when present
    for field in ["username", "password", "email"] {
        user.reserve(field);
    }
    user.set("isAdmin", Value::Bool(false));
    user.set("ssn", Value::String(String::new()));
    user.set("creditCard", Value::String(String::new()));
    user.set("createdAt", Value::String(timestamp_now()));
    for (key, value) in body {
        user.set(key, value);
    }

    let stored = store.push(user);
    Ok(ApiResponse::json(StatusCode::CREATED, stored))
}

/// `GET /users/{id}`: any caller can read any record
pub async fn get_user(
    req: &ApiRequest,
    store: &RwLock<UserStore>,
) -> Result<ApiResponse, ApiError> {
    let store = store.read().await;
    Ok(match store.find(path_id(&req.path)) {
        Some(user) => ApiResponse::json(StatusCode::OK, user),
        None => ApiResponse::error(StatusCode::NOT_FOUND, "User not found"),
    })
}

/// `PUT /users/{id}`: shallow-merges the body into any caller's record
pub async fn update_user(
    req: &ApiRequest,
    store: &RwLock<UserStore>,
) -> Result<ApiResponse, ApiError> {
    let body = parse_body(req)?;
    let mut store = store.write().await;

    let Some(index) = store.position(path_id(&req.path)) else {
        return Ok(ApiResponse::error(StatusCode::NOT_FOUND, "User not found"));
    };
    Ok(match store.merge(index, body) {
        Some(user) => ApiResponse::json(StatusCode::OK, user),
        None => ApiResponse::error(StatusCode::NOT_FOUND, "User not found"),
    })
}

/// True when the query carries a quote, a comment or a statement separator
pub fn looks_like_injection(query: &str) -> bool {
    query.contains('\'') || query.contains("--") || query.contains(';')
}

/// The SQL string a naive implementation would run
pub fn simulated_sql(query: &str) -> String {
    format!("SELECT * FROM users WHERE username LIKE '%{query}%'")
}

/// `GET /search?query=`: case-insensitive username substring match
pub async fn search_users(
    req: &ApiRequest,
    store: &RwLock<UserStore>,
) -> Result<ApiResponse, ApiError> {
    let query = req.query_param("query").unwrap_or_default();
    let sql = simulated_sql(query);
    logger::log_info(&format!("VULNERABLE SQL: {sql}"));

    let store = store.read().await;

    if looks_like_injection(query) {
        logger::log_warning("POTENTIAL SQL INJECTION DETECTED IN DEMO");
        return Ok(ApiResponse::json(
            StatusCode::OK,
            &json!({
                "message": "SQL Injection vulnerability demonstrated",
                "injectedQuery": sql,
                "note": "In a real scenario, this could expose or modify database data",
                "results": store.all(),
            }),
        ));
    }

    let needle = query.to_lowercase();
    let mut results = Vec::new();
    for user in store.all() {
        let username = match user.get("username") {
            Some(Value::String(name)) => name,
            other => {
                let id = user.get("id").map_or_else(|| "undefined".to_string(), value_text);
                return Err(ApiError::type_mismatch(id, "username", other));
            }
        };
        if username.to_lowercase().contains(&needle) {
            results.push(user);
        }
    }

    Ok(ApiResponse::json(StatusCode::OK, &results))
}

/// `GET /admin/config`: hands out the connection string, API keys and signing secrets
pub async fn get_config(store: &RwLock<UserStore>) -> Result<ApiResponse, ApiError> {
    let store = store.read().await;
    Ok(ApiResponse::json(StatusCode::OK, store.secrets()))
}

/// `POST /data/export`: bulk dump of every record, no rate limit
///
/// The format comes from the `format` query parameter, then a `format` body
/// field, then defaults to `json`. The requested value is echoed back even
/// when it is not a known format.
pub async fn export_data(
    req: &ApiRequest,
    store: &RwLock<UserStore>,
) -> Result<ApiResponse, ApiError> {
    let body = parse_body(req)?;
    let requested = match req.query_param("format") {
        Some(format) if !format.is_empty() => Value::String(format.to_string()),
        _ => body
            .get("format")
            .filter(|value| is_truthy(value))
            .cloned()
            .unwrap_or_else(|| Value::String("json".to_string())),
    };
    let format = requested
        .as_str()
        .map_or(ExportFormat::Json, ExportFormat::from_name);

    let store = store.read().await;
    let users = store.all();
    let data = match format {
        ExportFormat::Csv => Value::String(export::to_csv(users)),
        ExportFormat::Xml => Value::String(export::to_xml(users)),
        ExportFormat::Json => Value::Array(
            users
                .iter()
                .map(|user| Value::Object(user.to_record()))
                .collect(),
        ),
    };

    Ok(ApiResponse::json(
        StatusCode::OK,
        &json!({
            "format": requested,
            "recordCount": users.len(),
            "data": data,
            "timestamp": timestamp_now(),
        }),
    ))
}
