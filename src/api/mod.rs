// API module entry
// Route table for the demo endpoints and the top-level error envelope

mod error;
pub mod event;
mod export;
mod handlers;

use hyper::{Method, StatusCode};
use tokio::sync::RwLock;

use crate::http::{ApiRequest, ApiResponse};
use crate::logger;
use crate::store::UserStore;
use error::ApiError;

/// Known endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    ListUsers,
    CreateUser,
    GetUser,
    UpdateUser,
    SearchUsers,
    AdminConfig,
    ExportData,
}

impl Route {
    /// Match a method and path; `None` means 404
    pub fn resolve(method: &Method, path: &str) -> Option<Self> {
        match (method, path) {
            (&Method::GET, "/users") => Some(Self::ListUsers),
            (&Method::POST, "/users") => Some(Self::CreateUser),
            (&Method::GET, "/search") => Some(Self::SearchUsers),
            (&Method::GET, "/admin/config") => Some(Self::AdminConfig),
            (&Method::POST, "/data/export") => Some(Self::ExportData),
            (&Method::GET, p) if is_user_path(p) => Some(Self::GetUser),
            (&Method::PUT, p) if is_user_path(p) => Some(Self::UpdateUser),
            _ => None,
        }
    }
}

/// `/users/{id}` with a single non-empty segment
fn is_user_path(path: &str) -> bool {
    path.strip_prefix("/users/")
        .is_some_and(|id| !id.is_empty() && !id.contains('/'))
}

/// Dispatch a request to its handler
///
/// OPTIONS on any path is a CORS preflight. Handler errors become a 500
/// carrying the error message and backtrace.
pub async fn dispatch(req: &ApiRequest, store: &RwLock<UserStore>) -> ApiResponse {
    if req.method == Method::OPTIONS {
        return ApiResponse::preflight();
    }

    let result = match Route::resolve(&req.method, &req.path) {
        Some(Route::ListUsers) => handlers::list_users(store).await,
        Some(Route::CreateUser) => handlers::create_user(req, store).await,
        Some(Route::GetUser) => handlers::get_user(req, store).await,
        Some(Route::UpdateUser) => handlers::update_user(req, store).await,
        Some(Route::SearchUsers) => handlers::search_users(req, store).await,
        Some(Route::AdminConfig) => handlers::get_config(store).await,
        Some(Route::ExportData) => handlers::export_data(req, store).await,
        None => Ok(ApiResponse::error(StatusCode::NOT_FOUND, "Not found")),
    };

    result.unwrap_or_else(|err| error_response(&err))
}

fn error_response(err: &ApiError) -> ApiResponse {
    logger::log_error(&format!("Request failed: {err}"));
    ApiResponse::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &serde_json::json!({
            "error": err.to_string(),
            "stack": err.stack(),
            "details": "Internal server error",
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::CORS_HEADERS;
    use crate::store::{builtin_users, User};
    use serde_json::Value;

    fn store() -> RwLock<UserStore> {
        RwLock::new(UserStore::seeded())
    }

    fn body_json(resp: &ApiResponse) -> Value {
        serde_json::from_str(&resp.body).unwrap()
    }

    async fn call(store: &RwLock<UserStore>, req: ApiRequest) -> (StatusCode, Value) {
        let resp = dispatch(&req, store).await;
        let body = if resp.body.is_empty() {
            Value::Null
        } else {
            body_json(&resp)
        };
        (resp.status, body)
    }

    #[test]
    fn test_route_resolution() {
        assert_eq!(Route::resolve(&Method::GET, "/users"), Some(Route::ListUsers));
        assert_eq!(Route::resolve(&Method::POST, "/users"), Some(Route::CreateUser));
        assert_eq!(Route::resolve(&Method::GET, "/users/abc"), Some(Route::GetUser));
        assert_eq!(Route::resolve(&Method::PUT, "/users/1"), Some(Route::UpdateUser));
        assert_eq!(Route::resolve(&Method::GET, "/users/1/x"), None);
        assert_eq!(Route::resolve(&Method::GET, "/users/"), None);
        assert_eq!(Route::resolve(&Method::DELETE, "/users/1"), None);
        assert_eq!(Route::resolve(&Method::POST, "/admin/config"), None);
        assert_eq!(Route::resolve(&Method::GET, "/data/export"), None);
    }

    #[tokio::test]
    async fn test_list_returns_seed_with_passwords() {
        let store = store();
        let (status, body) = call(&store, ApiRequest::new(Method::GET, "/users")).await;
        assert_eq!(status, StatusCode::OK);

        let listed = body.as_array().unwrap();
        let seed = builtin_users();
        assert_eq!(listed.len(), seed.len());
        for (user, expected) in listed.iter().zip(&seed) {
            for (key, value) in expected {
                assert_eq!(&user[key], value, "field {key}");
            }
        }
        assert_eq!(listed[1]["password"], "password123");
    }

    #[tokio::test]
    async fn test_mass_assignment_sets_admin() {
        let store = store();
        let req = ApiRequest::new(Method::POST, "/users")
            .with_body(r#"{"username":"mallory","password":"x","isAdmin":true}"#);
        let (status, created) = call(&store, req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["isAdmin"], true);

        let (_, stored) = call(&store, ApiRequest::new(Method::GET, "/users/4")).await;
        assert_eq!(stored["isAdmin"], true);
        assert_eq!(stored["username"], "mallory");
    }

    #[tokio::test]
    async fn test_any_caller_reads_any_user() {
        let store = store();
        for id in ["1", "2", "3"] {
            let (status, user) =
                call(&store, ApiRequest::new(Method::GET, format!("/users/{id}"))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(user["id"], id);
            assert!(user["ssn"].is_string());
        }

        let (status, body) = call(&store, ApiRequest::new(Method::GET, "/users/42")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn test_update_is_shallow_merge() {
        let store = store();
        let before = store.read().await.find("3").map(User::to_record).unwrap();

        let req = ApiRequest::new(Method::PUT, "/users/3")
            .with_body(r#"{"email":"owned@evil.test","isAdmin":true,"prefs":{"theme":"dark"}}"#);
        let (status, merged) = call(&store, req).await;
        assert_eq!(status, StatusCode::OK);

        let merged = merged.as_object().unwrap();
        assert_eq!(merged["email"], "owned@evil.test");
        assert_eq!(merged["isAdmin"], true);
        assert_eq!(merged["prefs"]["theme"], "dark");
        for key in ["id", "username", "password", "ssn", "creditCard", "createdAt"] {
            assert_eq!(merged[key], before[key], "field {key} changed");
        }
        assert_eq!(merged.len(), before.len() + 1);
    }

    #[tokio::test]
    async fn test_injection_branch_returns_everything() {
        let store = store();
        let req = ApiRequest::new(Method::GET, "/search").with_query_string("query='%20OR%201=1");
        let (status, body) = call(&store, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "SQL Injection vulnerability demonstrated");
        assert_eq!(
            body["injectedQuery"],
            "SELECT * FROM users WHERE username LIKE '%' OR 1=1%'"
        );
        assert_eq!(body["results"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_csv_export_shape() {
        let store = store();
        let req = ApiRequest::new(Method::POST, "/data/export").with_query_string("format=csv");
        let (status, body) = call(&store, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["format"], "csv");
        assert_eq!(body["recordCount"], 3);

        let csv = body["data"].as_str().unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "id,username,password,email,isAdmin,ssn,creditCard,createdAt"
        );
        assert!(lines[1].starts_with(r#""1","admin","admin123","admin@example.com","true","#));
        for row in &lines[1..] {
            assert_eq!(row.matches("\",\"").count(), 7, "row {row}");
        }
    }

    #[tokio::test]
    async fn test_options_preflight_any_path() {
        let store = store();
        for path in ["/users", "/nowhere", "/admin/config"] {
            let resp = dispatch(&ApiRequest::new(Method::OPTIONS, path), &store).await;
            assert_eq!(resp.status, StatusCode::OK);
            assert!(resp.body.is_empty());
            for (name, value) in CORS_HEADERS {
                assert_eq!(resp.header(name), Some(value));
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_route_404() {
        let store = store();
        let (status, body) = call(&store, ApiRequest::new(Method::GET, "/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");

        let (status, _) = call(&store, ApiRequest::new(Method::DELETE, "/users/1")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_leaks_error_details() {
        let store = store();
        let req = ApiRequest::new(Method::POST, "/users").with_body("{\"username\": ");
        let resp = dispatch(&req, &store).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.header("Access-Control-Allow-Origin"), Some("*"));

        let body = body_json(&resp);
        assert!(body["error"].as_str().unwrap().starts_with("Unexpected token in JSON"));
        assert!(body["stack"].as_str().unwrap().starts_with("SyntaxError: "));
        assert_eq!(body["details"], "Internal server error");
        assert_eq!(store.read().await.len(), 3);
    }
}
