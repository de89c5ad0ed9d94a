//! HTTP protocol layer module
//!
//! Request and response types shared by the hyper server and the API
//! Gateway event runner, decoupled from the handlers.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::{parse_query, strip_stage_prefix, ApiRequest};
pub use response::{build_400_response, build_413_response, ApiResponse, CORS_HEADERS};
