//! Request handler module
//!
//! Bridges hyper requests to the transport-independent API dispatcher.

pub mod router;

// Re-export main entry point
pub use router::handle_request;
