//! Request boundary: validation, response bodies and the HTTP API.

#[cfg(feature = "http-server")]
pub mod http;
pub mod request;

#[cfg(feature = "http-server")]
pub use http::{AppState, ReloadResponse, router, serve_http};
pub use request::{
    AnalyzeRequest, AnalyzeResponse, ErrorResponse, HealthResponse, RequestError, RootResponse,
    ValidatedRequest,
};
