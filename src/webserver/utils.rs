/// Webserver response helpers
///
/// All API endpoints answer with the same JSON envelopes so clients can
/// rely on one error shape.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::core::AnalyzerError;

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

/// 200 response with a JSON payload
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

/// Error response with a stable machine-readable code
pub fn error_response(status: StatusCode, code: &str, message: &str, hint: Option<&str>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message,
            code,
            hint,
        }),
    )
        .into_response()
}

/// Map a core error to its HTTP status and error code
pub fn status_for(err: &AnalyzerError) -> (StatusCode, &'static str) {
    match err {
        AnalyzerError::InvalidImage(_) => (StatusCode::BAD_REQUEST, "INVALID_IMAGE"),
        AnalyzerError::KeyNotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        AnalyzerError::RateLimit => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
        AnalyzerError::Security(_) => (StatusCode::FORBIDDEN, "SECURITY_ERROR"),
        AnalyzerError::SizeExceeded | AnalyzerError::InsufficientCapacity => {
            (StatusCode::SERVICE_UNAVAILABLE, "RESOURCE_EXHAUSTED")
        }
        AnalyzerError::PoolShutdown => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
        AnalyzerError::Cancelled => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        AnalyzerError::Analysis(_) => (StatusCode::INTERNAL_SERVER_ERROR, "ANALYSIS_ERROR"),
        AnalyzerError::Config(_)
        | AnalyzerError::Serialization(_)
        | AnalyzerError::Io(_)
        | AnalyzerError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    }
}

/// Error response derived from a core error
pub fn core_error_response(err: &AnalyzerError) -> Response {
    let (status, code) = status_for(err);
    error_response(status, code, &err.to_string(), None)
}
