//! HTTP response building helpers
//!
//! Every JSON body uses the same envelope:
//! `{ "success": true, "data": ... }` or
//! `{ "success": false, "error": { "code": ..., "message": ... } }`.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{header, Response, StatusCode};
use serde::Serialize;

use crate::error::StorageError;

/// Success envelope
#[derive(Debug, Serialize)]
pub struct ApiSuccess<'a, T: Serialize> {
    pub success: bool,
    pub data: &'a T,
}

/// Failure envelope
#[derive(Debug, Serialize)]
pub struct ApiFailure<'a> {
    pub success: bool,
    pub error: ApiErrorBody<'a>,
}

#[derive(Debug, Serialize)]
pub struct ApiErrorBody<'a> {
    pub code: &'a str,
    pub message: &'a str,
}

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

/// Build a 200 OK success envelope around `data`
pub fn ok<T: Serialize>(data: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &ApiSuccess { success: true, data })
}

/// Build a failure envelope
pub fn failure(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &ApiFailure {
            success: false,
            error: ApiErrorBody { code, message },
        },
    )
}

/// Build a 404 Not Found response with message
pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    failure(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// Build a 400 Bad Request response with message
pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    failure(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
}

/// Build a 401 Unauthorized response with message
pub fn unauthorized(message: &str) -> Response<Full<Bytes>> {
    failure(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", message)
}

/// Build a 405 Method Not Allowed response
pub fn method_not_allowed() -> Response<Full<Bytes>> {
    failure(StatusCode::METHOD_NOT_ALLOWED, "METHOD_NOT_ALLOWED", "Method not allowed")
}

/// Convert a StorageError to an appropriate HTTP response
pub fn error_response(error: StorageError) -> Response<Full<Bytes>> {
    let status = match &error {
        StorageError::NotFound(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StorageError::StoreAccess(_) => StatusCode::SERVICE_UNAVAILABLE,
        // Client went away; nobody reads this
        StorageError::Cancelled => StatusCode::REQUEST_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    // Invariant details name other users' ids; keep them in the logs
    let message = match &error {
        StorageError::InvariantViolation { .. } => "Internal consistency check failed".to_string(),
        other => other.to_string(),
    };

    failure(status, error.code(), &message)
}

/// Wrap a service result into an HTTP response
pub fn from_result<T: Serialize>(result: Result<T, StorageError>) -> Response<Full<Bytes>> {
    match result {
        Ok(value) => ok(&value),
        Err(e) => error_response(e),
    }
}
