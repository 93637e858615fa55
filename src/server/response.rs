use crate::dispatcher::HandlerResponse;
use crate::error::ApiError;
use may_minihttp::Response;
use tracing::{error, warn};

pub const CONTENT_TYPE_JSON: &str = "Content-Type: application/json";
pub const CONTENT_TYPE_YAML: &str = "Content-Type: text/yaml";
pub const CONTENT_TYPE_HTML: &str = "Content-Type: text/html; charset=utf-8";
pub const CONTENT_TYPE_PROMETHEUS: &str = "Content-Type: text/plain; version=0.0.4; charset=utf-8";

pub(crate) fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        _ => http::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown"),
    }
}

/// Write a successful (or handler-mapped) JSON response.
///
/// 204 and 304 responses are written without a body or content type.
pub fn write_handler_response(res: &mut Response, resp: &HandlerResponse) {
    res.status_code(usize::from(resp.status), status_reason(resp.status));
    if !resp.has_body() {
        return;
    }
    match serde_json::to_vec(&resp.body) {
        Ok(bytes) => {
            res.header(CONTENT_TYPE_JSON);
            res.body_vec(bytes);
        }
        Err(e) => {
            error!(status = resp.status, error = %e, "Failed to encode response body");
            write_error(res, &ApiError::unhandled(format!("response encoding: {e}")));
        }
    }
}

/// The single writer of error responses: status and envelope come from [`ApiError`].
pub fn write_error(res: &mut Response, err: &ApiError) {
    let status = err.status();
    if status >= 500 {
        warn!(status, error = %err, "Responding with server error");
    }
    res.status_code(usize::from(status), status_reason(status));
    res.header(CONTENT_TYPE_JSON);
    res.body_vec(err.body().to_string().into_bytes());
}

/// Write a non-JSON body with a fixed content type header.
pub fn write_raw(res: &mut Response, status: u16, content_type: &'static str, body: Vec<u8>) {
    res.status_code(usize::from(status), status_reason(status));
    res.header(content_type);
    res.body_vec(body);
}
