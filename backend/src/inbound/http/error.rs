//! Domain errors on the wire.
//!
//! Every failure leaves the API as the same JSON envelope: `code`, `message`,
//! optional `traceId` and `details`. Extractor rejections are folded into
//! that envelope too.

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode, web};
use serde_json::json;
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Result type returned by every handler.
pub type ApiResult<T> = Result<T, Error>;

const INTERNAL_MESSAGE: &str = "Internal server error";
const JSON_BODY_LIMIT: usize = 64 * 1024;

/// What the client sees. Internal failures keep only their trace id; the
/// original message and details stay in the server log.
fn client_payload(error: &Error) -> Error {
    if error.code() != ErrorCode::InternalError {
        return error.clone();
    }
    error!(message = error.message(), trace_id = ?error.trace_id(), "request failed internally");
    let public = Error::internal(INTERNAL_MESSAGE);
    match error.trace_id() {
        Some(id) => public.with_trace_id(id),
        None => public,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.code() {
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::Forbidden => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::InvalidTransition => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            response.insert_header((TRACE_ID_HEADER, id));
        }
        response.json(client_payload(self))
    }
}

fn malformed(kind: &'static str, detail: String) -> actix_web::Error {
    Error::invalid_request(format!("malformed {kind}"))
        .with_details(json!({ "reason": detail, "code": format!("malformed_{kind}") }))
        .into()
}

/// Body, query and path extractor settings that answer with the JSON error
/// envelope instead of Actix's plain-text rejections.
pub fn configure_extractors(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_BODY_LIMIT)
            .error_handler(|err: JsonPayloadError, _: &HttpRequest| malformed("body", err.to_string())),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err: QueryPayloadError, _: &HttpRequest| {
                malformed("query", err.to_string())
            }),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err: PathError, _: &HttpRequest| malformed("path", err.to_string())),
    );
}

#[cfg(test)]
mod tests;
