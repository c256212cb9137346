//! Canned responses
//!
//! Used where no request context exists yet, such as rejecting a body
//! before routing.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};

pub const NOT_FOUND_BODY: &str = "404 Not Found";
pub const INTERNAL_ERROR_BODY: &str = "500 Internal Server Error";

/// Plain-text response with `status`.
pub fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap_or_else(|e| {
            tracing::error!(%status, error = %e, "failed to build response");
            Response::new(Full::new(Bytes::from_static(body.as_bytes())))
        })
}

pub fn build_400_response() -> Response<Full<Bytes>> {
    plain(StatusCode::BAD_REQUEST, "400 Bad Request")
}

pub fn build_413_response() -> Response<Full<Bytes>> {
    plain(StatusCode::PAYLOAD_TOO_LARGE, "413 Payload Too Large")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_response() {
        let response = build_413_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }
}
