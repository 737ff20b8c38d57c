//! Health check endpoint for container orchestration.
//!
//! `GET /healthz` is both a liveness and a readiness probe: it answers 200 only
//! when the process is up and the database accepts a write. Requests are
//! validated in a fixed order and the first failing check decides the response:
//! method, then query string, then body. Only a request that passes all three
//! touches the database.

use axum::{
    body::HttpBody,
    extract::{Request, State},
    http::Method,
    response::{IntoResponse, Response},
};
use http::header::CONTENT_LENGTH;

use crate::error::{no_cache_headers, AppError};
use crate::state::AppState;

/// Health check handler.
///
/// Writes one row to the health check table per successful request. There is
/// no retry; a failed write yields 503 and the orchestrator polls again.
pub async fn healthz(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, AppError> {
    validate(&request)?;

    let Some(db) = state.db() else {
        tracing::warn!("Health check failed: database connection unavailable");
        return Err(AppError::DatabaseUnavailable);
    };

    if let Err(e) = db.record_health_check().await {
        tracing::error!(error = %e, "Health check failed");
        return Err(e.into());
    }

    Ok((no_cache_headers(), "OK").into_response())
}

/// Run the ordered request checks, stopping at the first failure.
fn validate(request: &Request) -> Result<(), AppError> {
    if request.method() != Method::GET {
        return Err(AppError::MethodNotAllowed);
    }
    if has_query_params(request.uri().query()) {
        return Err(AppError::ParametersNotAllowed);
    }
    if declared_content_length(request) > 0 {
        return Err(AppError::BodyNotAllowed);
    }
    Ok(())
}

/// True if the query string holds at least one parameter.
///
/// Empty pairs are skipped, so `/healthz?` and `/healthz?&` carry no parameters
/// while `/healthz?x` and `/healthz?=1` do. Pairs are not decoded: malformed
/// ones such as `a;b` or `%zz` still count.
fn has_query_params(query: Option<&str>) -> bool {
    query
        .map(|q| q.split('&').any(|pair| !pair.is_empty()))
        .unwrap_or(false)
}

/// Length declared by the `Content-Length` header, falling back to the body's
/// exact size hint. Bodies of unknown length (chunked) count as zero.
fn declared_content_length(request: &Request) -> u64 {
    request
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .or_else(|| request.body().size_hint().exact())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request(method: Method, uri: &str, body: Body) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(body)
            .unwrap()
    }

    #[test]
    fn test_query_params_detection() {
        assert!(!has_query_params(None));
        assert!(!has_query_params(Some("")));
        assert!(!has_query_params(Some("&")));
        assert!(!has_query_params(Some("&&")));
        assert!(has_query_params(Some("x=1")));
        assert!(has_query_params(Some("x")));
        assert!(has_query_params(Some("=1")));
        assert!(has_query_params(Some("&x=1&")));
    }

    #[test]
    fn test_undecodable_query_still_rejected() {
        assert!(has_query_params(Some("a;b")));
        assert!(has_query_params(Some("%zz")));

        let req = request(Method::GET, "/healthz?%zz", Body::empty());
        assert!(matches!(validate(&req), Err(AppError::ParametersNotAllowed)));
    }

    #[test]
    fn test_content_length_from_header() {
        let req = http::Request::builder()
            .uri("/healthz")
            .header(CONTENT_LENGTH, "17")
            .body(Body::empty())
            .unwrap();
        assert_eq!(declared_content_length(&req), 17);
    }

    #[test]
    fn test_content_length_from_body() {
        let req = request(Method::GET, "/healthz", Body::from("{}"));
        assert_eq!(declared_content_length(&req), 2);

        let req = request(Method::GET, "/healthz", Body::empty());
        assert_eq!(declared_content_length(&req), 0);
    }

    #[test]
    fn test_zero_content_length_header_allowed() {
        let req = http::Request::builder()
            .uri("/healthz")
            .header(CONTENT_LENGTH, "0")
            .body(Body::empty())
            .unwrap();
        assert!(validate(&req).is_ok());
    }

    #[test]
    fn test_method_checked_before_query_and_body() {
        let req = request(Method::POST, "/healthz?x=1", Body::from("{}"));
        assert!(matches!(validate(&req), Err(AppError::MethodNotAllowed)));

        let req = request(Method::HEAD, "/healthz", Body::empty());
        assert!(matches!(validate(&req), Err(AppError::MethodNotAllowed)));
    }

    #[test]
    fn test_query_checked_before_body() {
        let req = request(Method::GET, "/healthz?x=1", Body::from("{}"));
        assert!(matches!(validate(&req), Err(AppError::ParametersNotAllowed)));
    }

    #[test]
    fn test_body_rejected() {
        let req = request(Method::GET, "/healthz", Body::from("{}"));
        assert!(matches!(validate(&req), Err(AppError::BodyNotAllowed)));
    }

    #[test]
    fn test_bare_get_passes() {
        let req = request(Method::GET, "/healthz", Body::empty());
        assert!(validate(&req).is_ok());

        let req = request(Method::GET, "/healthz?", Body::empty());
        assert!(validate(&req).is_ok());
    }

    #[tokio::test]
    async fn test_absent_handle_is_unavailable() {
        let req = request(Method::GET, "/healthz", Body::empty());
        let result = healthz(State(AppState::default()), req).await;
        assert!(matches!(result, Err(AppError::DatabaseUnavailable)));
    }
}
