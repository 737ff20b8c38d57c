use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use http::header::{ALLOW, CACHE_CONTROL, PRAGMA, X_CONTENT_TYPE_OPTIONS};

use crate::config::{CACHE_CONTROL_NO_STORE, CONTENT_TYPE_OPTIONS_NOSNIFF, PRAGMA_NO_CACHE};
use crate::db::DatabaseError;

/// Headers attached to every response that made it past request validation.
pub fn no_cache_headers() -> [(http::HeaderName, &'static str); 3] {
    [
        (CACHE_CONTROL, CACHE_CONTROL_NO_STORE),
        (PRAGMA, PRAGMA_NO_CACHE),
        (X_CONTENT_TYPE_OPTIONS, CONTENT_TYPE_OPTIONS_NOSNIFF),
    ]
}

/// Request-scoped failures. None of these ever terminate the process.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Bad Request: Parameters are not allowed")]
    ParametersNotAllowed,

    #[error("Bad Request: Body is not allowed")]
    BodyNotAllowed,

    #[error("Database connection unavailable")]
    DatabaseUnavailable,

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::ParametersNotAllowed | AppError::BodyNotAllowed => StatusCode::BAD_REQUEST,
            AppError::DatabaseUnavailable | AppError::Database(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self {
            AppError::MethodNotAllowed => (status, [(ALLOW, "GET")]).into_response(),
            AppError::ParametersNotAllowed | AppError::BodyNotAllowed => {
                (status, self.to_string()).into_response()
            }
            // Database details stay in the logs, never in the response.
            AppError::DatabaseUnavailable | AppError::Database(_) => {
                (status, no_cache_headers(), "Service Unavailable").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_method_not_allowed_has_empty_body() {
        let response = AppError::MethodNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET");
        assert!(body_string(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_request_bodies() {
        let response = AppError::ParametersNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(CACHE_CONTROL).is_none());
        assert_eq!(
            body_string(response).await,
            "Bad Request: Parameters are not allowed"
        );

        let response = AppError::BodyNotAllowed.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_string(response).await, "Bad Request: Body is not allowed");
    }

    #[tokio::test]
    async fn test_database_errors_hide_detail() {
        let err = AppError::from(DatabaseError::Timeout(Duration::from_secs(5)));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[PRAGMA], PRAGMA_NO_CACHE);
        assert_eq!(body_string(response).await, "Service Unavailable");
    }
}
