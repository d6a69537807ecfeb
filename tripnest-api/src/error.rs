use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use tripnest_core::DomainError;
use tripnest_store::StoreError;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::ValidationError(msg),
            DomainError::NotFound(msg) => AppError::NotFoundError(msg),
            DomainError::Conflict(msg) => AppError::ConflictError(msg),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_error_taxonomy() {
        let cases = [
            (AppError::AuthenticationError("t".into()), StatusCode::UNAUTHORIZED),
            (AppError::AuthorizationError("t".into()), StatusCode::FORBIDDEN),
            (AppError::ValidationError("t".into()), StatusCode::BAD_REQUEST),
            (AppError::NotFoundError("t".into()), StatusCode::NOT_FOUND),
            (AppError::ConflictError("t".into()), StatusCode::CONFLICT),
            (
                AppError::InternalServerError("t".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn domain_errors_map_to_distinct_statuses() {
        let not_found: AppError = DomainError::NotFound("room type".into()).into();
        let invalid: AppError = DomainError::Validation("bad dates".into()).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
