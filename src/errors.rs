use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

#[derive(Debug)]
pub enum RequestError {
    /// Missing or malformed request data.
    Validation(&'static str),
    NotAuthorized(&'static str),
    Forbidden(&'static str),
    NotFound(&'static str),
    ServerError,
    DatabaseError(sqlx::Error),
}

#[derive(serde::Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: &str) -> ErrorBody {
        ErrorBody {
            success: false,
            message: message.to_string(),
        }
    }
}

impl From<sqlx::Error> for RequestError {
    fn from(value: sqlx::Error) -> Self {
        Self::DatabaseError(value)
    }
}

impl RequestError {
    /// True when the underlying database error is a unique-constraint
    /// violation. The like toggle leans on this as its concurrency signal.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            RequestError::DatabaseError(sqlx::Error::Database(e)) => {
                e.message().contains("UNIQUE constraint failed")
            }
            _ => false,
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<ErrorBody> {
        let (status_code, json) = match self {
            RequestError::Validation(message) => {
                (StatusCode::BAD_REQUEST, ErrorBody::new(message))
            }
            RequestError::NotAuthorized(message) => {
                (StatusCode::UNAUTHORIZED, ErrorBody::new(message))
            }
            RequestError::Forbidden(message) => (StatusCode::FORBIDDEN, ErrorBody::new(message)),
            RequestError::NotFound(message) => (StatusCode::NOT_FOUND, ErrorBody::new(message)),
            RequestError::ServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Internal server error"),
            ),
            RequestError::DatabaseError(e) => {
                tracing::error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody::new("Internal server error"),
                )
            }
        };
        (status_code, Json(json))
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: RequestError) -> StatusCode {
        err.to_json_response().0
    }

    #[test]
    fn taxonomy_maps_to_expected_status_codes() {
        assert_eq!(
            status_of(RequestError::Validation("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(RequestError::NotAuthorized("no token")),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(RequestError::Forbidden("not yours")),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(RequestError::NotFound("missing")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RequestError::ServerError),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn database_error_is_masked_as_internal() {
        let err = RequestError::from(sqlx::Error::RowNotFound);
        let (status, Json(body)) = err.to_json_response();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.success);
        assert_eq!(body.message, "Internal server error");
    }
}
