use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;

use crate::messaging::DispatchError;
use crate::uploads::UploadError;

/// Error type shared by the store, the collaborators and the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    fn code(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Upload(UploadError::Unsupported(_) | UploadError::Decode(_)) => {
                "VALIDATION_ERROR"
            }
            AppError::Dispatch(DispatchError::MissingPhone | DispatchError::EmptyMessage) => {
                "VALIDATION_ERROR"
            }
            AppError::Dispatch(_) => "DISPATCH_FAILED",
            _ => "INTERNAL_ERROR",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upload(UploadError::Unsupported(_) | UploadError::Decode(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Dispatch(DispatchError::MissingPhone | DispatchError::EmptyMessage) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Dispatch(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "request failed");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(json!({
            "message": message,
            "code": self.code(),
        }))
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_bad_request() {
        let err = AppError::Validation("Product name cannot be empty".into());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "VALIDATION_ERROR");
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = AppError::NotFound { entity: "Product", id: 7 };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "Product with id 7 not found");
    }

    #[test]
    fn dispatch_failures_are_reported_as_bad_gateway() {
        let err = AppError::from(DispatchError::Client("browser exited with 1".into()));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }
}
