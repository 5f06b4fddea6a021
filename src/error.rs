use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("You don't have permission to access this meal")]
    Forbidden,

    #[error("Meal not found")]
    MealNotFound,

    #[error("Repository error: {0:#}")]
    Repository(anyhow::Error),

    #[error("Failed to copy image: {0:#}")]
    FailedToCopyImage(anyhow::Error),

    #[error("Failed to generate presigned url: {0:#}")]
    FailedToGeneratePresignedUrl(anyhow::Error),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::MealNotFound => "MEAL_NOT_FOUND",
            AppError::Repository(_) => "REPOSITORY_ERROR",
            AppError::FailedToCopyImage(_) => "FAILED_TO_COPY_IMAGE",
            AppError::FailedToGeneratePresignedUrl(_) => "FAILED_TO_GENERATE_PRESIGNED_URL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::MealNotFound => StatusCode::NOT_FOUND,
            AppError::Repository(_)
            | AppError::FailedToCopyImage(_)
            | AppError::FailedToGeneratePresignedUrl(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            AppError::Repository(_) => "Repository error".into(),
            AppError::FailedToCopyImage(_) => "Failed to copy image".into(),
            AppError::FailedToGeneratePresignedUrl(_) => "Failed to generate presigned url".into(),
            other => other.to_string(),
        }
    }
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        AppError::Validation(e.0)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::warn!(code = self.code(), error = %self, "request rejected");
        }

        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
