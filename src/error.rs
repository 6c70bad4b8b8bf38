use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Failures raised by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Mongo(#[from] mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error("malformed stored document: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("Unauthorized access")]
    Unauthorized,
    #[error("{0}")]
    NotFound(String),
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("failed to issue session token: {0}")]
    TokenIssue(#[from] jsonwebtoken::errors::Error),
}

impl ApiError {
    fn client_message(&self) -> String {
        match self {
            ApiError::Storage(_) | ApiError::TokenIssue(_) => "Server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Storage(_) | ApiError::TokenIssue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("{}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.client_message() }))
    }
}
