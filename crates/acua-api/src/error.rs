use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use acua_db::StoreError;
use acua_types::api::ErrorBody;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("missing or invalid bearer token")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Store(e) => match e {
                StoreError::NotFound(_) => StatusCode::NOT_FOUND,
                StoreError::NotParticipant => StatusCode::FORBIDDEN,
                StoreError::SelfConversation | StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                StoreError::PollEnded => StatusCode::CONFLICT,
                StoreError::Sqlite(_)
                | StoreError::Json(_)
                | StoreError::Corrupt(_)
                | StoreError::LockPoisoned => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Storage details stay in the log
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
            "internal error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
