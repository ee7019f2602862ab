use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AppError {
    #[error("dish not found: {0}")]
    NotFound(String),

    #[error("invalid vote value: {0}")]
    InvalidVote(String),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to hand back to an untrusted caller.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound(id) => format!("Dish '{id}' does not exist."),
            Self::InvalidVote(value) => {
                format!("Vote must be \"good\" or \"bad\", got \"{value}\".")
            }
            Self::MalformedRequest(detail) => format!("Malformed request: {detail}"),
            Self::Conflict(detail) => format!("Conflict: {detail}"),
            Self::StoreUnavailable(_) | Self::Internal(_) => {
                "Something went wrong on our side. Try again later.".to_string()
            }
        }
    }

    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::Internal(_))
    }
}

#[cfg(feature = "server")]
mod server_impl {
    use super::AppError;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::Json;

    #[derive(serde::Serialize)]
    struct ErrorResponse {
        error: String,
    }

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::InvalidVote(_) => StatusCode::BAD_REQUEST,
                AppError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
                AppError::Conflict(_) => StatusCode::CONFLICT,
                AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
                AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            if self.is_server_error() {
                tracing::error!(error = %self, "request failed");
            }
            let status = self.status_code();
            let body = ErrorResponse {
                error: self.user_message(),
            };
            (status, Json(body)).into_response()
        }
    }
}
