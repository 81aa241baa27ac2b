use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type Result<T, E = AppError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Please log in to access this page")]
    Unauthenticated,

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("No file selected")]
    EmptyFile,

    #[error("Please select a batch")]
    MissingBatch,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),

    /// Any other error, sent back to an explicit page instead of its default.
    #[error("{inner}")]
    Redirect { inner: Box<AppError>, to: String },
}

impl AppError {
    /// Attaches the page the client should return to after seeing the notice.
    pub fn redirect_to(self, to: impl Into<String>) -> Self {
        let inner = match self {
            AppError::Redirect { inner, .. } => inner,
            other => Box::new(other),
        };
        AppError::Redirect {
            inner,
            to: to.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::DuplicateUsername => "duplicate_username",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::EmptyFile => "empty_file",
            AppError::MissingBatch => "missing_batch",
            AppError::Validation(_) => "validation_error",
            AppError::Database(_) | AppError::Internal(_) => "internal_error",
            AppError::Redirect { inner, .. } => inner.code(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateUsername => StatusCode::CONFLICT,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthenticated | AppError::Forbidden => StatusCode::SEE_OTHER,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmptyFile | AppError::MissingBatch | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Redirect { inner, .. } => inner.status(),
        }
    }

    fn default_redirect(&self) -> &'static str {
        match self {
            AppError::DuplicateUsername => "/register",
            AppError::InvalidCredentials | AppError::Unauthenticated | AppError::Forbidden => {
                "/login"
            }
            AppError::EmptyFile => "/admin/dashboard",
            _ => "/",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (error, redirect) = match self {
            AppError::Redirect { inner, to } => (*inner, to),
            other => {
                let to = other.default_redirect().to_string();
                (other, to)
            }
        };

        let notice = match &error {
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "Something went wrong. Please try again.".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        };

        let status = error.status();
        let body = Json(json!({
            "error": error.code(),
            "notice": notice,
            "redirect": redirect,
        }));

        if status == StatusCode::SEE_OTHER {
            (status, [(header::LOCATION, redirect)], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}
