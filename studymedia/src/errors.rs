use crate::db::errors::DbError;
use crate::media::MediaError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Request body exceeds the configured limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Media pipeline error that reached the request boundary
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Media(media_err) if media_err.is_client_error() => StatusCode::BAD_REQUEST,
            Error::Media(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { .. } => "Resource already exists".to_string(),
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { .. } => "Invalid data provided".to_string(),
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Media(media_err) if media_err.is_client_error() => media_err.to_string(),
            Error::Media(_) => "Failed to process media".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Media(e) if !e.is_client_error() => {
                tracing::error!("Media processing error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } | Error::PayloadTooLarge { .. } | Error::Media(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_errors_map_by_cause() {
        let client = Error::Media(MediaError::TooManyFiles { max: 5, got: 7 });
        assert_eq!(client.status_code(), StatusCode::BAD_REQUEST);
        assert!(client.user_message().contains("at most 5"));

        let server = Error::Media(MediaError::MissingApiKey);
        assert_eq!(server.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(server.user_message(), "Failed to process media");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = Error::Internal {
            operation: "connect to postgres://secret@db".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");
        assert!(err.to_string().contains("connect to"));

        let not_found = Error::NotFound {
            resource: "Post".to_string(),
            id: "abc".to_string(),
        };
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.user_message(), "Post with ID abc not found");
    }
}
