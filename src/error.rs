use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

const INTERNAL_SERVER_ERROR_MESSAGE: &str = "Something goes wrong";

/// Any possible server errors
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    ValidationError(#[from] validator::ValidationErrors),

    #[error(transparent)]
    AxumJsonRejection(#[from] JsonRejection),

    #[error(transparent)]
    AxumPathRejection(#[from] PathRejection),

    #[error(transparent)]
    AxumQueryRejection(#[from] QueryRejection),

    #[error("{0}")]
    InvalidInput(String),

    #[error("No token provided")]
    Unauthenticated,

    #[error("Token no válido o expirado")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    #[error("Contraseña incorrecta")]
    WrongPassword,

    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(&'static str),

    #[error(transparent)]
    SqlxError(#[from] sqlx::Error),

    #[error("password hashing failed: {0}")]
    HashError(String),

    #[error("token encoding failed: {0}")]
    TokenEncodeError(#[source] jsonwebtoken::errors::Error),
}

impl ServerError {
    /// The status code this error is reported with.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::ValidationError(_)
            | ServerError::AxumJsonRejection(_)
            | ServerError::AxumPathRejection(_)
            | ServerError::AxumQueryRejection(_)
            | ServerError::InvalidInput(_)
            | ServerError::Conflict(_) => StatusCode::BAD_REQUEST,
            ServerError::Unauthenticated | ServerError::WrongPassword => StatusCode::UNAUTHORIZED,
            ServerError::InvalidToken(_) => StatusCode::FORBIDDEN,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::SqlxError(_)
            | ServerError::HashError(_)
            | ServerError::TokenEncodeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::ValidationError(_) => {
                format!("Input validation error: [{}]", self).replace('\n', ", ")
            }
            ServerError::InvalidToken(e) => {
                tracing::debug!("Rejected token: {:?}", e);
                self.to_string()
            }
            ServerError::SqlxError(e) => {
                tracing::error!("Sqlx error occurred: {:?}", e);
                INTERNAL_SERVER_ERROR_MESSAGE.into()
            }
            ServerError::HashError(_) | ServerError::TokenEncodeError(_) => {
                tracing::error!("Internal error occurred: {:?}", self);
                INTERNAL_SERVER_ERROR_MESSAGE.into()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
