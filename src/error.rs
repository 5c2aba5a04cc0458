use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by handlers and services, each mapped to one HTTP status.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Username already registered")]
    DuplicateUsername,

    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// No usable `Authorization: Bearer` header.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Bad signature, expired, or missing subject.
    #[error("Could not validate credentials")]
    InvalidToken,

    /// Token was valid but its subject no longer exists.
    #[error("Could not validate credentials")]
    UnknownUser,

    /// Absent record, or present but owned by someone else.
    #[error("{0}")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DuplicateUsername | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated | Self::InvalidToken | Self::UnknownUser => {
                StatusCode::UNAUTHORIZED
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = match &self {
            Self::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        };
        let body = Json(json!({ "detail": detail }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::DuplicateUsername.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidToken.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UnknownUser.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::NotFound("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Validation("bad".into()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn unauthorized_carries_bearer_challenge() {
        for err in [AppError::NotAuthenticated, AppError::InvalidToken, AppError::UnknownUser] {
            let res = err.into_response();
            assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(res.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
        }
    }

    #[test]
    fn other_errors_have_no_challenge() {
        let res = AppError::NotFound("Recipe not found").into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(res.headers().get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn internal_error_detail_is_not_leaked() {
        let res = AppError::Internal(anyhow::anyhow!("db password is hunter2")).into_response();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "Internal Server Error");
    }
}
