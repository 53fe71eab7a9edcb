use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Signature token has expired")]
    Expired,

    #[error("Signature token has already been used")]
    AlreadyUsed,

    #[error("Quota exceeded: {current} existing + {requested} requested > limit {limit}")]
    QuotaExceeded { current: u64, requested: u64, limit: u64 },

    #[error("{failed} signature email(s) failed, {sent} sent")]
    PartialSendFailure { sent: usize, failed: usize },

    #[error("Invalid signature payload: {0}")]
    InvalidPayload(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Notifier error: {0}")]
    Notifier(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Expired => "EXPIRED",
            AppError::AlreadyUsed => "ALREADY_USED",
            AppError::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            AppError::PartialSendFailure { .. } => "PARTIAL_SEND_FAILURE",
            AppError::InvalidPayload(_) => "INVALID_PAYLOAD",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Notifier(_) => "NOTIFIER_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Expired => StatusCode::GONE,
            AppError::AlreadyUsed => StatusCode::CONFLICT,
            AppError::QuotaExceeded { .. } => StatusCode::FORBIDDEN,
            AppError::PartialSendFailure { .. } => StatusCode::MULTI_STATUS,
            AppError::InvalidPayload(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Notifier(_) | AppError::Config(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        }

        let mut body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });

        // Le client doit toujours connaître le nombre d'emails envoyés
        if let AppError::PartialSendFailure { sent, failed } = self {
            body["sent_count"] = serde_json::json!(sent);
            body["failed_count"] = serde_json::json!(failed);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Expired.status_code(), StatusCode::GONE);
        assert_eq!(AppError::AlreadyUsed.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::QuotaExceeded { current: 8, requested: 3, limit: 10 }.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::Database(DbErr::Custom("boom".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_quota_message() {
        let err = AppError::QuotaExceeded { current: 8, requested: 3, limit: 10 };
        assert_eq!(
            err.to_string(),
            "Quota exceeded: 8 existing + 3 requested > limit 10"
        );
        assert_eq!(err.code(), "QUOTA_EXCEEDED");
    }
}
