use trust_core::error::AppError;
use thiserror::Error;

/// Internal reason for an authentication failure. Logged and audited,
/// never shown to the caller: every variant collapses to a generic
/// Unauthorized externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailureReason {
    /// Unknown email, bad password, or suspended account
    BadCredentials,
    /// Correct password but the account has not completed verification
    PendingVerification,
    /// Token failed signature or structural checks
    InvalidToken,
    /// Token past expiry, or its record expired or revoked
    ExpiredOrRevoked,
    /// Refresh token already exchanged once (replay signal)
    Reused,
}

impl AuthFailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFailureReason::BadCredentials => "bad_credentials",
            AuthFailureReason::PendingVerification => "pending_verification",
            AuthFailureReason::InvalidToken => "invalid_token",
            AuthFailureReason::ExpiredOrRevoked => "expired_or_revoked",
            AuthFailureReason::Reused => "reused",
        }
    }
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0:?}")]
    Authentication(AuthFailureReason),

    #[error("Insufficient permission: {resource}.{action}")]
    Authorization { resource: String, action: String },

    #[error("Rate limit exceeded for {flow}")]
    RateLimited { flow: &'static str },

    #[error("Dependency failure: {0}")]
    Dependency(#[from] anyhow::Error),
}

impl ServiceError {
    /// Store/codec internal errors become DependencyFailure; everything
    /// the caller can trigger stays an ordinary expected variant.
    pub fn dependency(err: impl Into<anyhow::Error>) -> Self {
        ServiceError::Dependency(err.into())
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Dependency(anyhow::Error::new(err))
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Authentication(reason) => {
                AppError::Unauthorized(anyhow::anyhow!(reason.as_str()))
            }
            ServiceError::Authorization { resource, action } => {
                AppError::Forbidden(anyhow::anyhow!("Missing permission {}.{}", resource, action))
            }
            ServiceError::RateLimited { .. } => AppError::TooManyRequests(
                "Too many requests. Please try again later.".to_string(),
                None,
            ),
            ServiceError::Dependency(e) => AppError::InternalError(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authentication_failures_collapse_to_unauthorized() {
        for reason in [
            AuthFailureReason::BadCredentials,
            AuthFailureReason::InvalidToken,
            AuthFailureReason::ExpiredOrRevoked,
            AuthFailureReason::Reused,
        ] {
            let app: AppError = ServiceError::Authentication(reason).into();
            assert!(matches!(app, AppError::Unauthorized(_)));
        }
    }

    #[test]
    fn test_authorization_is_forbidden_not_unauthorized() {
        let app: AppError = ServiceError::Authorization {
            resource: "project".to_string(),
            action: "delete".to_string(),
        }
        .into();
        assert!(matches!(app, AppError::Forbidden(_)));
    }

    #[test]
    fn test_rate_limit_is_distinct() {
        let app: AppError = ServiceError::RateLimited { flow: "login" }.into();
        assert!(matches!(app, AppError::TooManyRequests(_, _)));
    }
}
