use lambda_http::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

/// Failure reported by an external collaborator (user pool or document table)
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum VerifyEmailError {
    #[error("Method not allowed")]
    MethodNotAllowed,
    #[error("Missing bearer token")]
    MissingCredential,
    #[error("Forbidden: admin only")]
    Forbidden,
    #[error("uid is required")]
    InvalidInput,
    /// Token rejected by the user pool. Served as 500 like any other internal failure.
    #[error("{0}")]
    InvalidToken(ProviderError),
    #[error("{0}")]
    MalformedBody(#[from] serde_json::Error),
    #[error("{source}")]
    Upstream {
        stage: &'static str,
        source: ProviderError,
    },
    /// Identity update applied and read back, mirror write failed.
    /// Repeating the request reconciles the mirror.
    #[error("{source}")]
    MirrorPending {
        email_verified: bool,
        source: ProviderError,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub stage: &'static str,
    /// Only present when the identity update went through before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,
}

impl VerifyEmailError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::MissingCredential => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::InvalidToken(_)
            | Self::MalformedBody(_)
            | Self::Upstream { .. }
            | Self::MirrorPending { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Diagnostic marker echoed in the response body and the log line
    pub fn stage(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed => "method",
            Self::MissingCredential => "auth",
            Self::Forbidden => "admin",
            Self::InvalidInput => "input",
            Self::InvalidToken(_) => "verify-token",
            Self::MalformedBody(_) => "body",
            Self::Upstream { stage, .. } => *stage,
            Self::MirrorPending { .. } => "mirror",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.status().is_server_error()
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
            stage: self.stage(),
            email_verified: match self {
                Self::MirrorPending { email_verified, .. } => Some(*email_verified),
                _ => None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_keep_their_status() {
        assert_eq!(VerifyEmailError::MethodNotAllowed.status(), 405);
        assert_eq!(VerifyEmailError::MissingCredential.status(), 401);
        assert_eq!(VerifyEmailError::Forbidden.status(), 403);
        assert_eq!(VerifyEmailError::InvalidInput.status(), 400);
    }

    #[test]
    fn internal_failures_collapse_to_500_with_raw_message() {
        let token = VerifyEmailError::InvalidToken(ProviderError::new("Access Token has expired"));
        assert_eq!(token.status(), 500);
        assert!(token.is_internal());
        assert_eq!(token.body().error, "Access Token has expired");
        assert_eq!(token.body().stage, "verify-token");

        let upstream = VerifyEmailError::Upstream {
            stage: "update",
            source: ProviderError::new("User does not exist."),
        };
        assert_eq!(upstream.status(), 500);
        assert_eq!(upstream.body().error, "User does not exist.");
        assert_eq!(upstream.stage(), "update");

        let malformed: VerifyEmailError = serde_json::from_str::<serde_json::Value>("{uid")
            .unwrap_err()
            .into();
        assert_eq!(malformed.status(), 500);
        assert_eq!(malformed.stage(), "body");
    }

    #[test]
    fn pending_mirror_reports_applied_update() {
        let err = VerifyEmailError::MirrorPending {
            email_verified: true,
            source: ProviderError::new("ResourceNotFoundException"),
        };
        assert_eq!(err.status(), 500);
        assert_eq!(err.stage(), "mirror");
        assert_eq!(
            serde_json::to_value(err.body()).unwrap(),
            serde_json::json!({
                "error": "ResourceNotFoundException",
                "stage": "mirror",
                "emailVerified": true
            })
        );

        let plain = serde_json::to_value(VerifyEmailError::Forbidden.body()).unwrap();
        assert!(plain.get("emailVerified").is_none());
    }
}
