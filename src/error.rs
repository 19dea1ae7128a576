use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::CredentialKind;

/// Every failure surfaced by the HTTP core and the platform clients.
#[derive(Debug, Error)]
pub enum Error {
    /// URL failed to parse or was blocked by the SSRF policy. Never retried.
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode request body: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("request failed after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("{platform}: missing credentials {missing:?}")]
    MissingCredentials {
        platform: String,
        missing: Vec<CredentialKind>,
    },

    #[error("platform {0} is not enabled")]
    PlatformDisabled(String),

    #[error("unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("configuration error: {0}")]
    Config(String),

    /// The platform answered 2xx but its envelope reported a failure.
    #[error("{platform} API error: {message}")]
    Api { platform: String, message: String },

    #[error("unexpected response shape: {0}")]
    InvalidResponse(String),
}

impl Error {
    /// Whether the retry loop treats this failure as transient.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Network(_) | Error::Timeout(_) | Error::Status { .. } | Error::Decode(_)
        )
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Machine-readable error shape printed by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
    pub retriable: bool,
}

pub fn status_code_name(status: StatusCode) -> &'static str {
    match status {
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::UNAUTHORIZED => "unauthorized",
        StatusCode::FORBIDDEN => "forbidden",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::CONFLICT => "conflict",
        StatusCode::TOO_MANY_REQUESTS => "rate_limited",
        s if s.is_server_error() => "upstream_error",
        _ => "http_error",
    }
}

impl From<&Error> for ErrorInfo {
    fn from(err: &Error) -> Self {
        let code = match err {
            Error::InvalidUrl(_) => "invalid_url",
            Error::InvalidHeader(_) => "invalid_header",
            Error::Network(_) => "network_error",
            Error::Timeout(_) => "timeout",
            Error::Status { status, .. } => status_code_name(*status),
            Error::Decode(_) | Error::InvalidResponse(_) => "invalid_response",
            Error::Serialize(_) => "invalid_body",
            Error::RetriesExhausted { .. } => "retries_exhausted",
            Error::MissingCredentials { .. } => "missing_credentials",
            Error::PlatformDisabled(_) => "platform_disabled",
            Error::UnknownPlatform(_) => "unknown_platform",
            Error::Config(_) => "config_error",
            Error::Api { .. } => "api_error",
        };
        // The loop retries every status; callers are only told to retry the transient ones.
        let retriable = match err {
            Error::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            other => other.is_retryable(),
        };
        ErrorInfo {
            code: code.to_string(),
            message: err.to_string(),
            retriable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_matrix() {
        assert!(Error::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(Error::Status {
            status: StatusCode::BAD_GATEWAY,
            body: String::new()
        }
        .is_retryable());
        assert!(!Error::InvalidUrl("x".into()).is_retryable());
        assert!(!Error::RetriesExhausted { attempts: 3 }.is_retryable());
        assert!(!Error::MissingCredentials {
            platform: "github".into(),
            missing: vec![CredentialKind::AccessToken]
        }
        .is_retryable());
    }

    #[test]
    fn error_info_matrix() {
        let info = |status| {
            ErrorInfo::from(&Error::Status {
                status,
                body: String::new(),
            })
        };
        assert_eq!(info(StatusCode::BAD_REQUEST).code, "bad_request");
        assert_eq!(info(StatusCode::UNAUTHORIZED).code, "unauthorized");
        assert_eq!(info(StatusCode::FORBIDDEN).code, "forbidden");
        assert_eq!(info(StatusCode::NOT_FOUND).code, "not_found");
        assert_eq!(info(StatusCode::CONFLICT).code, "conflict");
        let rl = info(StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(rl.code, "rate_limited");
        assert!(rl.retriable);
        let upstream = info(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(upstream.code, "upstream_error");
        assert!(upstream.retriable);
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
            StatusCode::NOT_FOUND,
        ] {
            assert!(!info(status).retriable, "{status} reported retriable");
        }
        assert!(ErrorInfo::from(&Error::Timeout(Duration::from_secs(1))).retriable);
        let url = ErrorInfo::from(&Error::InvalidUrl("x".into()));
        assert_eq!(url.code, "invalid_url");
        assert!(!url.retriable);
    }

    #[test]
    fn status_accessor() {
        let e = Error::Status {
            status: StatusCode::NOT_FOUND,
            body: "nope".into(),
        };
        assert_eq!(e.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(e.to_string(), "HTTP 404 Not Found: nope");
        assert_eq!(Error::Timeout(Duration::from_secs(2)).status(), None);
    }
}
