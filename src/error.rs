//! Error types for the azure-app-owner tool.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Top-level application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Token acquisition errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token request failed: {0}")]
    TokenRequestFailed(String),

    #[error("Invalid token response: {0}")]
    InvalidTokenResponse(String),

    #[error("Invalid client credentials")]
    InvalidCredentials,
}

/// Microsoft Graph API errors.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Graph API request failed: {0}")]
    GraphRequestFailed(String),

    #[error("Failed to parse API response: {0}")]
    ParseFailed(String),

    #[error("Unauthorized (401): Token may be expired")]
    Unauthorized,

    #[error("Forbidden (403): Insufficient permissions")]
    Forbidden,

    #[error("Not found (404)")]
    NotFound,

    #[error("Rate limited (429): Too many requests")]
    RateLimited,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl AppError {
    /// Returns a short, operator-facing message.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => {
                "Sign-in failed. Check tenant ID, client ID and client secret."
            }
            Self::Auth(_) => "Could not obtain an access token.",
            Self::Api(ApiError::Unauthorized) => "Access token was rejected by Microsoft Graph.",
            Self::Api(ApiError::Forbidden) => {
                "Insufficient permissions. The app registration needs Application.ReadWrite.All and Group.Read.All."
            }
            Self::Api(ApiError::NotFound) => "Directory object no longer exists.",
            Self::Api(ApiError::RateLimited) => "Too many requests. Please wait a moment.",
            Self::Api(ApiError::Network(_)) => "Network error. Check your connection.",
            Self::Api(_) => "Unexpected response from Microsoft Graph.",
            Self::Config(_) => "Configuration error. Please check settings.",
        }
    }

    /// Returns true if a later rerun might succeed without changing anything.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Api(ApiError::RateLimited) => true,
            Self::Api(ApiError::Network(e)) => e.is_timeout() || e.is_connect(),
            Self::Auth(AuthError::TokenRequestFailed(_)) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        let err = AppError::Auth(AuthError::InvalidCredentials);
        assert_eq!(
            err.user_message(),
            "Sign-in failed. Check tenant ID, client ID and client secret."
        );

        let err = AppError::Api(ApiError::RateLimited);
        assert_eq!(err.user_message(), "Too many requests. Please wait a moment.");

        let err = AppError::Config("missing".into());
        assert_eq!(err.user_message(), "Configuration error. Please check settings.");
    }

    #[test]
    fn test_is_transient() {
        assert!(AppError::Api(ApiError::RateLimited).is_transient());
        assert!(!AppError::Api(ApiError::Forbidden).is_transient());
        assert!(!AppError::Auth(AuthError::InvalidCredentials).is_transient());
    }

    #[test]
    fn test_from_conversions() {
        let err: AppError = ApiError::Unauthorized.into();
        assert!(matches!(err, AppError::Api(ApiError::Unauthorized)));
        assert_eq!(err.to_string(), "API error: Unauthorized (401): Token may be expired");

        let err: AppError = AuthError::TokenRequestFailed("HTTP 500".into()).into();
        assert_eq!(err.to_string(), "Authentication error: Token request failed: HTTP 500");
    }
}
