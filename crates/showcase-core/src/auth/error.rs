use thiserror::Error;

use crate::api::ApiError;

/// Shown when the server rejects a login without saying why.
pub const DEFAULT_LOGIN_FAILURE: &str = "Login failed";

/// Login failures. The display text is meant for the user.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("{0}")]
    Rejected(String),

    #[error("Login failed: unable to reach the server")]
    Network(#[source] reqwest::Error),

    #[error("Invalid response from server")]
    InvalidResponse,

    #[error("Received expired token from server")]
    ExpiredToken,
}

impl From<ApiError> for AuthError {
    fn from(error: ApiError) -> Self {
        match error {
            ApiError::NetworkError(e) => AuthError::Network(e),
            ApiError::InvalidResponse(_) => AuthError::InvalidResponse,
            other => AuthError::Rejected(
                other
                    .server_message()
                    .unwrap_or_else(|| DEFAULT_LOGIN_FAILURE.to_string()),
            ),
        }
    }
}
