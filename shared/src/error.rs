use lambda_http::http::StatusCode;
use thiserror::Error;

/// Failure raised by a [`crate::signer::Signer`] implementation.
pub type SignError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum GrantError {
    /// Deployment problem. Lists every absent variable, never their values.
    #[error("Missing required configuration: {}", .0.join(", "))]
    Configuration(Vec<&'static str>),

    #[error("fileName is required")]
    Validation,

    /// The provider detail stays in the source and is only logged server-side.
    #[error("Failed to sign upload url")]
    Signing(#[source] SignError),
}

impl GrantError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GrantError::Validation => StatusCode::BAD_REQUEST,
            GrantError::Configuration(_) | GrantError::Signing(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
