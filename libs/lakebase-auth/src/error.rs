use thiserror::Error;

/// Errors from credential resolution and token refresh.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Required delegated-mode configuration is missing or invalid.
    #[error("configuration error: {key}: {message}")]
    Configuration { key: String, message: String },

    /// The identity provider call failed. Never retried here.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl AuthError {
    pub fn configuration(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            key: key.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

/// Failures talking to the identity provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Transport(String),

    #[error("identity provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed identity provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::MalformedResponse(e.to_string())
        } else {
            Self::Transport(e.to_string())
        }
    }
}
