pub const UNEXPECTED_RESPONSE_MESSAGE: &str = "Unexpected server response";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClientError {
    /// Rejected before any request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Network error: {0}")]
    Transport(String),

    /// Non-JSON body, or an error status without a structured message.
    #[error("Unexpected server response (HTTP {status})")]
    UnexpectedResponse { status: u16 },

    /// Structured `{error|message}` payload from the gateway.
    #[error("{message}")]
    Domain { status: u16, message: String },

    #[error("Not signed in")]
    NotAuthenticated,
}

impl ClientError {
    /// Text to show the user.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(message) | ClientError::Domain { message, .. } => {
                message.clone()
            }
            ClientError::Transport(_) | ClientError::UnexpectedResponse { .. } => {
                UNEXPECTED_RESPONSE_MESSAGE.to_string()
            }
            ClientError::NotAuthenticated => "Sign in to continue".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UnexpectedResponse { status } | ClientError::Domain { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(err: validator::ValidationErrors) -> Self {
        ClientError::Validation(err.to_string())
    }
}
