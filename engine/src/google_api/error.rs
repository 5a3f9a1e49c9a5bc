use thiserror::Error;

/// Errors reported by the Gemini / Imagen REST endpoints, keyed by the
/// `status` field of the `{"error": ...}` envelope
#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("Invalid argument (400): {message}")]
    InvalidArgument { message: String },

    #[error("Failed precondition (400): {message}")]
    FailedPrecondition { message: String },

    #[error("Permission denied (403): {message}")]
    PermissionDenied { message: String },

    #[error("Not found (404): {message}")]
    NotFound { message: String },

    #[error("Resource exhausted (429): {message}")]
    ResourceExhausted { message: String },

    #[error("Internal API error (500): {message}")]
    Internal { message: String },

    #[error("API unavailable (503): {message}")]
    Unavailable { message: String },

    #[error("Deadline exceeded (504): {message}")]
    DeadlineExceeded { message: String },

    #[error("Unexpected API error {status}: {message}")]
    Unexpected { status: String, message: String },
}

impl GoogleApiError {
    pub fn from_status(status: &str, message: impl Into<String>) -> Self {
        let message = message.into();

        match status {
            "INVALID_ARGUMENT" => Self::InvalidArgument { message },
            "FAILED_PRECONDITION" => Self::FailedPrecondition { message },
            "PERMISSION_DENIED" | "UNAUTHENTICATED" => Self::PermissionDenied { message },
            "NOT_FOUND" => Self::NotFound { message },
            "RESOURCE_EXHAUSTED" => Self::ResourceExhausted { message },
            "INTERNAL" => Self::Internal { message },
            "UNAVAILABLE" => Self::Unavailable { message },
            "DEADLINE_EXCEEDED" => Self::DeadlineExceeded { message },
            other => Self::Unexpected {
                status: other.to_string(),
                message,
            },
        }
    }
}
