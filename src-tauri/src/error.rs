use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostureProError {
    #[error("Camera error: {0}")]
    Acquisition(String),

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Analysis service returned {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Malformed response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Analysis service disabled (offline mode)")]
    Offline,

    #[error("Frame error: {0}")]
    Frame(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PostureProError {
    /// True for failures the pipelines mask with simulated analysis.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            PostureProError::Transport { .. }
                | PostureProError::Status { .. }
                | PostureProError::Decode { .. }
                | PostureProError::Offline
        )
    }
}

impl From<PostureProError> for String {
    fn from(err: PostureProError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_classified() {
        let status = PostureProError::Status {
            url: "http://localhost:8000/analyze".to_string(),
            status: 500,
        };
        assert!(status.is_remote());
        assert!(!PostureProError::Acquisition("denied".to_string()).is_remote());
    }

    #[test]
    fn test_error_into_string() {
        let msg: String = PostureProError::Config("interval must be positive".to_string()).into();
        assert_eq!(msg, "Config error: interval must be positive");
    }
}
