use thiserror::Error;

pub type NexusResult<T> = Result<T, NexusError>;

#[derive(Error, Debug)]
pub enum NexusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Project not found or access denied")]
    AccessDenied,

    #[error("Analytics store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl NexusError {
    /// HTTP status the request boundary reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidInput(_) => 400,
            Self::Unauthenticated => 401,
            Self::AccessDenied => 404,
            _ => 500,
        }
    }

    /// Whether the caller is at fault (4xx) rather than the service.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(NexusError::InvalidInput("projectId".into()).status_code(), 400);
        assert_eq!(NexusError::Unauthenticated.status_code(), 401);
        assert_eq!(NexusError::AccessDenied.status_code(), 404);
        assert_eq!(NexusError::Store("timeout".into()).status_code(), 500);
        assert!(NexusError::AccessDenied.is_client_error());
        assert!(!NexusError::Store("down".into()).is_client_error());
    }
}
