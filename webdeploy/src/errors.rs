//! Error types for the webdeploy service

use thiserror::Error;

/// Main error type for the webdeploy service
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A trigger arrived while a run is still active
    #[error("Deployment is already running")]
    AlreadyRunning,

    /// The deployment command terminated unsuccessfully
    #[error("{detail}")]
    ProcessFailed { detail: String },

    /// The deployment command could not be spawned or supervised
    #[error("{0}")]
    Supervision(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Failure for a process that exited with a nonzero code
    pub fn exit_code(code: i32) -> Self {
        DeployError::ProcessFailed {
            detail: format!("Exit code: {}", code),
        }
    }

    /// Failure for a process that was terminated by a signal
    pub fn signal(signal: i32) -> Self {
        DeployError::ProcessFailed {
            detail: format!("Terminated by signal {}", signal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_detail() {
        assert_eq!(DeployError::exit_code(3).to_string(), "Exit code: 3");
    }

    #[test]
    fn test_supervision_detail_is_verbatim() {
        let err = DeployError::Supervision("No such file or directory (os error 2)".to_string());
        assert_eq!(err.to_string(), "No such file or directory (os error 2)");
    }
}
