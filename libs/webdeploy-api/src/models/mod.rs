//! Service API models

use serde::{Deserialize, Serialize};

/// Health response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Version response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Response of `GET /deploy` when the run was started
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployStartedResponse {
    /// Always `"started"`
    pub status: String,
    pub message: String,
    /// Local start time, `%Y-%m-%d %H:%M:%S`
    pub started_at: Option<String>,
}

/// Error body, e.g. `GET /deploy` while a run is active
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `"error"`
    pub status: String,
    pub message: String,
}

/// Response of `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub running: bool,
    pub last_start: Option<String>,
    pub last_finish: Option<String>,
    /// `success`, `failed`, `error` or null before the first finished run
    pub last_status: Option<String>,
    pub error: Option<String>,
    /// Number of buffered output lines
    pub output_lines: usize,
    /// Most recent output lines, oldest first
    pub last_output: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_serializes_nulls() {
        let status = StatusResponse {
            running: false,
            last_start: None,
            last_finish: None,
            last_status: None,
            error: None,
            output_lines: 0,
            last_output: vec![],
        };

        let value = serde_json::to_value(&status).unwrap();
        assert!(value["last_start"].is_null());
        assert!(value["last_status"].is_null());
        assert!(value["error"].is_null());
        assert_eq!(value["output_lines"], 0);
        assert_eq!(value["last_output"], serde_json::json!([]));
    }
}
