//! HTTP request handlers

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{error, info};
use webdeploy_api::{
    DeployStartedResponse, ErrorResponse, HealthResponse, StatusResponse, VersionResponse,
};

use crate::deploy::run::RunSnapshot;
use crate::errors::DeployError;
use crate::server::page::render_status_page;
use crate::server::state::ServerState;
use crate::utils::{format_timestamp, version_info};

/// Number of output lines returned by `/status`
pub const STATUS_OUTPUT_LINES: usize = 10;

/// Health check handler
pub async fn health_handler() -> impl IntoResponse {
    let version = version_info();
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "webdeploy".to_string(),
        version: version.version,
    })
}

/// Version handler
pub async fn version_handler() -> impl IntoResponse {
    let version = version_info();
    Json(VersionResponse {
        version: version.version,
        git_hash: version.git_hash,
        build_time: version.build_time,
    })
}

/// Deploy trigger handler
pub async fn deploy_handler(State(state): State<Arc<ServerState>>) -> Response {
    match state.supervisor.start_run() {
        Ok(handle) => {
            info!(run_id = %handle.run_id(), "Deployment triggered over HTTP");
            let body = DeployStartedResponse {
                status: "started".to_string(),
                message: "Deployment started".to_string(),
                started_at: Some(format_timestamp(&handle.started_at())),
            };
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(DeployError::AlreadyRunning) => {
            info!("Deployment trigger rejected, a run is already active");
            error_response(StatusCode::CONFLICT, DeployError::AlreadyRunning.to_string())
        }
        Err(e) => {
            error!("Failed to start deployment: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn error_response(code: StatusCode, message: String) -> Response {
    let body = ErrorResponse {
        status: "error".to_string(),
        message,
    };
    (code, Json(body)).into_response()
}

/// Status handler
pub async fn status_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(status_response(&state.supervisor.snapshot()))
}

/// Build the `/status` body from a snapshot
pub fn status_response(snapshot: &RunSnapshot) -> StatusResponse {
    StatusResponse {
        running: snapshot.running,
        last_start: snapshot.started_at.as_ref().map(format_timestamp),
        last_finish: snapshot.finished_at.as_ref().map(format_timestamp),
        last_status: snapshot.outcome.as_status().map(str::to_string),
        error: snapshot.error.clone(),
        output_lines: snapshot.output_lines(),
        last_output: snapshot.last_output(STATUS_OUTPUT_LINES).to_vec(),
    }
}

/// Status page handler
pub async fn index_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Html(render_status_page(&state.supervisor.snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::run::Outcome;
    use chrono::{Local, TimeZone};

    fn snapshot(output: usize) -> RunSnapshot {
        RunSnapshot {
            running: false,
            run_id: None,
            started_at: Some(Local.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
            finished_at: Some(Local.with_ymd_and_hms(2024, 5, 1, 10, 2, 30).unwrap()),
            outcome: Outcome::Failed,
            error: Some("Exit code: 2".to_string()),
            output: (0..output).map(|i| format!("line {}", i)).collect(),
        }
    }

    #[test]
    fn test_status_response_fields() {
        let status = status_response(&snapshot(25));

        assert!(!status.running);
        assert_eq!(status.last_start.as_deref(), Some("2024-05-01 10:00:00"));
        assert_eq!(status.last_finish.as_deref(), Some("2024-05-01 10:02:30"));
        assert_eq!(status.last_status.as_deref(), Some("failed"));
        assert_eq!(status.error.as_deref(), Some("Exit code: 2"));
        assert_eq!(status.output_lines, 25);
        assert_eq!(status.last_output.len(), STATUS_OUTPUT_LINES);
        assert_eq!(status.last_output[0], "line 15");
        assert_eq!(status.last_output[9], "line 24");
    }

    #[test]
    fn test_status_response_short_output() {
        let status = status_response(&snapshot(3));
        assert_eq!(status.last_output, vec!["line 0", "line 1", "line 2"]);
    }
}
