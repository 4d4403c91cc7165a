//! Utility functions

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Timestamp format used by the HTTP surface
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Version information for the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Get version information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Format a local timestamp for display
pub fn format_timestamp(time: &DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Resolve the deployment script path.
///
/// Relative paths are joined onto `base_dir`, normally the directory of the
/// running executable.
pub fn resolve_script_path(script: &Path, base_dir: Option<&Path>) -> PathBuf {
    match base_dir {
        Some(base) if script.is_relative() => base.join(script),
        _ => script.to_path_buf(),
    }
}

/// Directory containing the running executable
pub fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
