//! Application configuration options

use std::path::PathBuf;
use std::time::Duration;

/// Main application options
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Server configuration
    pub server: ServerOptions,

    /// Deployment command configuration
    pub runner: RunnerOptions,
}

/// Lifecycle options for the service
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

/// Deployment command options
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Program used to run the script, empty to execute the script directly
    pub interpreter: String,

    /// Path to the deployment script
    pub script: PathBuf,
}

impl RunnerOptions {
    /// Name of the program that gets spawned
    pub fn program(&self) -> String {
        if self.interpreter.is_empty() {
            self.script.display().to_string()
        } else {
            self.interpreter.clone()
        }
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            interpreter: "bash".to_string(),
            script: PathBuf::from("deploy.sh"),
        }
    }
}
