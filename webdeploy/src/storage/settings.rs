//! Settings file management

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::app::options::{AppOptions, RunnerOptions, ServerOptions};
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::logs::{LogLevel, LogOptions};
use crate::utils::resolve_script_path;

/// Service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit JSON logs on stdout
    #[serde(default)]
    pub log_json: bool,

    /// Directory for rolling log files
    #[serde(default)]
    pub log_dir: Option<String>,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Deployment command configuration
    #[serde(default)]
    pub deploy: DeploySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            server: ServerSettings::default(),
            deploy: DeploySettings::default(),
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Deployment command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    /// Script path, relative paths are resolved against the executable's directory
    #[serde(default = "default_script")]
    pub script: String,

    /// Program that runs the script, empty to execute it directly
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
}

fn default_script() -> String {
    "deploy.sh".to_string()
}

fn default_interpreter() -> String {
    "bash".to_string()
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            script: default_script(),
            interpreter: default_interpreter(),
        }
    }
}

impl Settings {
    /// Load settings from an optional JSON file, then apply command line overrides
    pub async fn load(
        config: Option<&Path>,
        args: &HashMap<String, String>,
    ) -> anyhow::Result<Settings> {
        let mut settings = match config {
            Some(path) => File::new(path)
                .read_json::<Settings>()
                .await
                .with_context(|| format!("Unable to read settings file {}", path.display()))?,
            None => Settings::default(),
        };
        settings
            .apply_overrides(args)
            .context("Invalid command line override")?;
        Ok(settings)
    }

    /// Apply `--key=value` command line overrides
    pub fn apply_overrides(&mut self, args: &HashMap<String, String>) -> Result<(), DeployError> {
        if let Some(host) = args.get("host") {
            self.server.host = host.clone();
        }
        if let Some(port) = args.get("port") {
            self.server.port = port
                .parse()
                .map_err(|_| DeployError::ConfigError(format!("Invalid port: {}", port)))?;
        }
        if let Some(script) = args.get("script") {
            self.deploy.script = script.clone();
        }
        if let Some(interpreter) = args.get("interpreter") {
            self.deploy.interpreter = interpreter.clone();
        }
        if let Some(level) = args.get("log-level") {
            self.log_level = level.parse().map_err(DeployError::ConfigError)?;
        }
        Ok(())
    }

    /// Logging options for these settings
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            log_level: self.log_level.clone(),
            json_format: self.log_json,
            log_dir: self.log_dir.as_ref().map(PathBuf::from),
            ..Default::default()
        }
    }

    /// Application options, resolving the script path against `base_dir`
    pub fn app_options(&self, base_dir: Option<&Path>) -> AppOptions {
        AppOptions {
            server: ServerOptions {
                host: self.server.host.clone(),
                port: self.server.port,
            },
            runner: RunnerOptions {
                interpreter: self.deploy.interpreter.clone(),
                script: resolve_script_path(Path::new(&self.deploy.script), base_dir),
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_from_empty_json() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.log_level, LogLevel::Info);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.deploy.script, "deploy.sh");
        assert_eq!(settings.deploy.interpreter, "bash");
        assert!(settings.log_dir.is_none());
    }

    #[test]
    fn test_settings_partial_json() {
        let settings: Settings =
            serde_json::from_str(r#"{"server": {"port": 8080}, "log_level": "debug"}"#).unwrap();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.log_level, LogLevel::Debug);
    }

    #[test]
    fn test_apply_overrides() {
        let mut settings = Settings::default();
        let args = HashMap::from([
            ("host".to_string(), "127.0.0.1".to_string()),
            ("port".to_string(), "9000".to_string()),
            ("script".to_string(), "/opt/release.sh".to_string()),
            ("interpreter".to_string(), "".to_string()),
            ("log-level".to_string(), "warn".to_string()),
        ]);

        settings.apply_overrides(&args).unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.deploy.script, "/opt/release.sh");
        assert_eq!(settings.deploy.interpreter, "");
        assert_eq!(settings.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_port_override() {
        let mut settings = Settings::default();
        let args = HashMap::from([("port".to_string(), "http".to_string())]);
        assert!(matches!(
            settings.apply_overrides(&args),
            Err(DeployError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_load_without_config_applies_overrides() {
        let args = HashMap::from([("port".to_string(), "7000".to_string())]);
        let settings = Settings::load(None, &args).await.unwrap();
        assert_eq!(settings.server.port, 7000);
        assert_eq!(settings.deploy.script, "deploy.sh");
    }

    #[tokio::test]
    async fn test_load_reads_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"host": "127.0.0.1", "port": 8080}, "deploy": {"script": "/opt/release.sh"}}"#,
        )
        .unwrap();
        let args = HashMap::from([("port".to_string(), "9090".to_string())]);

        let settings = Settings::load(Some(path.as_path()), &args).await.unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.deploy.script, "/opt/release.sh");
    }

    #[tokio::test]
    async fn test_load_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");

        let err = Settings::load(Some(path.as_path()), &HashMap::new()).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.starts_with("Unable to read settings file"), "{}", message);
        assert!(message.contains("absent.json"), "{}", message);
        assert!(err.downcast_ref::<DeployError>().is_some());
    }

    #[tokio::test]
    async fn test_load_rejects_bad_override() {
        let args = HashMap::from([("port".to_string(), "http".to_string())]);
        let err = Settings::load(None, &args).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeployError>(),
            Some(DeployError::ConfigError(_))
        ));
        assert!(format!("{:#}", err).contains("Invalid port: http"));
    }

    #[test]
    fn test_app_options_resolve_script() {
        let settings = Settings::default();
        let options = settings.app_options(Some(Path::new("/srv/webdeploy")));
        assert_eq!(options.runner.script, PathBuf::from("/srv/webdeploy/deploy.sh"));
        assert_eq!(options.runner.interpreter, "bash");
        assert_eq!(options.server.port, 5000);
    }
}
