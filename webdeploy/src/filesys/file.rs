//! File operations

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::DeployError;

/// A file wrapper with path
#[derive(Debug, Clone)]
pub struct File {
    path: PathBuf,
}

impl File {
    /// Create a new file reference
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Get the file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if the file exists
    pub async fn exists(&self) -> bool {
        fs::metadata(&self.path).await.is_ok()
    }

    /// Read file contents as string
    pub async fn read_string(&self) -> Result<String, DeployError> {
        Ok(fs::read_to_string(&self.path).await?)
    }

    /// Read file as JSON
    pub async fn read_json<T: DeserializeOwned>(&self) -> Result<T, DeployError> {
        let contents = self.read_string().await?;
        let value = serde_json::from_str(&contents)?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::settings::Settings;

    #[tokio::test]
    async fn test_read_json_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"deploy": {"script": "release.sh"}}"#).unwrap();

        let file = File::new(&path);
        assert!(file.exists().await);
        let settings: Settings = file.read_json().await.unwrap();
        assert_eq!(settings.deploy.script, "release.sh");
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let file = File::new("/nonexistent/settings.json");
        assert!(!file.exists().await);
        assert!(matches!(
            file.read_json::<Settings>().await,
            Err(DeployError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_read_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let result = File::new(&path).read_json::<Settings>().await;
        assert!(matches!(result, Err(DeployError::JsonError(_))));
    }
}
