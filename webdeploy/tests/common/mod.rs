//! Shared helpers for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use webdeploy::app::options::RunnerOptions;
use webdeploy::deploy::supervisor::RunSupervisor;

/// Write an executable bash script into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/bash\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Runner options executing `script` with bash
pub fn bash_runner(script: PathBuf) -> RunnerOptions {
    RunnerOptions {
        interpreter: "bash".to_string(),
        script,
    }
}

/// Poll the supervisor until no run is active
pub async fn wait_until_idle(supervisor: &RunSupervisor) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while supervisor.is_running() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("run did not finish in time");
}
