//! Deployment run supervisor
//!
//! Owns the shared [`DeploymentRun`] record. Every mutation of the record goes
//! through this module: triggering a run, appending process output and
//! recording the terminal outcome.

use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Local};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::options::RunnerOptions;
use crate::deploy::run::{DeploymentRun, Outcome, RunSnapshot};
use crate::errors::DeployError;
use crate::filesys::file::File;

/// Handle to a run started by [`RunSupervisor::start_run`].
///
/// Dropping the handle detaches the run; it keeps going in the background.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    started_at: DateTime<Local>,
    task: JoinHandle<()>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    /// Wait until the run's terminal state has been recorded
    pub async fn wait(self) -> Result<(), DeployError> {
        self.task
            .await
            .map_err(|e| DeployError::Internal(format!("Supervisor task failed: {}", e)))
    }
}

/// Single-flight supervisor for the deployment command
pub struct RunSupervisor {
    record: Arc<Mutex<DeploymentRun>>,
    options: Arc<RunnerOptions>,
}

impl RunSupervisor {
    /// Create a supervisor with an empty deployment record
    pub fn new(options: RunnerOptions) -> Self {
        Self {
            record: Arc::new(Mutex::new(DeploymentRun::new())),
            options: Arc::new(options),
        }
    }

    /// Start a new run unless one is already active.
    ///
    /// Returns as soon as the background task is spawned. Must be called from
    /// within a Tokio runtime.
    pub fn start_run(&self) -> Result<RunHandle, DeployError> {
        let run_id = Uuid::new_v4();
        let started_at = Local::now();

        lock(&self.record).begin(run_id, started_at)?;
        info!(run_id = %run_id, script = %self.options.script.display(), "Deployment started");

        let guard = FinishGuard::new(self.record.clone(), run_id);
        let record = self.record.clone();
        let options = self.options.clone();

        let task = tokio::spawn(async move {
            let result = supervise(&record, run_id, &options).await;
            guard.complete(result);
        });

        Ok(RunHandle {
            run_id,
            started_at,
            task,
        })
    }

    /// Snapshot of the current deployment record
    pub fn snapshot(&self) -> RunSnapshot {
        lock(&self.record).snapshot()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.record).is_running()
    }
}

fn lock(record: &Mutex<DeploymentRun>) -> MutexGuard<'_, DeploymentRun> {
    record.lock().unwrap_or_else(|e| e.into_inner())
}

/// Records the terminal state of a run exactly once.
///
/// If the supervision task is dropped or panics before `complete` is called,
/// the run is finished with an error outcome on drop.
struct FinishGuard {
    record: Arc<Mutex<DeploymentRun>>,
    run_id: Uuid,
    completed: bool,
}

impl FinishGuard {
    fn new(record: Arc<Mutex<DeploymentRun>>, run_id: Uuid) -> Self {
        Self {
            record,
            run_id,
            completed: false,
        }
    }

    fn complete(mut self, result: Result<(), DeployError>) {
        let (outcome, error) = Outcome::from_result(&result);
        self.finish(outcome, error);
        self.completed = true;
    }

    fn finish(&self, outcome: Outcome, error: Option<String>) {
        match outcome {
            Outcome::Success => info!(run_id = %self.run_id, "Deployment completed successfully"),
            Outcome::Failed => warn!(
                run_id = %self.run_id,
                error = error.as_deref().unwrap_or_default(),
                "Deployment failed"
            ),
            _ => error!(
                run_id = %self.run_id,
                error = error.as_deref().unwrap_or_default(),
                "Deployment could not be supervised"
            ),
        }

        if !lock(&self.record).finish(self.run_id, outcome, error, Local::now()) {
            debug!(run_id = %self.run_id, "Run was already finished");
        }
    }
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        if !self.completed {
            self.finish(
                Outcome::Error,
                Some("Supervisor task ended before the deployment finished".to_string()),
            );
        }
    }
}

async fn supervise(
    record: &Mutex<DeploymentRun>,
    run_id: Uuid,
    options: &RunnerOptions,
) -> Result<(), DeployError> {
    if !File::new(&options.script).exists().await {
        return Err(DeployError::Supervision(format!(
            "Deployment script not found: {}",
            options.script.display()
        )));
    }

    let mut child = build_command(options).spawn().map_err(|e| {
        DeployError::Supervision(format!("Failed to start {}: {}", options.program(), e))
    })?;
    debug!(run_id = %run_id, pid = child.id(), "Deployment process spawned");

    let stdout = child.stdout.take().map(BufReader::new);
    let stderr = child.stderr.take().map(BufReader::new);

    if let Err(e) = drain_output(record, run_id, stdout, stderr).await {
        // The pipes can no longer be drained, so the child could block forever.
        let _ = child.start_kill();
        let _ = child.wait().await;
        return Err(e);
    }

    let status = child.wait().await.map_err(|e| {
        DeployError::Supervision(format!("Failed to wait for deployment process: {}", e))
    })?;
    info!(run_id = %run_id, exit_code = status.code(), "Deployment process exited");

    exit_result(status)
}

fn build_command(options: &RunnerOptions) -> Command {
    let mut cmd = if options.interpreter.is_empty() {
        Command::new(&options.script)
    } else {
        let mut cmd = Command::new(&options.interpreter);
        cmd.arg(&options.script);
        cmd
    };

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    cmd
}

/// Read stdout and stderr concurrently, appending each line to the record in
/// arrival order until both streams reach EOF.
async fn drain_output<O, E>(
    record: &Mutex<DeploymentRun>,
    run_id: Uuid,
    mut stdout: Option<O>,
    mut stderr: Option<E>,
) -> Result<(), DeployError>
where
    O: AsyncBufRead + Unpin,
    E: AsyncBufRead + Unpin,
{
    let mut stdout_buf = Vec::new();
    let mut stderr_buf = Vec::new();

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            line = next_line(&mut stdout, &mut stdout_buf) => match line.map_err(read_error)? {
                Some(line) => append_line(record, run_id, line),
                None => stdout = None,
            },
            line = next_line(&mut stderr, &mut stderr_buf) => match line.map_err(read_error)? {
                Some(line) => append_line(record, run_id, line),
                None => stderr = None,
            },
        }
    }

    Ok(())
}

/// Next line from `reader`, or `None` at EOF. Never resolves for a closed
/// stream.
///
/// `buf` is kept by the caller across calls: `read_until` appends partial
/// reads to it when the future is cancelled by `select!`.
async fn next_line<R>(reader: &mut Option<R>, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let Some(reader) = reader.as_mut() else {
        return std::future::pending().await;
    };

    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }

    let line = String::from_utf8_lossy(buf).trim().to_string();
    buf.clear();
    Ok(Some(line))
}

fn append_line(record: &Mutex<DeploymentRun>, run_id: Uuid, line: String) {
    debug!(run_id = %run_id, "{}", line);
    lock(record).push_line(run_id, line);
}

fn read_error(e: std::io::Error) -> DeployError {
    DeployError::Supervision(format!("Failed to read deployment output: {}", e))
}

fn exit_result(status: ExitStatus) -> Result<(), DeployError> {
    if status.success() {
        return Ok(());
    }
    if let Some(code) = status.code() {
        return Err(DeployError::exit_code(code));
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Err(DeployError::signal(signal));
        }
    }

    Err(DeployError::ProcessFailed {
        detail: format!("Process exited with {}", status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_drain_output_merges_both_streams() {
        let record = Mutex::new(DeploymentRun::new());
        let run_id = Uuid::new_v4();
        record.lock().unwrap().begin(run_id, Local::now()).unwrap();

        let stdout: &[u8] = b"out 1\nout 2\n";
        let stderr: &[u8] = b"  err 1  \r\nerr 2";

        drain_output(&record, run_id, Some(stdout), Some(stderr))
            .await
            .unwrap();

        let mut output = record.lock().unwrap().snapshot().output;
        output.sort();
        assert_eq!(output, vec!["err 1", "err 2", "out 1", "out 2"]);
    }

    #[tokio::test]
    async fn test_drain_output_preserves_stream_order() {
        let record = Mutex::new(DeploymentRun::new());
        let run_id = Uuid::new_v4();
        record.lock().unwrap().begin(run_id, Local::now()).unwrap();

        let stdout: &[u8] = b"1\n2\n3\n4\n5\n";

        drain_output::<&[u8], &[u8]>(&record, run_id, Some(stdout), None)
            .await
            .unwrap();

        assert_eq!(
            record.lock().unwrap().snapshot().output,
            vec!["1", "2", "3", "4", "5"]
        );
    }

    #[tokio::test]
    async fn test_next_line_decodes_lossy() {
        let mut reader: Option<&[u8]> = Some(b"bad \xff byte\n");
        let mut buf = Vec::new();

        let line = next_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(line, "bad \u{fffd} byte");
        assert!(next_line(&mut reader, &mut buf).await.unwrap().is_none());
    }

    #[test]
    fn test_build_command_without_interpreter() {
        let options = RunnerOptions {
            interpreter: String::new(),
            script: "/opt/deploy.sh".into(),
        };
        let cmd = build_command(&options);
        assert_eq!(cmd.as_std().get_program(), "/opt/deploy.sh");
        assert_eq!(cmd.as_std().get_args().count(), 0);
    }

    #[test]
    fn test_build_command_with_interpreter() {
        let options = RunnerOptions {
            interpreter: "bash".to_string(),
            script: "/opt/deploy.sh".into(),
        };
        let cmd = build_command(&options);
        assert_eq!(cmd.as_std().get_program(), "bash");
        let args: Vec<_> = cmd.as_std().get_args().collect();
        assert_eq!(args, vec!["/opt/deploy.sh"]);
    }
}
