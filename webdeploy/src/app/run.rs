//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions, ServerOptions};
use crate::deploy::supervisor::RunSupervisor;
use crate::errors::DeployError;
use crate::filesys::file::File;
use crate::server::serve::serve;
use crate::server::state::ServerState;

/// Run the webdeploy service until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), DeployError> {
    info!("Initializing webdeploy...");

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, &mut shutdown_manager, &shutdown_tx).await {
        error!("Failed to start webdeploy: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    log_banner(&options.server);

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

fn log_banner(options: &ServerOptions) {
    let host = match options.host.as_str() {
        "0.0.0.0" | "::" => "localhost",
        host => host,
    };
    let base = format!("http://{}:{}", host, options.port);
    info!("Status page: {}/", base);
    info!("Deploy:      {}/deploy", base);
    info!("Status:      {}/status", base);
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_manager: &mut ShutdownManager,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<(), DeployError> {
    let supervisor = init_supervisor(options, shutdown_manager).await?;
    init_socket_server(
        &options.server,
        supervisor,
        shutdown_manager,
        shutdown_tx.subscribe(),
    )
    .await
}

async fn init_supervisor(
    options: &AppOptions,
    shutdown_manager: &mut ShutdownManager,
) -> Result<Arc<RunSupervisor>, DeployError> {
    info!(
        script = %options.runner.script.display(),
        interpreter = %options.runner.interpreter,
        "Initializing run supervisor..."
    );

    if !File::new(&options.runner.script).exists().await {
        warn!(
            "Deployment script {} does not exist, runs will fail until it is created",
            options.runner.script.display()
        );
    }

    let supervisor = Arc::new(RunSupervisor::new(options.runner.clone()));
    shutdown_manager.with_supervisor(supervisor.clone())?;
    Ok(supervisor)
}

async fn init_socket_server(
    options: &ServerOptions,
    supervisor: Arc<RunSupervisor>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DeployError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(supervisor);
    let server_handle = serve(options, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_socket_server_handle(server_handle)?;
    Ok(())
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    supervisor: Option<Arc<RunSupervisor>>,
    socket_server_handle: Option<JoinHandle<Result<(), DeployError>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            supervisor: None,
            socket_server_handle: None,
        }
    }

    pub fn with_supervisor(&mut self, supervisor: Arc<RunSupervisor>) -> Result<(), DeployError> {
        if self.supervisor.is_some() {
            return Err(DeployError::ShutdownError("supervisor already set".to_string()));
        }
        self.supervisor = Some(supervisor);
        Ok(())
    }

    pub fn with_socket_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), DeployError>>,
    ) -> Result<(), DeployError> {
        if self.socket_server_handle.is_some() {
            return Err(DeployError::ShutdownError("server_handle already set".to_string()));
        }
        self.socket_server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), DeployError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                );
                Err(DeployError::ShutdownError(format!(
                    "timed out after {:?}",
                    self.lifecycle_options.max_shutdown_delay
                )))
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), DeployError> {
        info!("Shutting down webdeploy...");

        // 1. Socket server
        if let Some(handle) = self.socket_server_handle.take() {
            handle
                .await
                .map_err(|e| DeployError::ShutdownError(e.to_string()))??;
        }

        // 2. Supervisor, runs are not cancellable so an active one is left behind
        if let Some(supervisor) = self.supervisor.take() {
            if supervisor.is_running() {
                let snapshot = supervisor.snapshot();
                warn!(
                    run_id = ?snapshot.run_id,
                    "Deployment still running at shutdown, it will not be awaited"
                );
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}
