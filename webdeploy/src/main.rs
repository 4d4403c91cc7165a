//! webdeploy - Entry Point
//!
//! Serves a small HTTP interface to start the deployment script and watch its
//! progress.

use std::collections::HashMap;
use std::env;
use std::path::Path;

use webdeploy::app::run::run;
use webdeploy::logs::init_logging;
use webdeploy::storage::settings::Settings;
use webdeploy::utils::{exe_dir, version_info};

use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize version info: {}", e),
        }
        return;
    }

    // Load settings and apply overrides
    let config = cli_args.get("config").map(Path::new);
    let settings = match Settings::load(config, &cli_args).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{:#}", e);
            return;
        }
    };

    // Initialize logging
    let _log_guard = match init_logging(settings.log_options()) {
        Ok(guard) => guard,
        Err(e) => {
            println!("Failed to initialize logging: {e}");
            None
        }
    };

    // Run the server
    let options = settings.app_options(exe_dir().as_deref());
    info!(version = %version.version, "Running webdeploy with options: {:?}", options);
    let result = run(options, await_shutdown_signal()).await;
    if let Err(e) = result {
        error!("Failed to run webdeploy: {e}");
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).unwrap();
        let mut sigint = signal(SignalKind::interrupt()).unwrap();

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
