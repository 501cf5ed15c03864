//! Standalone HTTP server binary.
//!
//! Resource root comes from `NOTEPY_HOME` (or the platform data dir);
//! `NOTEPY_HOST` and `NOTEPY_PORT` override the `[server]` config section.

use notepy_core::{init_logging, AppConfig, ResourcePaths};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let paths = match ResourcePaths::resolve(None) {
        Ok(paths) => paths,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = paths.create_resource_structure() {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    let mut config = match AppConfig::load_or_init(&paths) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    if let Ok(host) = std::env::var("NOTEPY_HOST") {
        config.server.host = host;
    }
    if let Some(port) = std::env::var("NOTEPY_PORT")
        .ok()
        .and_then(|raw| raw.parse().ok())
    {
        config.server.port = port;
    }

    if let Err(err) = init_logging(&config.logging, &paths.logs_dir) {
        eprintln!("warning: logging disabled: {err}");
    }

    match notepy_server::run(&paths, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=server_exit module=server status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
