use std::process::ExitCode;

use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn worker_threads() -> Option<usize> {
    match configs::AppConfig::load_or_env() {
        Ok(cfg) => cfg.server.worker_threads,
        Err(_) => std::env::var("TOKIO_WORKER_THREADS").ok().and_then(|v| v.parse::<usize>().ok()),
    }
}

fn main() -> ExitCode {
    dotenv().ok();

    let instance_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "clinic-api", event = "panic", %instance_id, pid, message = %info, "unhandled panic");
    }));

    let threads = worker_threads();
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to build tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    rt.block_on(async move {
        let res = server::run().await;
        match res {
            Ok(()) => {
                info!(service = "clinic-api", event = "stop", %instance_id, pid, version, threads = threads.unwrap_or_default(), "server stopped");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "clinic-api", event = "run_failed", error = %e, "server exited with error");
                eprintln!("server error: {e:#}");
                ExitCode::FAILURE
            }
        }
    })
}
