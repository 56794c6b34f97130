// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Baton server (batond)
//!
//! Single-host composition of the orchestration kernel:
//! - HTTP listener for job submission (/init, /ssm)
//! - Notification loop turning callback writes into orchestrator passes
//! - Local shell worker behind the inline dispatcher

use baton_engine::Config;
use baton_server::{build_kernel, router, AppState, ServerConfig};
use baton_adapters::NoOpVcs;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("batond {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("batond {}", env!("CARGO_PKG_VERSION"));
                println!("Baton server - hosts the order-orchestration kernel");
                println!();
                println!("USAGE:");
                println!("    batond");
                println!();
                println!("ENVIRONMENT:");
                println!("    BATON_STATE_DIR       state root (default ./baton-state)");
                println!("    BATON_LISTEN          bind address (default 127.0.0.1:8237)");
                println!("    BATON_WEBHOOK_SECRET  verify signed submissions when set");
                println!("    ORDERS_TABLE, INTERNAL_BUCKET, ... (see docs) store names");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: batond [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let server_config = ServerConfig::from_env();
    let config = Config::from_env();

    std::fs::create_dir_all(&server_config.state_dir)?;
    let file_appender =
        tracing_appender::rolling::daily(server_config.state_dir.join("logs"), "batond.log");
    let (writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    info!(state_dir = %server_config.state_dir.display(), "starting batond");

    let kernel = build_kernel(&server_config, config);
    let notify = tokio::spawn(notify_task(kernel.reader, kernel.orchestrator.clone()));

    let app = router(AppState {
        admission: kernel.admission,
        vcs: NoOpVcs,
        webhook_secret: server_config.webhook_secret.clone(),
    });
    let listener = tokio::net::TcpListener::bind(server_config.listen).await?;
    info!(listen = %server_config.listen, "submission api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    notify.abort();
    info!("batond stopped");
    Ok(())
}

async fn notify_task(
    reader: baton_adapters::SinkReader,
    orchestrator: std::sync::Arc<baton_server::composition::LocalOrchestrator>,
) {
    baton_server::notify_loop::run(reader, orchestrator).await;
}

async fn shutdown_signal() {
    let mut term = match signal(SignalKind::terminate()) {
        Ok(term) => term,
        Err(e) => {
            tracing::warn!(error = %e, "no SIGTERM handler; ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };
    tokio::select! {
        _ = term.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    info!("shutdown signal received");
}
