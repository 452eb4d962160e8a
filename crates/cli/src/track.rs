//! Foreground tracking process for `moor auto`
//!
//! Holds the per-anchor lock, starts tracking through the anchor manager,
//! and serves Status/Stop over a Unix socket until a stop request, a
//! signal, or an unexpected watcher death ends the session.

use crate::ipc::{self, handle_connection, IpcRequest, IpcResponse, IpcServer, TrackStatus};
use crate::locks::TrackLock;
use crate::util;
use anyhow::{Context, Result};
use moor_anchor::{AnchorError, AnchorManager};
use owo_colors::OwoColorize;
use std::sync::Arc;
use tokio::sync::broadcast;

pub async fn run(name: &str) -> Result<()> {
    let (store, manager) = util::open_manager()?;
    let moor_dir = store.moor_dir().to_path_buf();

    // One tracking process per anchor; duplicate watchers on the same root
    // would double-apply events.
    let _lock = TrackLock::acquire(&moor_dir, name)?;

    let session_id = manager.auto(name).await.context("Failed to start tracking")?;

    let socket = ipc::socket_path(&moor_dir, name);
    let server = IpcServer::start(&socket)
        .await
        .context("Failed to start IPC server")?;

    println!(
        "Tracking anchor {} (session {})",
        name.cyan().bold(),
        session_id.to_string().dimmed()
    );
    println!(
        "{}",
        format!("Stop with 'moor stop {name}' or Ctrl+C").dimmed()
    );

    let status = Arc::new(TrackStatus {
        pid: std::process::id(),
        anchor: name.to_string(),
        session: session_id.to_string(),
        started_at_ms: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time before Unix epoch")
            .as_millis() as u64,
    });

    let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);

    let outcome = run_event_loop(name, &manager, &server, status, shutdown_tx, &mut shutdown_rx).await;

    // Stop is the synchronization point: it returns only after the loop has
    // applied its final batch, so nothing mutates the anchor afterwards.
    manager.stop(name).await?;
    let _ = std::fs::remove_file(&socket);

    match outcome {
        Ok(()) => {
            println!("{} Tracking of '{name}' stopped", "✓".green());
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn run_event_loop(
    name: &str,
    manager: &AnchorManager,
    server: &IpcServer,
    status: Arc<TrackStatus>,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_rx: &mut broadcast::Receiver<()>,
) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        tokio::select! {
            accepted = server.accept() => {
                let stream = match accepted {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::error!("IPC accept failed: {e}");
                        continue;
                    }
                };

                let status = Arc::clone(&status);
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    let result = handle_connection(stream, |request| async move {
                        match request {
                            IpcRequest::GetStatus => IpcResponse::Status((*status).clone()),
                            IpcRequest::Stop => {
                                let _ = shutdown_tx.send(());
                                IpcResponse::Ok
                            }
                        }
                    })
                    .await;
                    if let Err(e) = result {
                        tracing::error!("IPC connection error: {e}");
                    }
                });
            }

            _ = shutdown_rx.recv() => {
                tracing::info!("stop requested via IPC");
                return Ok(());
            }

            result = manager.wait(name) => {
                // The loop ended on its own: watcher death or external stop
                return match result {
                    Err(AnchorError::WatcherTerminated(reason)) => {
                        eprintln!("{} watcher terminated: {reason}", "✗".red());
                        Err(AnchorError::WatcherTerminated(reason).into())
                    }
                    _ => Ok(()),
                };
            }

            _ = sigterm.recv() => {
                tracing::info!("received SIGTERM, shutting down");
                return Ok(());
            }

            _ = sigint.recv() => {
                tracing::info!("received SIGINT, shutting down");
                return Ok(());
            }
        }
    }
}
