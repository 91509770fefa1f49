//! Listener/bootstrap (§4.H): build shards, replay the log to
//! completion, then open the TCP listener and start serving.

use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::dispatcher;
use crate::errors::BootstrapError;
use crate::peer::{self, DispatchEvent};
use crate::reclog::Reclog;
use crate::shard::ShardBank;

pub struct BootstrapConfig {
    pub password: Arc<[u8]>,
    pub reclog_path: PathBuf,
}

const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Binds `listen_addr` and runs the server until `shutdown` resolves.
pub async fn run(
    listen_addr: SocketAddr,
    config: BootstrapConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BootstrapError> {
    let listener = TcpListener::bind(listen_addr).await?;
    run_with_listener(listener, config, shutdown).await
}

/// Same as [`run`] but takes an already-bound listener — lets tests bind
/// an ephemeral port and learn its address before the server starts
/// accepting.
pub async fn run_with_listener(
    listener: TcpListener,
    config: BootstrapConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BootstrapError> {
    let bank = Arc::new(ShardBank::new());
    let reclog = Arc::new(Reclog::new(config.reclog_path));

    tracing::info!(path = %reclog.path().display(), "recovering from log");
    let (replay_tx, replay_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let replay_handle = {
        let reclog = Arc::clone(&reclog);
        tokio::spawn(async move { reclog.replay(replay_tx).await })
    };
    dispatcher::apply_replayed(&bank, replay_rx).await;
    replay_handle.await.expect("replay task panicked")?;

    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "replay complete, listening");

    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let dispatcher_handle = tokio::spawn(dispatcher::run(events_rx, Arc::clone(&bank), Arc::clone(&reclog)));

    let accept_events_tx = events_tx.clone();
    let accept_password = Arc::clone(&config.password);
    let accept_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let _ = stream.set_nodelay(true);
                    let events = accept_events_tx.clone();
                    let password = Arc::clone(&accept_password);
                    tokio::spawn(peer::handle_connection(stream, addr, password, events));
                }
                Err(err) => tracing::warn!(%err, "accept failed"),
            }
        }
    });

    shutdown.await;
    tracing::info!("shutdown signal received");
    accept_handle.abort();
    let _ = events_tx.send(DispatchEvent::Shutdown).await;
    let _ = dispatcher_handle.await;

    Ok(())
}
