//! Peer reader: owns one TCP connection end-to-end (§4.F).

use std::net::SocketAddr;
use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio_util::codec::FramedRead;

use crate::codec::{RequestCodec, RequestFrame};

/// One event fed onto the dispatcher's single multiplexed channel (§4.G).
/// Ordering between `NewPeer` and the first `Frame` for the same peer is
/// guaranteed by construction: the task below sends `NewPeer` and only
/// then starts producing `Frame`s, and both travel over the same `mpsc`
/// channel, so FIFO delivery does the rest.
pub enum DispatchEvent {
    NewPeer { addr: SocketAddr, writer: OwnedWriteHalf },
    DropPeer { addr: SocketAddr },
    Frame { addr: SocketAddr, frame: RequestFrame },
    Shutdown,
}

/// Authenticates and then owns one connection end-to-end.
///
/// The password handshake runs inline here, before the peer is ever
/// registered with the dispatcher — an unauthenticated connection never
/// becomes visible to the rest of the system. A password split across
/// TCP segments is treated as a hard failure: exactly `password.len()`
/// bytes are read in one `read_exact`, and anything short of that (or a
/// transport error) fails auth (§9 open question — length-equals-buffer
/// is the accepted hard limit, not a loop-until-terminator).
pub async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    password: Arc<[u8]>,
    events: mpsc::Sender<DispatchEvent>,
) {
    let mut buf = vec![0u8; password.len()];
    let authenticated = matches!(stream.read_exact(&mut buf).await, Ok(()) if buf == *password);

    if stream.write_u8(if authenticated { 1 } else { 0 }).await.is_err() {
        return;
    }
    if stream.flush().await.is_err() {
        return;
    }

    if !authenticated {
        tracing::debug!(%addr, "auth failed, closing connection");
        let _ = stream.shutdown().await;
        return;
    }

    tracing::debug!(%addr, "peer authenticated");
    let (read_half, write_half) = stream.into_split();

    if events.send(DispatchEvent::NewPeer { addr, writer: write_half }).await.is_err() {
        return;
    }

    let mut frames = FramedRead::new(read_half, RequestCodec::new());
    loop {
        match frames.next().await {
            Some(Ok(frame)) => {
                if events.send(DispatchEvent::Frame { addr, frame }).await.is_err() {
                    break;
                }
            }
            Some(Err(err)) => {
                tracing::debug!(%addr, %err, "malformed frame, dropping peer");
                break;
            }
            None => {
                tracing::debug!(%addr, "peer disconnected");
                break;
            }
        }
    }

    let _ = events.send(DispatchEvent::DropPeer { addr }).await;
}
