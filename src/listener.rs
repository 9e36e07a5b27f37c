//! UDP listener (C6): bind, shutdown-aware receive loop, spawn-per-packet.
//!
//! Grounded on `src/server.rs`'s `run_udp_server`, trimmed of rate
//! limiting, the semaphore-gated concurrency cap, the buffer pool, and
//! metrics — none of those are in scope here (spec Non-goals: no admission
//! control, no observability surface beyond logging).

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::error::HostwardenError;
use crate::handler::{self, HandlerState};

const MAX_DATAGRAM: usize = 512;

pub async fn run(
    bind_addr: String,
    state: Arc<HandlerState>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), HostwardenError> {
    let socket = Arc::new(UdpSocket::bind(&bind_addr).await.map_err(HostwardenError::Io)?);
    info!(bind_addr, "listening for DNS queries");

    loop {
        let mut buf = [0u8; MAX_DATAGRAM];

        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("listener received shutdown signal");
                return Ok(());
            }
            result = socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, peer)) => {
                        spawn_handler(socket.clone(), state.clone(), buf, len, peer);
                    }
                    Err(e) => {
                        warn!(error = %e, "recv_from failed");
                    }
                }
            }
        }
    }
}

fn spawn_handler(socket: Arc<UdpSocket>, state: Arc<HandlerState>, buf: [u8; MAX_DATAGRAM], len: usize, peer: SocketAddr) {
    tokio::spawn(async move {
        let task = tokio::spawn(async move { handler::handle(&state, &buf[..len]).await });

        let reply = match task.await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, peer = %peer, "packet handler panicked, dropping without a reply");
                return;
            }
        };

        if reply.is_empty() {
            return;
        }
        if let Err(e) = socket.send_to(&reply, peer).await {
            error!(error = %e, peer = %peer, "failed to send reply");
        }
    });
}
