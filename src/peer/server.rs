use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MAX_CONNECTIONS;
use crate::protocol::{decode, Decoded, Message};
use crate::storage::BlockStore;
use crate::transport;

/// Serves this peer's blocks to the swarm.
///
/// Each accepted connection is handled exactly once: one frame in, one frame
/// out, close. Handlers are spawned per connection and bounded by a
/// semaphore.
pub struct BlockServer {
    listener: TcpListener,
    store: Arc<BlockStore>,
    io_timeout: Duration,
    cancel: CancellationToken,
}

impl BlockServer {
    /// Binds the listener. Port 0 picks an ephemeral port; use
    /// [`local_addr`](Self::local_addr) to learn the real one before
    /// registering with the tracker.
    pub async fn bind(
        listen_addr: SocketAddr,
        store: Arc<BlockStore>,
        io_timeout: Duration,
        cancel: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(listen_addr).await?;
        info!(addr = %listener.local_addr()?, "block server listening");
        Ok(Self {
            listener,
            store,
            io_timeout,
            cancel,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until cancelled.
    pub async fn run(self) {
        let limiter = Arc::new(Semaphore::new(MAX_CONNECTIONS));
        loop {
            let accepted = tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, addr) = match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "block server accept failed");
                    continue;
                }
            };

            let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                break;
            };
            let store = Arc::clone(&self.store);
            let io_timeout = self.io_timeout;
            tokio::spawn(async move {
                if let Err(e) = handle_request(stream, store, io_timeout).await {
                    debug!(%addr, error = %e, "block server connection failed");
                }
                drop(permit);
            });
        }
        info!("block server stopped");
    }
}

async fn handle_request(
    mut stream: TcpStream,
    store: Arc<BlockStore>,
    io_timeout: Duration,
) -> std::io::Result<()> {
    let frame = transport::read_frame(&mut stream, io_timeout).await?;

    let reply = match decode(&frame) {
        Decoded::Message(Message::Get(index)) => match store.get(index).await {
            Some(data) => Message::Block { index, data },
            None => Message::Error("Block not found".to_string()),
        },
        Decoded::Message(Message::List) => match store.enumerate().await {
            Ok(indices) => Message::Blocks(indices.into_iter().collect()),
            Err(e) => {
                warn!(error = %e, "block enumeration failed");
                Message::Error("Block list unavailable".to_string())
            }
        },
        _ => Message::Error("Invalid command".to_string()),
    };

    transport::write_frame(&mut stream, &reply.encode(), io_timeout).await
}
