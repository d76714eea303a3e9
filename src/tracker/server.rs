use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::Registry;
use crate::config::{MAX_CONNECTIONS, TrackerConfig};
use crate::transport;

/// The swarm registry server.
///
/// Accepts one request per connection and answers REGISTER and GET_PEERS.
/// Handlers run one task per connection, bounded by a semaphore, and the
/// whole loop stops when the cancellation token fires.
pub struct TrackerServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    sample_limit: usize,
    io_timeout: Duration,
    cancel: CancellationToken,
}

impl TrackerServer {
    /// Binds the listener. The registry starts empty.
    pub async fn bind(config: TrackerConfig, cancel: CancellationToken) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        info!(addr = %listener.local_addr()?, "tracker listening");
        Ok(Self {
            listener,
            registry: Arc::new(Registry::new()),
            sample_limit: config.sample_limit,
            io_timeout: config.io_timeout,
            cancel,
        })
    }

    /// The address the tracker is actually listening on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared handle to the registry state.
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
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
                    warn!(error = %e, "tracker accept failed");
                    continue;
                }
            };

            let Ok(permit) = Arc::clone(&limiter).acquire_owned().await else {
                break;
            };
            let registry = Arc::clone(&self.registry);
            let sample_limit = self.sample_limit;
            let io_timeout = self.io_timeout;
            tokio::spawn(async move {
                if let Err(e) = handle_peer(stream, registry, sample_limit, io_timeout).await {
                    debug!(%addr, error = %e, "tracker connection failed");
                }
                drop(permit);
            });
        }
        info!("tracker stopped");
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(super) enum Request {
    Register {
        peer_id: String,
        host: String,
        port: u16,
    },
    GetPeers {
        peer_id: String,
    },
    Malformed(&'static str),
    Unknown,
}

pub(super) fn parse_request(text: &str) -> Request {
    let mut parts = text.split_whitespace();
    match parts.next() {
        Some("REGISTER") => {
            let fields: Vec<&str> = parts.collect();
            let [peer_id, host, port] = fields.as_slice() else {
                return Request::Malformed("Invalid REGISTER format");
            };
            let Ok(port) = port.parse() else {
                return Request::Malformed("Invalid REGISTER format");
            };
            Request::Register {
                peer_id: peer_id.to_string(),
                host: host.to_string(),
                port,
            }
        }
        Some("GET_PEERS") => {
            let fields: Vec<&str> = parts.collect();
            let [peer_id] = fields.as_slice() else {
                return Request::Malformed("Invalid GET_PEERS format");
            };
            Request::GetPeers {
                peer_id: peer_id.to_string(),
            }
        }
        _ => Request::Unknown,
    }
}

async fn handle_peer(
    mut stream: TcpStream,
    registry: Arc<Registry>,
    sample_limit: usize,
    io_timeout: Duration,
) -> std::io::Result<()> {
    let frame = transport::read_frame(&mut stream, io_timeout).await?;
    let text = String::from_utf8_lossy(&frame);

    let reply: Vec<u8> = match parse_request(text.trim()) {
        Request::Register {
            peer_id,
            host,
            port,
        } => {
            registry.register(&peer_id, &host, port);
            info!(%peer_id, %host, port, "peer registered");
            b"OK".to_vec()
        }
        Request::GetPeers { peer_id } => {
            let sample = registry.list_peers(&peer_id, sample_limit);
            debug!(%peer_id, returned = sample.len(), "peer list requested");
            serde_json::to_vec(&sample)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?
        }
        Request::Malformed(reason) => format!("ERROR {reason}").into_bytes(),
        Request::Unknown => b"ERROR Invalid command".to_vec(),
    };

    transport::write_frame(&mut stream, &reply, io_timeout).await
}
