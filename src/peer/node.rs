use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::BlockClient;
use super::server::BlockServer;
use super::strategy::{rarest_first, Strategy, SwarmView};
use crate::config::{PeerConfig, RECONSTRUCT_RETRY_DELAY};
use crate::storage::{BlockStore, StorageError};
use crate::tracker::{PeerRecord, TrackerClient};

const SEED_IDLE_PERIOD: Duration = Duration::from_secs(60);

/// True on the cycles where the choke state should be recomputed: the first
/// cycle and every `every` cycles after. Between refreshes the unchoke set
/// is held, so an optimistic pick keeps a stable trial window. A zero
/// cadence is clamped to refreshing every cycle.
pub(super) fn choke_refresh_due(cycle: u64, every: u64) -> bool {
    cycle % every.max(1) == 0
}

/// Lifecycle state of a peer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Still missing blocks; fetching from the swarm.
    Downloading,
    /// All blocks local; assembling the output file.
    Reconstructing,
    /// File reconstructed; serving blocks indefinitely.
    Seeding,
}

/// A full swarm participant.
///
/// Construction opens the block store and binds the block server, so the
/// real listen port is known before anything is registered. [`run`]
/// drives the download → reconstruct → seed lifecycle until the
/// cancellation token fires; the block server keeps serving in every state.
///
/// [`run`]: PeerNode::run
pub struct PeerNode {
    config: PeerConfig,
    store: Arc<BlockStore>,
    server: Option<BlockServer>,
    local_addr: SocketAddr,
    tracker: TrackerClient,
    client: BlockClient,
    strategy: Strategy,
    cancel: CancellationToken,
    state_tx: watch::Sender<NodeState>,
}

impl PeerNode {
    pub async fn new(
        config: PeerConfig,
        cancel: CancellationToken,
    ) -> Result<Self, super::PeerError> {
        let store = Arc::new(BlockStore::open(&config.base_dir, &config.peer_id).await?);
        let server = BlockServer::bind(
            config.listen_addr,
            Arc::clone(&store),
            config.io_timeout,
            cancel.clone(),
        )
        .await?;
        let local_addr = server.local_addr()?;

        let tracker = TrackerClient::with_timeout(config.tracker_addr, config.io_timeout);
        let client = BlockClient::new(Arc::clone(&store), config.io_timeout);
        let (state_tx, _) = watch::channel(NodeState::Downloading);

        Ok(Self {
            config,
            store,
            server: Some(server),
            local_addr,
            tracker,
            client,
            strategy: Strategy::new(),
            cancel,
            state_tx,
        })
    }

    /// The address the block server is serving on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Shared handle to this node's block store.
    pub fn store(&self) -> Arc<BlockStore> {
        Arc::clone(&self.store)
    }

    /// Observer for lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<NodeState> {
        self.state_tx.subscribe()
    }

    /// Runs the node until cancelled. The block server is spawned first and
    /// keeps answering requests through every lifecycle state.
    pub async fn run(mut self) {
        if let Some(server) = self.server.take() {
            tokio::spawn(server.run());
        }

        let peer_id = self.config.peer_id.clone();
        info!(%peer_id, addr = %self.local_addr, total_blocks = self.config.total_blocks, "peer node starting");

        let mut interval = tokio::time::interval(self.config.cycle_period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut registered = false;
        let mut cycle: u64 = 0;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            // Discovery stalls on previously known peers until the first
            // successful registration.
            if !registered {
                match self
                    .tracker
                    .register(
                        &peer_id,
                        &self.config.advertised_host,
                        self.local_addr.port(),
                    )
                    .await
                {
                    Ok(()) => {
                        info!(%peer_id, port = self.local_addr.port(), "registered with tracker");
                        registered = true;
                    }
                    Err(e) => warn!(%peer_id, error = %e, "tracker registration failed"),
                }
            }

            let local = match self.store.enumerate().await {
                Ok(local) => local,
                Err(e) => {
                    warn!(%peer_id, error = %e, "block enumeration failed");
                    continue;
                }
            };
            debug!(%peer_id, have = local.len(), "cycle start");

            if (0..self.config.total_blocks).all(|i| local.contains(&i)) {
                if self.try_reconstruct(&peer_id).await {
                    self.seed_until_cancelled(&peer_id).await;
                    break;
                }
                continue;
            }

            let records = match self.tracker.get_peers(&peer_id).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(%peer_id, error = %e, "peer list query failed");
                    Vec::new()
                }
            };

            let (view, endpoints) = self.build_swarm_view(&records).await;

            // Choke state is refreshed on a slower cadence than fetches so
            // an optimistic pick gets a stable trial window.
            if choke_refresh_due(cycle, self.config.choke_update_cycles) {
                let known: Vec<String> = endpoints.keys().cloned().collect();
                self.strategy.update_unchoked(&known, &view, &local);
            }

            self.fetch_one_block(&view, &endpoints, &local).await;

            cycle += 1;
        }

        info!(%peer_id, "peer node stopped");
    }

    /// Queries every reported peer's inventory, omitting unreachable peers
    /// from the view. Returns the view plus the key → endpoint map for every
    /// peer the registry reported; hostnames are kept as-is and resolve at
    /// connect time.
    async fn build_swarm_view(
        &self,
        records: &[PeerRecord],
    ) -> (SwarmView, HashMap<String, (String, u16)>) {
        let mut view = SwarmView::new();
        let mut endpoints = HashMap::new();

        for record in records {
            let key = format!("{}:{}", record.host, record.port);
            endpoints.insert(key.clone(), (record.host.clone(), record.port));

            if let Some(blocks) = self.client.fetch_blocks(&record.host, record.port).await {
                view.insert(key, blocks);
            }
        }

        (view, endpoints)
    }

    /// Walks the rarest-first order and fetches from the first unchoked
    /// holder. Deliberately stops after one successful fetch: one block per
    /// cycle is this design's throughput bound.
    async fn fetch_one_block(
        &self,
        view: &SwarmView,
        endpoints: &HashMap<String, (String, u16)>,
        local: &HashSet<u32>,
    ) {
        for block in rarest_first(view, local) {
            for peer in self.strategy.unchoked() {
                let offers = view.get(peer).is_some_and(|blocks| blocks.contains(&block));
                if !offers {
                    continue;
                }
                let Some((host, port)) = endpoints.get(peer) else {
                    continue;
                };
                if self.client.fetch_block(host, *port, block).await {
                    info!(peer_id = %self.config.peer_id, block, from = peer, "block fetched");
                    return;
                }
            }
        }
    }

    /// Attempts reconstruction; returns true when the node should move to
    /// seeding.
    async fn try_reconstruct(&self, peer_id: &str) -> bool {
        self.state_tx.send_replace(NodeState::Reconstructing);
        let output = self.config.output_path();

        match self
            .store
            .reconstruct(self.config.total_blocks, &output)
            .await
        {
            Ok(()) => {
                info!(peer_id, path = %output.display(), "file reconstructed, seeding");
                self.state_tx.send_replace(NodeState::Seeding);
                true
            }
            Err(StorageError::Incomplete { missing }) => {
                warn!(peer_id, ?missing, "reconstruction incomplete");
                self.state_tx.send_replace(NodeState::Downloading);
                tokio::time::sleep(RECONSTRUCT_RETRY_DELAY).await;
                false
            }
            Err(e) => {
                warn!(peer_id, error = %e, "reconstruction failed");
                self.state_tx.send_replace(NodeState::Downloading);
                tokio::time::sleep(RECONSTRUCT_RETRY_DELAY).await;
                false
            }
        }
    }

    /// Terminal state: stay online as a source for the swarm.
    async fn seed_until_cancelled(&self, peer_id: &str) {
        info!(peer_id, "seeding");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(SEED_IDLE_PERIOD) => {}
            }
        }
    }
}
