//! End-to-end swarm test: a tracker and three peers, each seeded with a
//! disjoint slice of the file, exchanging blocks until everyone seeds.

use std::net::SocketAddr;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use blockswarm::{
    config::{PeerConfig, TrackerConfig},
    storage::BlockStore,
    NodeState, PeerNode, TrackerServer,
};

const BLOCKS: &[&[u8]] = &[
    b"block zero ",
    b"block one ",
    b"block two ",
    b"block three ",
    b"block four ",
    b"block five",
];

fn full_file() -> Vec<u8> {
    BLOCKS.concat()
}

async fn start_tracker(cancel: &CancellationToken) -> SocketAddr {
    let config = TrackerConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    let server = TrackerServer::bind(config, cancel.clone()).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

async fn seed_initial_blocks(base: &std::path::Path, peer_id: &str, indices: &[u32]) {
    let store = BlockStore::open(base, peer_id).await.unwrap();
    for &index in indices {
        store.put(index, BLOCKS[index as usize]).await.unwrap();
    }
}

fn fast_config(peer_id: &str, tracker: SocketAddr, base: &std::path::Path) -> PeerConfig {
    let mut config = PeerConfig::new(peer_id, tracker, base, BLOCKS.len() as u32);
    config.cycle_period = Duration::from_millis(50);
    config
}

#[tokio::test]
async fn test_three_peer_swarm_converges_to_seeding() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    let cancel = CancellationToken::new();
    let tracker_addr = start_tracker(&cancel).await;

    // Bootstrap: every block exists on exactly one peer at swarm genesis.
    seed_initial_blocks(base, "peer_1", &[0, 1]).await;
    seed_initial_blocks(base, "peer_2", &[2, 3]).await;
    seed_initial_blocks(base, "peer_3", &[4, 5]).await;

    let mut observers = Vec::new();
    for peer_id in ["peer_1", "peer_2", "peer_3"] {
        let config = fast_config(peer_id, tracker_addr, base);
        let node = PeerNode::new(config, cancel.clone()).await.unwrap();
        observers.push((peer_id, node.state()));
        tokio::spawn(node.run());
    }

    for (peer_id, observer) in &mut observers {
        tokio::time::timeout(
            Duration::from_secs(60),
            observer.wait_for(|state| *state == NodeState::Seeding),
        )
        .await
        .unwrap_or_else(|_| panic!("{peer_id} never reached seeding"))
        .unwrap();
    }

    // Every peer reconstructed the identical original file.
    let expected = full_file();
    for peer_id in ["peer_1", "peer_2", "peer_3"] {
        let output = base.join("restored").join(format!("{peer_id}.bin"));
        let contents = tokio::fs::read(&output).await.unwrap();
        assert_eq!(contents, expected, "{peer_id} reconstructed wrong bytes");
    }

    cancel.cancel();
}

#[tokio::test]
async fn test_seeder_keeps_serving_after_completion() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    let cancel = CancellationToken::new();
    let tracker_addr = start_tracker(&cancel).await;

    // One complete seeder, one empty leecher.
    seed_initial_blocks(base, "seeder", &[0, 1, 2, 3, 4, 5]).await;

    let seeder = PeerNode::new(fast_config("seeder", tracker_addr, base), cancel.clone())
        .await
        .unwrap();
    let mut seeder_state = seeder.state();
    tokio::spawn(seeder.run());

    tokio::time::timeout(
        Duration::from_secs(30),
        seeder_state.wait_for(|state| *state == NodeState::Seeding),
    )
    .await
    .expect("seeder never finished reconstructing")
    .unwrap();

    let leecher = PeerNode::new(fast_config("leecher", tracker_addr, base), cancel.clone())
        .await
        .unwrap();
    let mut leecher_state = leecher.state();
    let leecher_store = leecher.store();
    tokio::spawn(leecher.run());

    tokio::time::timeout(
        Duration::from_secs(60),
        leecher_state.wait_for(|state| *state == NodeState::Seeding),
    )
    .await
    .expect("leecher never completed against a lone seeder")
    .unwrap();

    let have = leecher_store.enumerate().await.unwrap();
    assert_eq!(have.len(), BLOCKS.len());

    cancel.cancel();
}

#[tokio::test]
async fn test_hostname_registered_peer_is_reachable() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    let cancel = CancellationToken::new();
    let tracker_addr = start_tracker(&cancel).await;

    seed_initial_blocks(base, "seeder", &[0, 1, 2, 3, 4, 5]).await;

    // The seeder advertises itself by hostname; the leecher must resolve it
    // rather than expect an IP literal in the peer list.
    let mut seeder_config = fast_config("seeder", tracker_addr, base);
    seeder_config.advertised_host = "localhost".to_string();
    let seeder = PeerNode::new(seeder_config, cancel.clone()).await.unwrap();
    let mut seeder_state = seeder.state();
    tokio::spawn(seeder.run());

    tokio::time::timeout(
        Duration::from_secs(30),
        seeder_state.wait_for(|state| *state == NodeState::Seeding),
    )
    .await
    .expect("seeder never finished reconstructing")
    .unwrap();

    let leecher = PeerNode::new(fast_config("leecher", tracker_addr, base), cancel.clone())
        .await
        .unwrap();
    let mut leecher_state = leecher.state();
    tokio::spawn(leecher.run());

    tokio::time::timeout(
        Duration::from_secs(60),
        leecher_state.wait_for(|state| *state == NodeState::Seeding),
    )
    .await
    .expect("leecher never completed against a hostname-registered seeder")
    .unwrap();

    cancel.cancel();
}

#[tokio::test]
async fn test_cancellation_stops_the_swarm() {
    let temp = TempDir::new().unwrap();
    let base = temp.path();
    let cancel = CancellationToken::new();
    let tracker_addr = start_tracker(&cancel).await;

    seed_initial_blocks(base, "peer_1", &[0]).await;

    let node = PeerNode::new(fast_config("peer_1", tracker_addr, base), cancel.clone())
        .await
        .unwrap();
    let handle = tokio::spawn(node.run());

    // Let it run a few cycles, then shut everything down.
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("node did not stop after cancellation")
        .unwrap();
}
