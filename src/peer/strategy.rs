use std::collections::{BTreeSet, HashMap, HashSet};

use rand::seq::SliceRandom;
use tracing::debug;

use crate::config::MAX_UNCHOKED;

/// One cycle's snapshot of the swarm: peer key (`host:port`) to the blocks
/// that peer offers. Rebuilt from live queries every cycle, never persisted.
pub type SwarmView = HashMap<String, HashSet<u32>>;

/// Orders the blocks the local peer is missing from rarest to most common.
///
/// A block's rarity is the number of peers in the view offering it. Blocks
/// with equal counts are ordered by ascending index, so the result is
/// reproducible for identical input.
pub fn rarest_first(view: &SwarmView, local: &HashSet<u32>) -> Vec<u32> {
    let mut frequency: HashMap<u32, usize> = HashMap::new();
    for blocks in view.values() {
        for &block in blocks {
            if !local.contains(&block) {
                *frequency.entry(block).or_insert(0) += 1;
            }
        }
    }

    let mut order: Vec<u32> = frequency.keys().copied().collect();
    order.sort_unstable_by_key(|block| (frequency[block], *block));
    order
}

/// Tit-for-tat unchoke state.
///
/// Up to [`MAX_UNCHOKED`] regular slots go to the peers offering the most
/// blocks the local peer lacks; one extra optimistic slot is drawn at random
/// from everyone else, giving unproven peers a trial window. The state is
/// recomputed on a slower cadence than block fetches, so an optimistic pick
/// stays unchoked long enough to show its worth.
#[derive(Debug, Default)]
pub struct Strategy {
    regular_unchoked: Vec<String>,
    optimistic: Option<String>,
}

impl Strategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recomputes the unchoke set from a swarm snapshot.
    ///
    /// `known_peers` may contain peers absent from the view (reported by the
    /// registry but not successfully queried this cycle); they are still
    /// optimistic-unchoke candidates.
    pub fn update_unchoked(
        &mut self,
        known_peers: &[String],
        view: &SwarmView,
        local: &HashSet<u32>,
    ) {
        let mut scored: Vec<(&String, usize)> = view
            .iter()
            .map(|(peer, blocks)| (peer, blocks.difference(local).count()))
            .collect();
        // Ties broken by peer key so the regular set is deterministic.
        scored.sort_by(|(a_peer, a_score), (b_peer, b_score)| {
            b_score.cmp(a_score).then_with(|| a_peer.cmp(b_peer))
        });

        self.regular_unchoked = scored
            .iter()
            .take(MAX_UNCHOKED)
            .map(|(peer, _)| (*peer).clone())
            .collect();

        let candidates: BTreeSet<&String> = known_peers
            .iter()
            .chain(view.keys())
            .filter(|peer| !self.regular_unchoked.contains(peer))
            .collect();
        let candidates: Vec<&String> = candidates.into_iter().collect();
        self.optimistic = candidates
            .choose(&mut rand::thread_rng())
            .map(|peer| (*peer).clone());

        debug!(regular = ?self.regular_unchoked, optimistic = ?self.optimistic, "unchoke set updated");
    }

    /// The regular unchoked peers followed by the optimistic one, if any.
    pub fn unchoked(&self) -> Vec<&str> {
        self.regular_unchoked
            .iter()
            .map(String::as_str)
            .chain(self.optimistic.as_deref())
            .collect()
    }

    /// Whether requests to `peer` are currently allowed.
    pub fn is_unchoked(&self, peer: &str) -> bool {
        self.regular_unchoked.iter().any(|p| p == peer) || self.optimistic.as_deref() == Some(peer)
    }

    /// The current optimistic pick, if one was drawn.
    pub fn optimistic(&self) -> Option<&str> {
        self.optimistic.as_deref()
    }

    /// The current regular unchoke list, highest score first.
    pub fn regular_unchoked(&self) -> &[String] {
        &self.regular_unchoked
    }
}
