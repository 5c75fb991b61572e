use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::provider::DataProvider;

/// One manager entry whose picks could not be fetched. The entry is
/// excluded from the frequency table entirely; it never contributes
/// zeros.
#[derive(Debug, Clone)]
pub struct FailedFetch {
    pub entry_id: u32,
    pub reason: String,
}

/// Per-player selection frequencies over a sampled manager population.
#[derive(Debug, Clone, Default)]
pub struct OwnershipAggregate {
    /// Raw appearance counts keyed by player id.
    pub counts: HashMap<u32, u32>,
    /// `counts` scaled by the ownership weight; the optimizer objective.
    pub scores: HashMap<u32, f64>,
    /// Player ids in order of first appearance, the stable dedup order
    /// for building the sampled-player table.
    pub first_seen: Vec<u32>,
    pub sampled: usize,
    pub failed: Vec<FailedFetch>,
}

impl OwnershipAggregate {
    pub fn score(&self, player_id: u32) -> f64 {
        self.scores.get(&player_id).copied().unwrap_or(0.0)
    }
}

/// Fetch each sampled manager's picks for `gameweek` and count how often
/// each player appears. Calls are sequential with a fixed sleep between
/// them: the remote provider has an implicit rate limit and this is the
/// backpressure against it, not an optimisation target.
pub fn aggregate(
    provider: &dyn DataProvider,
    entry_ids: &[u32],
    gameweek: u32,
    fetch_delay: Duration,
    weight: f64,
) -> OwnershipAggregate {
    let mut aggregate = OwnershipAggregate::default();

    for (index, &entry_id) in entry_ids.iter().enumerate() {
        match provider.entry_picks(entry_id, gameweek) {
            Ok(picks) => {
                for player_id in picks {
                    let count = aggregate.counts.entry(player_id).or_insert(0);
                    if *count == 0 {
                        aggregate.first_seen.push(player_id);
                    }
                    *count += 1;
                }
                aggregate.sampled += 1;
                debug!("sampled entry {entry_id} ({}/{})", index + 1, entry_ids.len());
            }
            Err(err) => {
                warn!("skipping entry {entry_id}: {err}");
                aggregate.failed.push(FailedFetch {
                    entry_id,
                    reason: err.to_string(),
                });
            }
        }
        if index + 1 < entry_ids.len() {
            thread::sleep(fetch_delay);
        }
    }

    aggregate.scores = aggregate
        .counts
        .iter()
        .map(|(&player_id, &count)| (player_id, f64::from(count) * weight))
        .collect();
    aggregate
}
