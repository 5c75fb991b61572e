use std::collections::{HashMap, HashSet};
use std::time::Duration;

use fpl_pipeline::entities::Fixture;
use fpl_pipeline::ownership::aggregate;
use fpl_pipeline::provider::{BootstrapData, DataProvider, ProviderError};

/// Picks-only provider: squads keyed by entry id, with a set of entries
/// scripted to fail like a flaky remote.
struct ScriptedPicks {
    squads: HashMap<u32, Vec<u32>>,
    failing: HashSet<u32>,
}

impl DataProvider for ScriptedPicks {
    fn bootstrap(&self) -> Result<BootstrapData, ProviderError> {
        Err(ProviderError::Unavailable("not scripted".into()))
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError> {
        Err(ProviderError::Unavailable("not scripted".into()))
    }

    fn standings_page(&self, _league_id: u32, _page: u32) -> Result<Vec<u32>, ProviderError> {
        Err(ProviderError::Unavailable("not scripted".into()))
    }

    fn entry_picks(&self, entry_id: u32, _gameweek: u32) -> Result<Vec<u32>, ProviderError> {
        if self.failing.contains(&entry_id) {
            return Err(ProviderError::Unavailable(format!(
                "http 503 for entry {entry_id}"
            )));
        }
        Ok(self.squads.get(&entry_id).cloned().unwrap_or_default())
    }
}

fn scripted() -> ScriptedPicks {
    let mut squads = HashMap::new();
    squads.insert(1, vec![11, 12, 13]);
    squads.insert(2, vec![11, 12, 14]);
    squads.insert(3, vec![11, 15]);
    ScriptedPicks {
        squads,
        failing: HashSet::new(),
    }
}

#[test]
fn counts_and_scores_across_managers() {
    let provider = scripted();
    let result = aggregate(&provider, &[1, 2, 3], 7, Duration::ZERO, 0.4);

    assert_eq!(result.sampled, 3);
    assert!(result.failed.is_empty());
    assert_eq!(result.counts[&11], 3);
    assert_eq!(result.counts[&12], 2);
    assert_eq!(result.counts[&15], 1);
    assert!((result.score(11) - 1.2).abs() < 1e-9);
    assert!((result.score(12) - 0.8).abs() < 1e-9);
    assert_eq!(result.score(99), 0.0, "unseen player scores zero");
}

#[test]
fn failed_entry_is_excluded_not_zeroed() {
    let mut provider = scripted();
    provider.failing.insert(2);
    let result = aggregate(&provider, &[1, 2, 3], 7, Duration::ZERO, 0.4);

    assert_eq!(result.sampled, 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].entry_id, 2);
    assert!(result.failed[0].reason.contains("503"));

    // Only entries 1 and 3 contribute; entry 2's unique pick never
    // appears, not even with a zero count.
    assert_eq!(result.counts[&11], 2);
    assert_eq!(result.counts[&12], 1);
    assert!(!result.counts.contains_key(&14));
}

#[test]
fn first_seen_order_is_stable() {
    let provider = scripted();
    let result = aggregate(&provider, &[1, 2, 3], 7, Duration::ZERO, 0.4);
    assert_eq!(result.first_seen, vec![11, 12, 13, 14, 15]);
}

#[test]
fn all_entries_failing_yields_empty_aggregate() {
    let mut provider = scripted();
    provider.failing.extend([1, 2, 3]);
    let result = aggregate(&provider, &[1, 2, 3], 7, Duration::ZERO, 0.4);

    assert_eq!(result.sampled, 0);
    assert_eq!(result.failed.len(), 3);
    assert!(result.counts.is_empty());
    assert!(result.first_seen.is_empty());
}
