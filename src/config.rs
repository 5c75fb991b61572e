use std::str::FromStr;
use std::time::Duration;

use crate::entities::SquadComposition;

/// The overall public league every manager is enrolled in.
pub const OVERALL_LEAGUE_ID: u32 = 314;

/// Run-wide knobs. Defaults mirror the provider's game rules (1000
/// budget units, at most 3 players per club, 2/5/5/3 squad shape) and
/// the sampling behaviour of the leaderboard scan.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub budget: u32,
    pub max_per_club: usize,
    pub composition: SquadComposition,
    pub league_id: u32,
    /// Leaderboard pages scanned for the sampled manager population.
    pub standings_pages: u32,
    /// Hard cap on the sampled population regardless of page size.
    pub max_managers: usize,
    /// Mandatory pause between per-manager picks fetches (rate limit).
    pub fetch_delay: Duration,
    pub ownership_weight: f64,
    pub solver_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            budget: 1000,
            max_per_club: 3,
            composition: SquadComposition::default(),
            league_id: OVERALL_LEAGUE_ID,
            standings_pages: 5,
            max_managers: 250,
            fetch_delay: Duration::from_secs(2),
            ownership_weight: 0.4,
            solver_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineConfig {
    /// Defaults with environment overrides; unparseable values fall back
    /// silently like the rest of the env knobs in this crate.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            budget: env_parse("FPL_BUDGET").unwrap_or(defaults.budget),
            max_per_club: env_parse("FPL_MAX_PER_CLUB").unwrap_or(defaults.max_per_club),
            composition: defaults.composition,
            league_id: env_parse("FPL_LEAGUE_ID").unwrap_or(defaults.league_id),
            standings_pages: env_parse("FPL_STANDINGS_PAGES").unwrap_or(defaults.standings_pages),
            max_managers: env_parse("FPL_MAX_MANAGERS").unwrap_or(defaults.max_managers),
            fetch_delay: env_parse("FPL_FETCH_DELAY_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.fetch_delay),
            ownership_weight: env_parse("FPL_OWNERSHIP_WEIGHT")
                .unwrap_or(defaults.ownership_weight),
            solver_timeout: env_parse("FPL_SOLVER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.solver_timeout),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|val| val.trim().parse().ok())
}
