use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::{error, info, warn};

use crate::config::PipelineConfig;
use crate::entities::{Player, RosterEntry};
use crate::optimizer;
use crate::ownership;
use crate::provider::DataProvider;
use crate::snapshot::{ArtifactKind, SnapshotStore};

/// Supplies the opaque predicted-points column, keyed by player id.
/// The regression models behind it are a separate concern; the pipeline
/// only consumes their output.
pub trait PredictionSource {
    fn predicted_points(&self, gameweek: u32) -> Result<HashMap<u32, f64>>;
}

/// Predictions exported by the modelling step as a JSON object of
/// `player id -> points`.
pub struct FilePredictions {
    path: PathBuf,
}

impl FilePredictions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PredictionSource for FilePredictions {
    fn predicted_points(&self, _gameweek: u32) -> Result<HashMap<u32, f64>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read predictions file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("parse predictions file {}", self.path.display()))
    }
}

/// Fallback when no model output is wired in: the provider's own
/// expected-points column, read from the snapshotted player catalog for
/// the gameweek being built.
pub struct EpThisPredictions<'a> {
    store: &'a SnapshotStore,
}

impl<'a> EpThisPredictions<'a> {
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }
}

impl PredictionSource for EpThisPredictions<'_> {
    fn predicted_points(&self, gameweek: u32) -> Result<HashMap<u32, f64>> {
        let players: Vec<Player> = self
            .store
            .read(ArtifactKind::RawPlayers, gameweek)
            .context("read player snapshot for ep_this predictions")?;
        Ok(players
            .iter()
            .map(|player| (player.id, player.ep_this))
            .collect())
    }
}

/// What one pipeline run produced, for the caller to print or log.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub gameweek: u32,
    pub players: usize,
    pub clubs: usize,
    pub fixtures: usize,
    pub sampled_managers: usize,
    pub failed_managers: usize,
    pub template_pool: usize,
    pub ownership_objective: Option<f64>,
    pub prediction_objective: Option<f64>,
    pub errors: Vec<String>,
}

/// Sequences one gameweek: acquire raw tables, snapshot them, aggregate
/// ownership over the sampled leaderboard population, then run the two
/// solves (ownership-weighted "template", prediction-weighted "AI") with
/// identical composition/budget/club-cap and snapshot both rosters.
pub struct Pipeline<'a> {
    provider: &'a dyn DataProvider,
    store: &'a SnapshotStore,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn DataProvider, store: &'a SnapshotStore, config: PipelineConfig) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Run for `target_gameweek`, or for the gameweek resolved from the
    /// freshly fetched calendar. Acquisition and calendar failures abort
    /// the run; a failed solve or prediction feed is recorded and the
    /// sibling squad still gets built.
    pub fn run(
        &self,
        target_gameweek: Option<u32>,
        predictions: &dyn PredictionSource,
    ) -> Result<RunSummary> {
        let bootstrap = self
            .provider
            .bootstrap()
            .context("acquire bootstrap catalog")?;
        self.store
            .write_calendar(&bootstrap.calendar)
            .context("snapshot gameweek calendar")?;

        let gameweek = match target_gameweek {
            Some(gw) => gw,
            None => self
                .store
                .resolve_current_gameweek()
                .context("resolve current gameweek")?,
        };
        info!("pipeline run for gameweek {gameweek}");

        let mut summary = RunSummary {
            gameweek,
            players: bootstrap.players.len(),
            clubs: bootstrap.clubs.len(),
            ..RunSummary::default()
        };

        self.store
            .write(ArtifactKind::RawPlayers, gameweek, &bootstrap.players)
            .context("snapshot players")?;
        self.store
            .write(ArtifactKind::RawClubs, gameweek, &bootstrap.clubs)
            .context("snapshot clubs")?;

        let fixtures = self.provider.fixtures().context("acquire fixtures")?;
        summary.fixtures = fixtures.len();
        self.store
            .write(ArtifactKind::RawFixtures, gameweek, &fixtures)
            .context("snapshot fixtures")?;

        let entry_ids = self.sampled_entries().context("acquire leaderboard sample")?;
        let aggregate = ownership::aggregate(
            self.provider,
            &entry_ids,
            gameweek,
            self.config.fetch_delay,
            self.config.ownership_weight,
        );
        summary.sampled_managers = aggregate.sampled;
        summary.failed_managers = aggregate.failed.len();
        for failed in &aggregate.failed {
            summary
                .errors
                .push(format!("entry {}: {}", failed.entry_id, failed.reason));
        }

        // The sampled-player table joins frequency scores back to full
        // catalog rows by id, first appearance first.
        let catalog: HashMap<u32, &Player> = bootstrap
            .players
            .iter()
            .map(|player| (player.id, player))
            .collect();
        let mut template_pool = Vec::new();
        let mut sample_rows = Vec::new();
        for &player_id in &aggregate.first_seen {
            let Some(&player) = catalog.get(&player_id) else {
                warn!("sampled player {player_id} missing from catalog, dropping");
                continue;
            };
            template_pool.push(player.clone());
            sample_rows.push(RosterEntry {
                player: player.clone(),
                score: aggregate.score(player_id),
            });
        }
        summary.template_pool = template_pool.len();
        self.store
            .write(ArtifactKind::TopManagerSample, gameweek, &sample_rows)
            .context("snapshot top-manager sample")?;

        match optimizer::solve(
            &template_pool,
            &self.config.composition,
            self.config.max_per_club,
            self.config.budget,
            self.config.solver_timeout,
            |player| aggregate.score(player.id),
        ) {
            Ok(squad) => {
                self.store
                    .write(ArtifactKind::OwnershipSquad, gameweek, &squad.entries)
                    .context("snapshot ownership squad")?;
                summary.ownership_objective = Some(squad.objective);
            }
            Err(err) => {
                error!("ownership squad solve failed: {err}");
                summary.errors.push(format!("ownership squad: {err}"));
            }
        }

        match predictions.predicted_points(gameweek) {
            Ok(predicted) => {
                match optimizer::solve(
                    &bootstrap.players,
                    &self.config.composition,
                    self.config.max_per_club,
                    self.config.budget,
                    self.config.solver_timeout,
                    |player| predicted.get(&player.id).copied().unwrap_or(0.0),
                ) {
                    Ok(squad) => {
                        self.store
                            .write(ArtifactKind::PredictionSquad, gameweek, &squad.entries)
                            .context("snapshot prediction squad")?;
                        summary.prediction_objective = Some(squad.objective);
                    }
                    Err(err) => {
                        error!("prediction squad solve failed: {err}");
                        summary.errors.push(format!("prediction squad: {err}"));
                    }
                }
            }
            Err(err) => {
                error!("prediction feature unavailable: {err:#}");
                summary.errors.push(format!("prediction feature: {err:#}"));
            }
        }

        Ok(summary)
    }

    /// Entry ids from the configured leaderboard pages, deduplicated in
    /// rank order and capped at `max_managers`.
    fn sampled_entries(&self) -> Result<Vec<u32>> {
        let mut seen = std::collections::HashSet::new();
        let mut entries = Vec::new();
        for page in 1..=self.config.standings_pages {
            let ids = self
                .provider
                .standings_page(self.config.league_id, page)
                .with_context(|| format!("standings page {page}"))?;
            for id in ids {
                if seen.insert(id) {
                    entries.push(id);
                }
            }
            if entries.len() >= self.config.max_managers {
                break;
            }
        }
        entries.truncate(self.config.max_managers);
        Ok(entries)
    }
}
