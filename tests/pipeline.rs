use std::collections::{HashMap, HashSet};
use std::time::Duration;

use fpl_pipeline::config::PipelineConfig;
use fpl_pipeline::entities::{
    Club, Fixture, Gameweek, Player, Position, RosterEntry, SquadComposition,
};
use fpl_pipeline::pipeline::{EpThisPredictions, FilePredictions, Pipeline, PredictionSource};
use fpl_pipeline::provider::{BootstrapData, DataProvider, ProviderError};
use fpl_pipeline::snapshot::{ArtifactKind, SnapshotStore};

struct InMemoryProvider {
    bootstrap: BootstrapData,
    fixtures: Vec<Fixture>,
    standings: Vec<u32>,
    squads: HashMap<u32, Vec<u32>>,
    failing_entries: HashSet<u32>,
}

impl DataProvider for InMemoryProvider {
    fn bootstrap(&self) -> Result<BootstrapData, ProviderError> {
        Ok(self.bootstrap.clone())
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError> {
        Ok(self.fixtures.clone())
    }

    fn standings_page(&self, _league_id: u32, page: u32) -> Result<Vec<u32>, ProviderError> {
        if page == 1 {
            Ok(self.standings.clone())
        } else {
            Ok(Vec::new())
        }
    }

    fn entry_picks(&self, entry_id: u32, _gameweek: u32) -> Result<Vec<u32>, ProviderError> {
        if self.failing_entries.contains(&entry_id) {
            return Err(ProviderError::Unavailable(format!(
                "http 429 for entry {entry_id}"
            )));
        }
        Ok(self.squads.get(&entry_id).cloned().unwrap_or_default())
    }
}

fn player(id: u32, position: Position, club: u32, cost: u32, ep_this: f64) -> Player {
    Player {
        id,
        name: format!("Player {id}"),
        position,
        club,
        cost,
        ep_this,
        form: 0.0,
        selected_by_percent: 0.0,
        news: String::new(),
        photo: String::new(),
    }
}

fn world() -> InMemoryProvider {
    let calendar = vec![
        Gameweek { id: 6, is_current: false, is_next: false },
        Gameweek { id: 7, is_current: true, is_next: false },
        Gameweek { id: 8, is_current: false, is_next: true },
    ];
    let clubs = vec![
        Club { id: 1, code: 3, name: "Arsenal".into(), short_name: "ARS".into() },
        Club { id: 2, code: 14, name: "Liverpool".into(), short_name: "LIV".into() },
        Club { id: 3, code: 43, name: "Man City".into(), short_name: "MCI".into() },
    ];
    let players = vec![
        player(101, Position::Goalkeeper, 1, 50, 3.5),
        player(102, Position::Goalkeeper, 2, 45, 3.0),
        player(201, Position::Defender, 1, 55, 4.0),
        player(202, Position::Defender, 2, 60, 4.5),
        player(203, Position::Defender, 3, 48, 3.2),
        player(204, Position::Defender, 1, 52, 3.8),
        player(301, Position::Midfielder, 2, 80, 6.0),
        player(302, Position::Midfielder, 3, 95, 7.1),
        player(303, Position::Midfielder, 1, 70, 5.4),
        player(304, Position::Midfielder, 2, 65, 5.0),
        player(401, Position::Forward, 3, 110, 8.2),
        player(402, Position::Forward, 1, 75, 5.9),
    ];
    let fixtures = vec![Fixture {
        id: 61,
        gameweek: 7,
        home: 1,
        away: 2,
        home_difficulty: 4,
        away_difficulty: 3,
    }];

    let mut squads = HashMap::new();
    squads.insert(7001, vec![101, 201, 202, 301, 302, 401]);
    squads.insert(7002, vec![102, 202, 204, 302, 304, 402]);
    squads.insert(7003, vec![101, 201, 203, 301, 303, 402]);

    InMemoryProvider {
        bootstrap: BootstrapData {
            calendar,
            players,
            clubs,
        },
        fixtures,
        standings: vec![7001, 7002, 7003],
        squads,
        failing_entries: HashSet::new(),
    }
}

fn test_config() -> PipelineConfig {
    PipelineConfig {
        budget: 600,
        max_per_club: 3,
        composition: SquadComposition {
            goalkeepers: 1,
            defenders: 2,
            midfielders: 2,
            forwards: 1,
        },
        league_id: 314,
        standings_pages: 2,
        max_managers: 10,
        fetch_delay: Duration::ZERO,
        ownership_weight: 0.4,
        solver_timeout: Duration::from_secs(20),
    }
}

#[test]
fn run_snapshots_every_artifact_for_the_resolved_gameweek() {
    let provider = world();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let pipeline = Pipeline::new(&provider, &store, test_config());

    let predictions = EpThisPredictions::new(&store);
    let summary = pipeline.run(None, &predictions).expect("run should succeed");

    assert_eq!(summary.gameweek, 7);
    assert_eq!(summary.players, 12);
    assert_eq!(summary.sampled_managers, 3);
    assert_eq!(summary.failed_managers, 0);
    assert!(summary.ownership_objective.is_some());
    assert!(summary.prediction_objective.is_some());
    assert!(summary.errors.is_empty());

    let players: Vec<Player> = store.read(ArtifactKind::RawPlayers, 7).expect("players");
    assert_eq!(players.len(), 12);
    let clubs: Vec<Club> = store.read(ArtifactKind::RawClubs, 7).expect("clubs");
    assert_eq!(clubs.len(), 3);
    let fixtures: Vec<Fixture> = store.read(ArtifactKind::RawFixtures, 7).expect("fixtures");
    assert_eq!(fixtures.len(), 1);

    let sample: Vec<RosterEntry> = store
        .read(ArtifactKind::TopManagerSample, 7)
        .expect("sample");
    assert!(!sample.is_empty());
    // Player 101 appears in two of the three sampled squads.
    let gk = sample
        .iter()
        .find(|entry| entry.player.id == 101)
        .expect("101 was sampled");
    assert!((gk.score - 0.8).abs() < 1e-9);

    let template: Vec<RosterEntry> = store
        .read(ArtifactKind::OwnershipSquad, 7)
        .expect("template squad");
    assert_eq!(template.len(), 6);
    let ai: Vec<RosterEntry> = store
        .read(ArtifactKind::PredictionSquad, 7)
        .expect("ai squad");
    assert_eq!(ai.len(), 6);
}

#[test]
fn failed_manager_is_recovered_and_recorded() {
    let mut provider = world();
    provider.failing_entries.insert(7002);
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let pipeline = Pipeline::new(&provider, &store, test_config());

    let predictions = EpThisPredictions::new(&store);
    let summary = pipeline.run(None, &predictions).expect("run should survive");

    assert_eq!(summary.sampled_managers, 2);
    assert_eq!(summary.failed_managers, 1);
    assert!(summary.errors.iter().any(|err| err.contains("7002")));
    // Both squads still got built from the remaining sample.
    assert!(summary.ownership_objective.is_some());
    assert!(summary.prediction_objective.is_some());
}

#[test]
fn reruns_are_idempotent_on_unchanged_data() {
    let provider = world();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let pipeline = Pipeline::new(&provider, &store, test_config());
    let predictions = EpThisPredictions::new(&store);

    let first = pipeline.run(None, &predictions).expect("first run");
    let second = pipeline.run(None, &predictions).expect("second run");

    assert_eq!(first.gameweek, second.gameweek);
    let (Some(a), Some(b)) = (first.ownership_objective, second.ownership_objective) else {
        panic!("ownership squads should exist on both runs");
    };
    assert!((a - b).abs() < 1e-9);
    let (Some(a), Some(b)) = (first.prediction_objective, second.prediction_objective) else {
        panic!("prediction squads should exist on both runs");
    };
    assert!((a - b).abs() < 1e-9);
}

#[test]
fn file_predictions_read_back_the_exported_map() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("preds.json");
    std::fs::write(&path, r#"{"101": 5.5, "302": 7.25}"#).expect("write predictions");

    let source = FilePredictions::new(&path);
    let points = source.predicted_points(7).expect("well-formed file");
    assert_eq!(points.len(), 2);
    assert!((points[&101] - 5.5).abs() < 1e-9);
    assert!((points[&302] - 7.25).abs() < 1e-9);
}

#[test]
fn file_predictions_surface_missing_and_malformed_files() {
    let dir = tempfile::tempdir().expect("tempdir");

    let missing = FilePredictions::new(dir.path().join("absent.json"));
    let err = missing.predicted_points(7).expect_err("no such file");
    assert!(err.to_string().contains("absent.json"));

    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{not json").expect("write predictions");
    let err = FilePredictions::new(&path)
        .predicted_points(7)
        .expect_err("unparseable file");
    assert!(err.to_string().contains("broken.json"));
}

#[test]
fn explicit_target_gameweek_keys_the_artifacts() {
    let provider = world();
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SnapshotStore::new(dir.path());
    let pipeline = Pipeline::new(&provider, &store, test_config());
    let predictions = EpThisPredictions::new(&store);

    let summary = pipeline.run(Some(9), &predictions).expect("run");
    assert_eq!(summary.gameweek, 9);
    assert!(store.read::<Player>(ArtifactKind::RawPlayers, 9).is_ok());
    assert!(store.read::<Player>(ArtifactKind::RawPlayers, 7).is_err());
}
