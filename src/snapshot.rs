use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{Gameweek, resolve_current_gameweek};

const SNAPSHOT_VERSION: u32 = 1;
const CALENDAR_FILE: &str = "calendar.json";

/// Derived and raw tables persisted per gameweek. The season calendar is
/// deliberately not listed: it has to be readable before any gameweek is
/// resolvable, so it lives un-keyed next to these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    RawPlayers,
    RawClubs,
    RawFixtures,
    TopManagerSample,
    OwnershipSquad,
    PredictionSquad,
}

impl ArtifactKind {
    pub fn stem(self) -> &'static str {
        match self {
            ArtifactKind::RawPlayers => "players",
            ArtifactKind::RawClubs => "clubs",
            ArtifactKind::RawFixtures => "fixtures",
            ArtifactKind::TopManagerSample => "top_manager_sample",
            ArtifactKind::OwnershipSquad => "ownership_squad",
            ArtifactKind::PredictionSquad => "prediction_squad",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no {kind} snapshot for gameweek {gameweek}")]
    NotFound { kind: ArtifactKind, gameweek: u32 },
    #[error("gameweek calendar is missing or has no current/next flag set")]
    NoGameweekData,
    #[error("snapshot io: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    written_at: String,
    rows: &'a [T],
}

// `written_at` is informational and ignored on read.
#[derive(Deserialize)]
struct Envelope<T> {
    version: u32,
    rows: Vec<T>,
}

/// Gameweek-scoped artifact storage. `write` is the only mutator and
/// swaps the whole file through a `.tmp` sibling, so a reader either sees
/// the previous bundle or the new one, never a partial write.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write<T: Serialize>(
        &self,
        kind: ArtifactKind,
        gameweek: u32,
        rows: &[T],
    ) -> Result<(), SnapshotError> {
        self.write_file(&self.artifact_path(kind, gameweek), rows)
    }

    pub fn read<T: DeserializeOwned>(
        &self,
        kind: ArtifactKind,
        gameweek: u32,
    ) -> Result<Vec<T>, SnapshotError> {
        let path = self.artifact_path(kind, gameweek);
        let not_found = || SnapshotError::NotFound { kind, gameweek };
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(err) => return Err(err.into()),
        };
        let envelope: Envelope<T> = serde_json::from_str(&raw)?;
        // A stale layout version reads as absent: refetch rather than
        // guess at old shapes.
        if envelope.version != SNAPSHOT_VERSION {
            return Err(not_found());
        }
        Ok(envelope.rows)
    }

    /// The calendar spans the whole season and is stored un-keyed; a
    /// rewrite replaces it wholesale like any other artifact.
    pub fn write_calendar(&self, rows: &[Gameweek]) -> Result<(), SnapshotError> {
        self.write_file(&self.root.join(CALENDAR_FILE), rows)
    }

    pub fn read_calendar(&self) -> Result<Vec<Gameweek>, SnapshotError> {
        let path = self.root.join(CALENDAR_FILE);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(SnapshotError::NoGameweekData);
            }
            Err(err) => return Err(err.into()),
        };
        let envelope: Envelope<Gameweek> = serde_json::from_str(&raw)?;
        if envelope.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::NoGameweekData);
        }
        Ok(envelope.rows)
    }

    /// Resolve the working gameweek from the stored calendar. Callers
    /// pass the resolved value explicitly to every read so a mid-run
    /// rollover cannot mix two weeks in one pass.
    pub fn resolve_current_gameweek(&self) -> Result<u32, SnapshotError> {
        let calendar = self.read_calendar()?;
        resolve_current_gameweek(&calendar).ok_or(SnapshotError::NoGameweekData)
    }

    fn artifact_path(&self, kind: ArtifactKind, gameweek: u32) -> PathBuf {
        self.root.join(format!("{}_gw{gameweek}.json", kind.stem()))
    }

    fn write_file<T: Serialize>(&self, path: &Path, rows: &[T]) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.root)?;
        let envelope = EnvelopeRef {
            version: SNAPSHOT_VERSION,
            written_at: Utc::now().to_rfc3339(),
            rows,
        };
        let json = serde_json::to_string(&envelope)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}
