use std::thread;
use std::time::Duration;

use log::warn;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::entities::{Club, Fixture, Gameweek, Player, Position};
use crate::http_client::build_client;

const DEFAULT_BASE_URL: &str = "https://fantasy.premierleague.com/api";
const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 300;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network-level or HTTP-level failure after retries. Fatal for a
    /// pipeline run when it happens during raw acquisition.
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed provider payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The raw catalog a single bootstrap call yields: the season calendar
/// plus player and club reference tables.
#[derive(Debug, Clone, Default)]
pub struct BootstrapData {
    pub calendar: Vec<Gameweek>,
    pub players: Vec<Player>,
    pub clubs: Vec<Club>,
}

/// Seam between the pipeline and the remote provider. The pipeline,
/// aggregator, and tests only depend on these record shapes.
pub trait DataProvider {
    fn bootstrap(&self) -> Result<BootstrapData, ProviderError>;
    fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError>;
    /// Entry ids from one classic-league standings page, in rank order.
    fn standings_page(&self, league_id: u32, page: u32) -> Result<Vec<u32>, ProviderError>;
    /// Player ids picked by one manager entry for the given gameweek.
    fn entry_picks(&self, entry_id: u32, gameweek: u32) -> Result<Vec<u32>, ProviderError>;
}

pub struct FplProvider {
    client: Client,
    base_url: String,
}

impl FplProvider {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn fetch_text(&self, url: &str) -> Result<String, ProviderError> {
        let mut last_err = String::new();
        for attempt in 1..=RETRY_ATTEMPTS {
            match self.client.get(url).header(USER_AGENT, "Mozilla/5.0").send() {
                Ok(resp) => {
                    let status = resp.status();
                    match resp.text() {
                        Ok(body) if status.is_success() => return Ok(body),
                        Ok(body) => {
                            let snippet: String = body.chars().take(120).collect();
                            last_err = format!("http {status}: {snippet}");
                        }
                        Err(err) => last_err = format!("failed reading body: {err}"),
                    }
                }
                Err(err) => last_err = format!("request failed: {err}"),
            }
            if attempt < RETRY_ATTEMPTS {
                thread::sleep(Duration::from_millis(RETRY_BACKOFF_MS * attempt as u64));
            }
        }
        Err(ProviderError::Unavailable(last_err))
    }
}

impl DataProvider for FplProvider {
    fn bootstrap(&self) -> Result<BootstrapData, ProviderError> {
        let body = self.fetch_text(&format!("{}/bootstrap-static/", self.base_url))?;
        parse_bootstrap_json(&body)
    }

    fn fixtures(&self) -> Result<Vec<Fixture>, ProviderError> {
        let body = self.fetch_text(&format!("{}/fixtures/", self.base_url))?;
        parse_fixtures_json(&body)
    }

    fn standings_page(&self, league_id: u32, page: u32) -> Result<Vec<u32>, ProviderError> {
        let url = format!(
            "{}/leagues-classic/{league_id}/standings/?page_standings={page}",
            self.base_url
        );
        let body = self.fetch_text(&url)?;
        parse_standings_json(&body)
    }

    fn entry_picks(&self, entry_id: u32, gameweek: u32) -> Result<Vec<u32>, ProviderError> {
        let url = format!(
            "{}/entry/{entry_id}/event/{gameweek}/picks/",
            self.base_url
        );
        let body = self.fetch_text(&url)?;
        parse_entry_picks_json(&body)
    }
}

#[derive(Debug, Deserialize)]
struct RawBootstrap {
    #[serde(default)]
    events: Vec<RawEvent>,
    #[serde(default)]
    elements: Vec<RawElement>,
    #[serde(default)]
    teams: Vec<RawTeam>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u32,
    #[serde(default)]
    is_current: bool,
    #[serde(default)]
    is_next: bool,
}

#[derive(Debug, Deserialize)]
struct RawElement {
    id: u32,
    web_name: String,
    element_type: u8,
    team: u32,
    now_cost: u32,
    #[serde(default)]
    ep_this: Value,
    #[serde(default)]
    form: Value,
    #[serde(default)]
    selected_by_percent: Value,
    #[serde(default)]
    news: Option<String>,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    id: u32,
    code: u32,
    name: String,
    short_name: String,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    id: u32,
    #[serde(default)]
    event: Option<u32>,
    team_h: u32,
    team_a: u32,
    #[serde(default)]
    team_h_difficulty: u8,
    #[serde(default)]
    team_a_difficulty: u8,
}

#[derive(Debug, Deserialize)]
struct RawStandingsPage {
    #[serde(default)]
    standings: RawStandings,
}

#[derive(Debug, Deserialize, Default)]
struct RawStandings {
    #[serde(default)]
    results: Vec<RawStandingsRow>,
}

#[derive(Debug, Deserialize)]
struct RawStandingsRow {
    entry: u32,
}

#[derive(Debug, Deserialize)]
struct RawPicksResponse {
    #[serde(default)]
    picks: Vec<RawPick>,
}

#[derive(Debug, Deserialize)]
struct RawPick {
    element: u32,
}

pub fn parse_bootstrap_json(raw: &str) -> Result<BootstrapData, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(BootstrapData::default());
    }
    let root: RawBootstrap = serde_json::from_str(trimmed)?;

    let calendar = root
        .events
        .iter()
        .map(|event| Gameweek {
            id: event.id,
            is_current: event.is_current,
            is_next: event.is_next,
        })
        .collect();

    let mut players = Vec::with_capacity(root.elements.len());
    for element in root.elements {
        let Some(position) = Position::from_element_type(element.element_type) else {
            warn!(
                "skipping player {} with unknown element_type {}",
                element.id, element.element_type
            );
            continue;
        };
        players.push(Player {
            id: element.id,
            name: element.web_name,
            position,
            club: element.team,
            cost: element.now_cost,
            ep_this: loose_f64(&element.ep_this),
            form: loose_f64(&element.form),
            selected_by_percent: loose_f64(&element.selected_by_percent),
            news: element.news.unwrap_or_default(),
            photo: normalize_photo(element.photo.unwrap_or_default()),
        });
    }

    let clubs = root
        .teams
        .into_iter()
        .map(|team| Club {
            id: team.id,
            code: team.code,
            name: team.name,
            short_name: team.short_name,
        })
        .collect();

    Ok(BootstrapData {
        calendar,
        players,
        clubs,
    })
}

pub fn parse_fixtures_json(raw: &str) -> Result<Vec<Fixture>, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let rows: Vec<RawFixture> = serde_json::from_str(trimmed)?;
    let mut fixtures = Vec::with_capacity(rows.len());
    for row in rows {
        if row.team_h == row.team_a {
            warn!("skipping fixture {} with identical home/away club", row.id);
            continue;
        }
        fixtures.push(Fixture {
            id: row.id,
            gameweek: row.event.unwrap_or(0),
            home: row.team_h,
            away: row.team_a,
            home_difficulty: row.team_h_difficulty,
            away_difficulty: row.team_a_difficulty,
        });
    }
    Ok(fixtures)
}

pub fn parse_standings_json(raw: &str) -> Result<Vec<u32>, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let page: RawStandingsPage = serde_json::from_str(trimmed)?;
    Ok(page.standings.results.into_iter().map(|row| row.entry).collect())
}

pub fn parse_entry_picks_json(raw: &str) -> Result<Vec<u32>, ProviderError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    let response: RawPicksResponse = serde_json::from_str(trimmed)?;
    Ok(response.picks.into_iter().map(|pick| pick.element).collect())
}

// The provider delivers most of its numeric columns as strings ("4.5"),
// occasionally as numbers, and null for players without data.
fn loose_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn normalize_photo(photo: String) -> String {
    photo.replace(".jpg", ".png")
}
