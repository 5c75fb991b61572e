use serde::{Deserialize, Serialize};

/// The four squad roles the provider encodes as `element_type` 1..=4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Forward,
}

impl Position {
    pub fn from_element_type(code: u8) -> Option<Self> {
        match code {
            1 => Some(Position::Goalkeeper),
            2 => Some(Position::Defender),
            3 => Some(Position::Midfielder),
            4 => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Position::Goalkeeper => "GK",
            Position::Defender => "DEF",
            Position::Midfielder => "MID",
            Position::Forward => "FWD",
        }
    }

    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Forward,
    ];
}

/// One player row from the provider catalog. `id` is the stable join key
/// everywhere; display names are not unique and are never joined on.
/// `cost` is in the provider's tenths-of-a-million unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub position: Position,
    pub club: u32,
    pub cost: u32,
    pub ep_this: f64,
    pub form: f64,
    pub selected_by_percent: f64,
    #[serde(default)]
    pub news: String,
    #[serde(default)]
    pub photo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Club {
    pub id: u32,
    pub code: u32,
    pub name: String,
    pub short_name: String,
}

/// A scheduled match. `gameweek` is 0 while the fixture is unscheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub id: u32,
    pub gameweek: u32,
    pub home: u32,
    pub away: u32,
    pub home_difficulty: u8,
    pub away_difficulty: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gameweek {
    pub id: u32,
    pub is_current: bool,
    pub is_next: bool,
}

/// Required number of players per position. A configuration value, not
/// something derived from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SquadComposition {
    pub goalkeepers: usize,
    pub defenders: usize,
    pub midfielders: usize,
    pub forwards: usize,
}

impl SquadComposition {
    pub fn count(&self, position: Position) -> usize {
        match position {
            Position::Goalkeeper => self.goalkeepers,
            Position::Defender => self.defenders,
            Position::Midfielder => self.midfielders,
            Position::Forward => self.forwards,
        }
    }

    pub fn total(&self) -> usize {
        self.goalkeepers + self.defenders + self.midfielders + self.forwards
    }
}

impl Default for SquadComposition {
    fn default() -> Self {
        Self {
            goalkeepers: 2,
            defenders: 5,
            midfielders: 5,
            forwards: 3,
        }
    }
}

/// A player row together with the objective score it carried when it was
/// sampled or selected. The persisted row type for squad artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: Player,
    pub score: f64,
}

/// Resolve the working gameweek from calendar rows: the last row flagged
/// current wins; with no current flag (pre-season, between gameweeks)
/// fall back to the earliest upcoming gameweek minus one, clamped to 0.
pub fn resolve_current_gameweek(calendar: &[Gameweek]) -> Option<u32> {
    if let Some(current) = calendar.iter().rev().find(|gw| gw.is_current) {
        return Some(current.id);
    }
    calendar
        .iter()
        .filter(|gw| gw.is_next)
        .map(|gw| gw.id)
        .min()
        .map(|next| next.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gw(id: u32, is_current: bool, is_next: bool) -> Gameweek {
        Gameweek {
            id,
            is_current,
            is_next,
        }
    }

    #[test]
    fn current_flag_wins() {
        let calendar = vec![gw(6, false, false), gw(7, true, false), gw(8, false, true)];
        assert_eq!(resolve_current_gameweek(&calendar), Some(7));
    }

    #[test]
    fn falls_back_to_next_minus_one() {
        let calendar = vec![gw(6, false, false), gw(7, false, true), gw(8, false, false)];
        assert_eq!(resolve_current_gameweek(&calendar), Some(6));
    }

    #[test]
    fn preseason_clamps_to_zero() {
        let calendar = vec![gw(0, false, true), gw(1, false, false)];
        assert_eq!(resolve_current_gameweek(&calendar), Some(0));
    }

    #[test]
    fn flagless_calendar_has_no_answer() {
        let calendar = vec![gw(1, false, false), gw(2, false, false)];
        assert_eq!(resolve_current_gameweek(&calendar), None);
        assert_eq!(resolve_current_gameweek(&[]), None);
    }

    #[test]
    fn composition_counts_cover_all_positions() {
        let composition = SquadComposition::default();
        assert_eq!(composition.count(Position::Goalkeeper), 2);
        assert_eq!(composition.count(Position::Forward), 3);
        assert_eq!(composition.total(), 15);
    }
}
