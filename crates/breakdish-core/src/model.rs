// Immutable league data handed to the engine by ingestion, plus the roster
// and override shapes callers build around it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

/// Canonical form of a player or team name: trimmed, lowercased, internal
/// whitespace collapsed to single spaces.
///
/// All identity comparisons in the engine go through this, so "Jo  Smith"
/// and "jo smith" refer to the same player.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// True when two names refer to the same player or team.
pub fn same_name(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}

// ---------------------------------------------------------------------------
// Frames and match results
// ---------------------------------------------------------------------------

/// Which side of a fixture something belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }
}

/// A match is played as two sets of frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SetNumber {
    One,
    Two,
}

impl SetNumber {
    pub fn from_index(index: u8) -> Option<SetNumber> {
        match index {
            1 => Some(SetNumber::One),
            2 => Some(SetNumber::Two),
            _ => None,
        }
    }
}

/// One individual frame (game) within a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub date: NaiveDate,
    pub division: String,
    pub home_team: String,
    pub away_team: String,
    pub home_player: String,
    pub away_player: String,
    pub set: SetNumber,
    pub winner: Side,
    /// Break-and-dish by the frame winner.
    pub break_and_dish: bool,
    /// The loser did not play; the frame was awarded.
    pub forfeit: bool,
    /// Cup frames are excluded from league-only calculations.
    pub cup: bool,
}

impl Frame {
    /// The side `player` played on in this frame, if any.
    pub fn side_of(&self, player: &str) -> Option<Side> {
        let key = normalize_name(player);
        if normalize_name(&self.home_player) == key {
            Some(Side::Home)
        } else if normalize_name(&self.away_player) == key {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// The side `team` played on in this frame, if any.
    pub fn team_side(&self, team: &str) -> Option<Side> {
        let key = normalize_name(team);
        if normalize_name(&self.home_team) == key {
            Some(Side::Home)
        } else if normalize_name(&self.away_team) == key {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn player(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_player,
            Side::Away => &self.away_player,
        }
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }
}

/// One team-vs-team fixture result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub date: NaiveDate,
    pub division: String,
    pub home_team: String,
    pub away_team: String,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(default)]
    pub cup: bool,
}

/// Outcome of a fixture from one team's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn letter(self) -> char {
        match self {
            Outcome::Win => 'W',
            Outcome::Draw => 'D',
            Outcome::Loss => 'L',
        }
    }
}

impl MatchResult {
    /// The result as seen by `team`, or `None` if the team did not play.
    pub fn outcome_for(&self, team: &str) -> Option<Outcome> {
        let key = normalize_name(team);
        let (ours, theirs) = if normalize_name(&self.home_team) == key {
            (self.home_score, self.away_score)
        } else if normalize_name(&self.away_team) == key {
            (self.away_score, self.home_score)
        } else {
            return None;
        };
        Some(if ours > theirs {
            Outcome::Win
        } else if ours < theirs {
            Outcome::Loss
        } else {
            Outcome::Draw
        })
    }

    pub fn involves(&self, team: &str) -> bool {
        same_name(&self.home_team, team) || same_name(&self.away_team, team)
    }
}

// ---------------------------------------------------------------------------
// Derived player stats and rosters
// ---------------------------------------------------------------------------

/// Aggregate record for one player over one season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSeasonStat {
    pub player: String,
    pub team: Option<String>,
    pub played: u32,
    pub won: u32,
    /// Raw win percentage, 0-100. Zero when nothing was played.
    pub pct: f64,
    pub bd_for: u32,
    pub bd_against: u32,
    pub forfeits: u32,
    /// Includes cup frames; excluded from league-only calculations.
    pub cup: bool,
}

impl PlayerSeasonStat {
    /// A zeroed record: the typed "no data" value.
    pub fn empty(player: &str) -> Self {
        PlayerSeasonStat {
            player: player.to_string(),
            team: None,
            played: 0,
            won: 0,
            pct: 0.0,
            bd_for: 0,
            bd_against: 0,
            forfeits: 0,
            cup: false,
        }
    }

    pub fn lost(&self) -> u32 {
        self.played.saturating_sub(self.won)
    }
}

/// A player's record for one season. `None` means the player has no games
/// that season, which is distinct from a record of zero wins.
pub type SeasonStat = Option<PlayerSeasonStat>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub stat: SeasonStat,
    /// Adjusted win rate (0-1) carried over from a previous season.
    pub prior_rating: Option<f64>,
}

impl RosterEntry {
    pub fn new(name: &str, stat: SeasonStat) -> Self {
        RosterEntry {
            name: name.to_string(),
            stat,
            prior_rating: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRoster {
    pub team: String,
    pub players: Vec<RosterEntry>,
}

impl TeamRoster {
    pub fn contains(&self, player: &str) -> bool {
        self.players.iter().any(|p| same_name(&p.name, player))
    }
}

/// Find a team's roster by name.
pub fn find_roster<'a>(rosters: &'a [TeamRoster], team: &str) -> Option<&'a TeamRoster> {
    rosters.iter().find(|r| same_name(&r.team, team))
}

/// A hypothetical roster change. Shadows the real roster for prediction only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SquadOverride {
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

impl SquadOverride {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Squad overrides keyed by team name.
pub type SquadOverrides = BTreeMap<String, SquadOverride>;

// ---------------------------------------------------------------------------
// Season structure
// ---------------------------------------------------------------------------

/// A fixture still to be played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fixture {
    pub home: String,
    pub away: String,
}

/// A manually pinned outcome for a future fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedResult {
    pub home: String,
    pub away: String,
    pub home_score: u32,
    pub away_score: u32,
}

impl LockedResult {
    pub fn matches(&self, fixture: &Fixture) -> bool {
        same_name(&self.home, &fixture.home) && same_name(&self.away, &fixture.away)
    }
}

/// A team's current league table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team: String,
    pub played: u32,
    pub points: u32,
    pub frames_for: u32,
    pub frames_against: u32,
}

impl Standing {
    pub fn new(team: &str, points: u32) -> Self {
        Standing {
            team: team.to_string(),
            played: 0,
            points,
            frames_for: 0,
            frames_against: 0,
        }
    }

    pub fn frame_difference(&self) -> i64 {
        self.frames_for as i64 - self.frames_against as i64
    }
}

/// Aggregated player records for one independent league.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueDataset {
    pub name: String,
    pub players: Vec<PlayerSeasonStat>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn result(home: &str, away: &str, hs: u32, a_s: u32) -> MatchResult {
        MatchResult {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            division: "Premier".into(),
            home_team: home.into(),
            away_team: away.into(),
            home_score: hs,
            away_score: a_s,
            cup: false,
        }
    }

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize_name("  Jo   SMITH "), "jo smith");
        assert!(same_name("Jo Smith", "jo\tsmith"));
        assert!(!same_name("Jo Smith", "Joe Smith"));
    }

    #[test]
    fn outcome_from_each_side() {
        let r = result("Red Lion", "Crown", 6, 4);
        assert_eq!(r.outcome_for("red lion"), Some(Outcome::Win));
        assert_eq!(r.outcome_for("Crown"), Some(Outcome::Loss));
        assert_eq!(r.outcome_for("Anchor"), None);

        let d = result("Red Lion", "Crown", 5, 5);
        assert_eq!(d.outcome_for("Crown"), Some(Outcome::Draw));
    }

    #[test]
    fn set_number_from_index() {
        assert_eq!(SetNumber::from_index(1), Some(SetNumber::One));
        assert_eq!(SetNumber::from_index(2), Some(SetNumber::Two));
        assert_eq!(SetNumber::from_index(3), None);
    }

    #[test]
    fn locked_result_matches_normalized_fixture() {
        let lock = LockedResult {
            home: "Red Lion".into(),
            away: "Crown".into(),
            home_score: 7,
            away_score: 3,
        };
        assert!(lock.matches(&Fixture {
            home: "red lion".into(),
            away: "CROWN".into()
        }));
        assert!(!lock.matches(&Fixture {
            home: "Crown".into(),
            away: "Red Lion".into()
        }));
    }
}
