// Rolling form windows, home/away splits and set performance.

use breakdish_core::config::FormConfig;
use breakdish_core::model::{Frame, MatchResult, SetNumber, Side};
use chrono::NaiveDate;
use serde::Serialize;

use crate::ratings::stats::win_pct;

// ---------------------------------------------------------------------------
// Per-player game view
// ---------------------------------------------------------------------------

/// One frame from a single player's point of view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerGame {
    pub date: NaiveDate,
    pub opponent: String,
    pub won: bool,
    pub home: bool,
    pub set: SetNumber,
    pub bd_for: bool,
    pub bd_against: bool,
}

/// A player's league frames, newest first. Forfeits and cup frames are
/// excluded; frames on the same date keep their reverse input order.
pub fn player_games(player: &str, frames: &[Frame]) -> Vec<PlayerGame> {
    let mut games: Vec<PlayerGame> = frames
        .iter()
        .filter(|f| !f.forfeit && !f.cup)
        .filter_map(|f| {
            let side = f.side_of(player)?;
            let won = f.winner == side;
            Some(PlayerGame {
                date: f.date,
                opponent: f.player(side.opposite()).to_string(),
                won,
                home: side == Side::Home,
                set: f.set,
                bd_for: won && f.break_and_dish,
                bd_against: !won && f.break_and_dish,
            })
        })
        .collect();
    games.reverse();
    games.sort_by(|a, b| b.date.cmp(&a.date));
    games
}

// ---------------------------------------------------------------------------
// Windows
// ---------------------------------------------------------------------------

/// Won/played over some set of games.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowRecord {
    pub played: u32,
    pub won: u32,
    pub pct: f64,
}

impl WindowRecord {
    pub fn from_counts(won: u32, played: u32) -> Self {
        WindowRecord {
            played,
            won,
            pct: win_pct(won, played),
        }
    }

    fn from_games<'a, I: IntoIterator<Item = &'a PlayerGame>>(games: I) -> Self {
        let (won, played) = games
            .into_iter()
            .fold((0, 0), |(w, p), g| (w + g.won as u32, p + 1));
        Self::from_counts(won, played)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Hot,
    Cold,
    Steady,
}

impl Trend {
    pub fn label(&self) -> &'static str {
        match self {
            Trend::Hot => "hot",
            Trend::Cold => "cold",
            Trend::Steady => "steady",
        }
    }
}

/// Recent form against the season baseline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSummary {
    /// Most recent `form.short_window` games (5 by default).
    pub last5: WindowRecord,
    /// Most recent `form.long_window` games (10 by default).
    pub last10: WindowRecord,
    pub season: WindowRecord,
    pub trend: Trend,
}

/// Form over games ordered newest first (see [`player_games`]).
pub fn form(games: &[PlayerGame], cfg: &FormConfig) -> FormSummary {
    let last5 = WindowRecord::from_games(games.iter().take(cfg.short_window));
    let last10 = WindowRecord::from_games(games.iter().take(cfg.long_window));
    let season = WindowRecord::from_games(games);

    let delta = last5.pct - season.pct;
    let trend = if season.played == 0 {
        Trend::Steady
    } else if delta >= cfg.trend_threshold {
        Trend::Hot
    } else if delta <= -cfg.trend_threshold {
        Trend::Cold
    } else {
        Trend::Steady
    };

    FormSummary {
        last5,
        last10,
        season,
        trend,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HomeAwaySplit {
    pub home: WindowRecord,
    pub away: WindowRecord,
}

pub fn home_away_split(games: &[PlayerGame]) -> HomeAwaySplit {
    HomeAwaySplit {
        home: WindowRecord::from_games(games.iter().filter(|g| g.home)),
        away: WindowRecord::from_games(games.iter().filter(|g| !g.home)),
    }
}

// ---------------------------------------------------------------------------
// Team views
// ---------------------------------------------------------------------------

/// A team's frame win rate in each set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetPerformance {
    pub set1: WindowRecord,
    pub set2: WindowRecord,
    /// `set1.pct - set2.pct`, in percentage points.
    pub bias: f64,
}

impl SetPerformance {
    /// True when neither set is meaningfully stronger.
    pub fn is_even(&self, threshold: f64) -> bool {
        self.bias.abs() < threshold
    }
}

pub fn set_performance(team: &str, frames: &[Frame]) -> SetPerformance {
    let mut counts = [(0u32, 0u32); 2];
    for f in frames.iter().filter(|f| !f.forfeit && !f.cup) {
        let Some(side) = f.team_side(team) else {
            continue;
        };
        let slot = match f.set {
            SetNumber::One => &mut counts[0],
            SetNumber::Two => &mut counts[1],
        };
        slot.1 += 1;
        if f.winner == side {
            slot.0 += 1;
        }
    }
    let set1 = WindowRecord::from_counts(counts[0].0, counts[0].1);
    let set2 = WindowRecord::from_counts(counts[1].0, counts[1].1);
    SetPerformance {
        set1,
        set2,
        bias: set1.pct - set2.pct,
    }
}

/// The team's last `n` results as a W/D/L string, newest first.
pub fn team_results_form(team: &str, results: &[MatchResult], n: usize) -> String {
    let mut played: Vec<&MatchResult> = results.iter().filter(|r| r.involves(team)).collect();
    played.reverse();
    played.sort_by(|a, b| b.date.cmp(&a.date));
    played
        .iter()
        .filter_map(|r| r.outcome_for(team))
        .take(n)
        .map(|o| o.letter())
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
