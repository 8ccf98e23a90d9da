// Lineup suggestions for an upcoming match.
//
// Each roster player gets a composite score from adjusted win rate, recent
// form (blended with the venue split when there is enough of it) and net
// head-to-head against the opponent roster. Players are then dealt greedily
// into Set 1 and Set 2.

use std::collections::{HashMap, HashSet};

use breakdish_core::config::EngineConfig;
use breakdish_core::model::{find_roster, normalize_name, Frame, PlayerSeasonStat, TeamRoster};
use serde::Serialize;
use tracing::debug;

use crate::ratings::form::{form, home_away_split, player_games, Trend};
use crate::ratings::h2h::advantage_against;
use crate::ratings::stats::adjusted_rate;

/// Net head-to-head at which an insight is worth surfacing.
const H2H_NOTE_THRESHOLD: i64 = 2;

/// One scored player in a suggested set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupPick {
    pub player: String,
    pub score: f64,
    pub adj_pct: f64,
    pub form_pct: f64,
    pub h2h_advantage: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineupSuggestion {
    pub set1: Vec<LineupPick>,
    pub set2: Vec<LineupPick>,
    /// Advisory notes. Never used in scoring.
    pub insights: Vec<String>,
}

/// Suggest who should play in each set for `team` against `opponent`.
///
/// No player appears in both sets. With fewer players than slots, Set 2 is
/// filled with whoever is left.
pub fn suggest_lineup(
    team: &str,
    opponent: &str,
    is_home: bool,
    frames: &[Frame],
    season_stats: &[PlayerSeasonStat],
    rosters: &[TeamRoster],
    cfg: &EngineConfig,
) -> LineupSuggestion {
    let mut insights = Vec::new();

    let Some(roster) = find_roster(rosters, team) else {
        insights.push(format!("No roster for {team}"));
        return LineupSuggestion {
            set1: Vec::new(),
            set2: Vec::new(),
            insights,
        };
    };

    let opponent_roster = find_roster(rosters, opponent);
    if opponent_roster.is_none() {
        insights.push(format!("No roster for {opponent}; head-to-head ignored"));
    }
    let opponent_active = frames
        .iter()
        .any(|f| !f.cup && !f.forfeit && f.team_side(opponent).is_some());
    if !opponent_active {
        insights.push("Opponent has no recent form data".to_string());
    }

    let stats_by_name: HashMap<String, &PlayerSeasonStat> = season_stats
        .iter()
        .map(|s| (normalize_name(&s.player), s))
        .collect();

    let l = &cfg.lineup;
    let mut picks: Vec<LineupPick> = Vec::with_capacity(roster.players.len());
    let mut seen: HashSet<String> = HashSet::new();
    for entry in &roster.players {
        if !seen.insert(normalize_name(&entry.name)) {
            debug!("{} listed twice on {}'s roster; keeping the first entry", entry.name, roster.team);
            continue;
        }
        let stat = entry
            .stat
            .as_ref()
            .or_else(|| stats_by_name.get(&normalize_name(&entry.name)).copied());
        let adj_pct = adjusted_rate(stat, entry.prior_rating, &cfg.ratings) * 100.0;

        let games = player_games(&entry.name, frames);
        let form_pct = if games.is_empty() {
            insights.push(format!("No data for {}", entry.name));
            adj_pct
        } else {
            let summary = form(&games, &cfg.form);
            match summary.trend {
                Trend::Hot => insights.push(format!(
                    "{} is in hot form ({:.0}% over last {})",
                    entry.name, summary.last5.pct, summary.last5.played
                )),
                Trend::Cold => insights.push(format!(
                    "{} is in cold form ({:.0}% over last {})",
                    entry.name, summary.last5.pct, summary.last5.played
                )),
                Trend::Steady => {}
            }
            let split = home_away_split(&games);
            let venue = if is_home { split.home } else { split.away };
            if venue.played >= l.min_venue_games {
                (summary.last5.pct + venue.pct) / 2.0
            } else {
                summary.last5.pct
            }
        };

        let h2h_advantage = opponent_roster
            .map(|opp| advantage_against(&entry.name, opp, frames))
            .unwrap_or(0);
        if h2h_advantage >= H2H_NOTE_THRESHOLD {
            insights.push(format!(
                "{} leads the head-to-head against {} (+{})",
                entry.name, opponent, h2h_advantage
            ));
        } else if h2h_advantage <= -H2H_NOTE_THRESHOLD {
            insights.push(format!(
                "{} trails the head-to-head against {} ({})",
                entry.name, opponent, h2h_advantage
            ));
        }

        let score =
            l.adj_weight * adj_pct + l.form_weight * form_pct + l.h2h_weight * h2h_advantage as f64;
        picks.push(LineupPick {
            player: entry.name.clone(),
            score,
            adj_pct,
            form_pct,
            h2h_advantage,
        });
    }

    picks.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| normalize_name(&a.player).cmp(&normalize_name(&b.player)))
    });

    let slots = l.slots_per_set;
    let mut remaining = picks.into_iter();
    let set1: Vec<LineupPick> = remaining.by_ref().take(slots).collect();
    let set2: Vec<LineupPick> = remaining.take(slots).collect();

    debug!(
        "lineup for {} v {}: set1={}, set2={}, {} insights",
        team,
        opponent,
        set1.len(),
        set2.len(),
        insights.len()
    );

    LineupSuggestion {
        set1,
        set2,
        insights,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
