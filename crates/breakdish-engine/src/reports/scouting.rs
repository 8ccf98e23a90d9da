// Opponent scouting report.
//
// Pulls team form, venue record, set bias, break-and-dish balance and
// forfeit rate together with a roster ranking into one summary.

use breakdish_core::config::EngineConfig;
use breakdish_core::model::{same_name, Frame, MatchResult, Outcome, PlayerSeasonStat};
use serde::Serialize;
use tracing::debug;

use crate::ratings::form::{set_performance, team_results_form, SetPerformance, WindowRecord};
use crate::ratings::stats::{rank_players, RankedPlayer};

/// Results considered for the recent form string.
const RECENT_RESULTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoutingReport {
    pub team: String,
    pub matches_played: usize,
    /// W/D/L over the last five results, newest first.
    pub recent_form: String,
    /// Match wins at home (draws are not wins).
    pub home: WindowRecord,
    pub away: WindowRecord,
    pub set_performance: SetPerformance,
    pub set_even: bool,
    pub bd_for: u32,
    pub bd_against: u32,
    pub bd_net: i64,
    /// Percentage of the team's frames it forfeited.
    pub forfeit_rate: f64,
    pub strongest_players: Vec<RankedPlayer>,
    pub weakest_players: Vec<RankedPlayer>,
}

/// Build a scouting report for `opponent`. League frames and results only.
///
/// A team with no data gets a report of zeroed records and empty lists.
pub fn build_report(
    opponent: &str,
    frames: &[Frame],
    results: &[MatchResult],
    season_stats: &[PlayerSeasonStat],
    cfg: &EngineConfig,
) -> ScoutingReport {
    let league_results: Vec<MatchResult> = results.iter().filter(|r| !r.cup).cloned().collect();
    let league_frames: Vec<Frame> = frames.iter().filter(|f| !f.cup).cloned().collect();

    // Venue record from match results.
    let (mut home_w, mut home_p, mut away_w, mut away_p) = (0, 0, 0, 0);
    for r in league_results.iter().filter(|r| r.involves(opponent)) {
        let won = r.outcome_for(opponent) == Some(Outcome::Win);
        if same_name(&r.home_team, opponent) {
            home_p += 1;
            home_w += won as u32;
        } else {
            away_p += 1;
            away_w += won as u32;
        }
    }

    // Frame-level balance.
    let (mut bd_for, mut bd_against, mut forfeited, mut team_frames) = (0u32, 0u32, 0u32, 0u32);
    for f in &league_frames {
        let Some(side) = f.team_side(opponent) else {
            continue;
        };
        team_frames += 1;
        let won = f.winner == side;
        if f.forfeit {
            if !won {
                forfeited += 1;
            }
            continue;
        }
        if f.break_and_dish {
            if won {
                bd_for += 1;
            } else {
                bd_against += 1;
            }
        }
    }
    let forfeit_rate = if team_frames == 0 {
        0.0
    } else {
        forfeited as f64 * 100.0 / team_frames as f64
    };

    // Roster ranking: strongest from the top, weakest from what is left.
    let squad: Vec<&PlayerSeasonStat> = season_stats
        .iter()
        .filter(|s| s.played > 0 && !s.cup)
        .filter(|s| s.team.as_deref().is_some_and(|t| same_name(t, opponent)))
        .collect();
    let ranked = rank_players(squad, &cfg.ratings);
    let top_n = cfg.scouting.top_n;
    let strongest: Vec<RankedPlayer> = ranked.iter().take(top_n).cloned().collect();
    let weakest: Vec<RankedPlayer> = ranked
        .iter()
        .skip(strongest.len())
        .rev()
        .take(top_n)
        .cloned()
        .collect();

    let set_perf = set_performance(opponent, &league_frames);
    let matches_played = home_p as usize + away_p as usize;
    debug!(
        "scouting {}: {} matches, {} frames, {} ranked players",
        opponent,
        matches_played,
        team_frames,
        ranked.len()
    );

    ScoutingReport {
        team: opponent.to_string(),
        matches_played,
        recent_form: team_results_form(opponent, &league_results, RECENT_RESULTS),
        home: WindowRecord::from_counts(home_w, home_p),
        away: WindowRecord::from_counts(away_w, away_p),
        set_even: set_perf.is_even(cfg.form.even_bias),
        set_performance: set_perf,
        bd_for,
        bd_against,
        bd_net: bd_for as i64 - bd_against as i64,
        forfeit_rate,
        strongest_players: strongest,
        weakest_players: weakest,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
