// Counting stats and Bayesian-adjusted win rates.
//
// Everything here is a pure fold over frames. Percentages are 0-100; the
// shrinkage estimator works in 0-1 rates.

use std::collections::BTreeMap;

use breakdish_core::config::RatingsConfig;
use breakdish_core::model::{normalize_name, Frame, PlayerSeasonStat, Side};
use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

// ---------------------------------------------------------------------------
// Percentages and shrinkage
// ---------------------------------------------------------------------------

/// Win percentage (0-100), or 0 when nothing was played.
pub fn win_pct(won: u32, played: u32) -> f64 {
    if played == 0 {
        return 0.0;
    }
    won as f64 * 100.0 / played as f64
}

/// Shrink a raw win rate toward `prior_mean` with `prior_weight` pseudo-frames:
/// `(wins + prior_mean * K) / (played + K)`.
///
/// Returns exactly `prior_mean` when nothing has been played and converges to
/// `wins / played` as `played` grows.
pub fn bayesian_adjust(wins: u32, played: u32, prior_mean: f64, prior_weight: f64) -> f64 {
    if played == 0 {
        return prior_mean;
    }
    let k = prior_weight.max(0.0);
    (wins as f64 + prior_mean * k) / (played as f64 + k)
}

/// Adjusted win rate (0-1) for a player who may have no record this season.
///
/// A prior-season rating, when present, replaces the league-wide prior mean.
pub fn adjusted_rate(
    stat: Option<&PlayerSeasonStat>,
    prior_rating: Option<f64>,
    cfg: &RatingsConfig,
) -> f64 {
    let prior = prior_rating
        .filter(|r| r.is_finite())
        .map(|r| r.clamp(0.0, 1.0))
        .unwrap_or(cfg.prior_mean);
    match stat {
        Some(s) => bayesian_adjust(s.won, s.played, prior, cfg.prior_weight),
        None => prior,
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Per-frame break-and-dish rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakAndDishRates {
    pub bd_f_rate: f64,
    pub bd_a_rate: f64,
}

pub fn break_and_dish_rates(stat: &PlayerSeasonStat) -> BreakAndDishRates {
    if stat.played == 0 {
        return BreakAndDishRates {
            bd_f_rate: 0.0,
            bd_a_rate: 0.0,
        };
    }
    let p = stat.played as f64;
    BreakAndDishRates {
        bd_f_rate: stat.bd_for as f64 / p,
        bd_a_rate: stat.bd_against as f64 / p,
    }
}

/// Fold one frame into a player's running record. `latest` tracks the date
/// the current team was seen so the most recent team wins.
fn apply_frame(
    stat: &mut PlayerSeasonStat,
    latest: &mut Option<NaiveDate>,
    frame: &Frame,
    side: Side,
) {
    if latest.map_or(true, |d| frame.date >= d) {
        *latest = Some(frame.date);
        stat.team = Some(frame.team(side).to_string());
    }
    if frame.cup {
        stat.cup = true;
    }

    let won = frame.winner == side;
    if frame.forfeit {
        if !won {
            stat.forfeits += 1;
        }
        return;
    }

    stat.played += 1;
    if won {
        stat.won += 1;
        if frame.break_and_dish {
            stat.bd_for += 1;
        }
    } else if frame.break_and_dish {
        stat.bd_against += 1;
    }
}

/// Aggregate one player's record from a set of frames.
///
/// Forfeited frames count against the player who forfeited and never toward
/// played/won. Cup frames are skipped unless `include_cup`.
pub fn aggregate(player: &str, frames: &[Frame], include_cup: bool) -> PlayerSeasonStat {
    let mut stat = PlayerSeasonStat::empty(player);
    let mut latest = None;
    for frame in frames {
        if frame.cup && !include_cup {
            continue;
        }
        let Some(side) = frame.side_of(player) else {
            continue;
        };
        apply_frame(&mut stat, &mut latest, frame, side);
    }
    stat.pct = win_pct(stat.won, stat.played);
    stat
}

/// Aggregate every player appearing in `frames`, keyed by normalized name.
pub fn aggregate_all(frames: &[Frame], include_cup: bool) -> BTreeMap<String, PlayerSeasonStat> {
    let mut out: BTreeMap<String, (PlayerSeasonStat, Option<NaiveDate>)> = BTreeMap::new();
    for frame in frames {
        if frame.cup && !include_cup {
            continue;
        }
        for side in [Side::Home, Side::Away] {
            let name = frame.player(side).trim();
            if name.is_empty() {
                continue;
            }
            let (stat, latest) = out
                .entry(normalize_name(name))
                .or_insert_with(|| (PlayerSeasonStat::empty(name), None));
            apply_frame(stat, latest, frame, side);
        }
    }

    debug!(
        "aggregated {} frames into {} player records",
        frames.len(),
        out.len()
    );

    out.into_iter()
        .map(|(key, (mut stat, _))| {
            stat.pct = win_pct(stat.won, stat.played);
            (key, stat)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// A player ordered by Bayesian-adjusted win percentage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub player: String,
    pub team: Option<String>,
    pub played: u32,
    pub raw_pct: f64,
    /// Adjusted win percentage, 0-100.
    pub adjusted_pct: f64,
}

/// Rank players by adjusted win percentage, best first. Ties fall back to
/// name order so the output is stable.
pub fn rank_players<'a, I>(stats: I, cfg: &RatingsConfig) -> Vec<RankedPlayer>
where
    I: IntoIterator<Item = &'a PlayerSeasonStat>,
{
    let mut ranked: Vec<RankedPlayer> = stats
        .into_iter()
        .map(|s| RankedPlayer {
            player: s.player.clone(),
            team: s.team.clone(),
            played: s.played,
            raw_pct: s.pct,
            adjusted_pct: adjusted_rate(Some(s), None, cfg) * 100.0,
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.adjusted_pct
            .partial_cmp(&a.adjusted_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| normalize_name(&a.player).cmp(&normalize_name(&b.player)))
    });
    ranked
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{approx_eq, frame, FrameBuilder};

    #[test]
    fn bayesian_adjust_zero_played_is_prior() {
        assert_eq!(bayesian_adjust(0, 0, 0.5, 7.0), 0.5);
        assert_eq!(bayesian_adjust(0, 0, 0.37, 7.0), 0.37);
        assert_eq!(bayesian_adjust(0, 0, 0.61, 0.0), 0.61);
    }

    #[test]
    fn bayesian_adjust_shrinks_small_samples() {
        // 3 from 3 with K = 7: (3 + 3.5) / 10
        assert!(approx_eq(bayesian_adjust(3, 3, 0.5, 7.0), 0.65, 1e-12));
        // 0 from 3 pulled up toward the prior.
        assert!(approx_eq(bayesian_adjust(0, 3, 0.5, 7.0), 0.35, 1e-12));
    }

    #[test]
    fn bayesian_adjust_converges_to_raw() {
        let adj = bayesian_adjust(600_000, 1_000_000, 0.5, 7.0);
        assert!(approx_eq(adj, 0.6, 1e-5));
    }

    #[test]
    fn adjusted_rate_prefers_prior_rating() {
        let cfg = RatingsConfig::default();
        assert!(approx_eq(adjusted_rate(None, Some(0.7), &cfg), 0.7, 1e-12));
        assert!(approx_eq(adjusted_rate(None, None, &cfg), 0.5, 1e-12));
    }

    #[test]
    fn aggregate_counts_wins_and_break_and_dish() {
        let frames = vec![
            frame(FrameBuilder::new("Ann", "Bob").home_wins().bd()),
            frame(FrameBuilder::new("Ann", "Cal").away_wins()),
            frame(FrameBuilder::new("Dee", "Ann").away_wins()),
            frame(FrameBuilder::new("Dee", "Ann").home_wins().bd()),
        ];
        let stat = aggregate("ann", &frames, false);
        assert_eq!(stat.played, 4);
        assert_eq!(stat.won, 2);
        assert!(approx_eq(stat.pct, 50.0, 1e-12));
        assert_eq!(stat.bd_for, 1);
        assert_eq!(stat.bd_against, 1);
    }

    #[test]
    fn aggregate_empty_is_zeroed() {
        let stat = aggregate("nobody", &[], false);
        assert_eq!(stat.played, 0);
        assert_eq!(stat.pct, 0.0);
        assert!(!stat.pct.is_nan());
        let rates = break_and_dish_rates(&stat);
        assert_eq!(rates.bd_f_rate, 0.0);
        assert_eq!(rates.bd_a_rate, 0.0);
    }

    #[test]
    fn forfeits_are_not_played() {
        let frames = vec![
            frame(FrameBuilder::new("Ann", "Bob").away_wins().forfeit()),
            frame(FrameBuilder::new("Ann", "Bob").home_wins()),
        ];
        let ann = aggregate("Ann", &frames, false);
        assert_eq!(ann.played, 1);
        assert_eq!(ann.forfeits, 1);
        let bob = aggregate("Bob", &frames, false);
        assert_eq!(bob.played, 1);
        assert_eq!(bob.won, 0);
        assert_eq!(bob.forfeits, 0);
    }

    #[test]
    fn cup_frames_only_when_requested() {
        let frames = vec![
            frame(FrameBuilder::new("Ann", "Bob").home_wins().cup()),
            frame(FrameBuilder::new("Ann", "Bob").away_wins()),
        ];
        let league = aggregate("Ann", &frames, false);
        assert_eq!(league.played, 1);
        assert!(!league.cup);
        let all = aggregate("Ann", &frames, true);
        assert_eq!(all.played, 2);
        assert!(all.cup);
    }

    #[test]
    fn aggregate_all_matches_single_aggregate() {
        let frames = vec![
            frame(FrameBuilder::new("Ann", "Bob").home_wins().bd()),
            frame(FrameBuilder::new("Cal", "Ann").home_wins()),
            frame(FrameBuilder::new("Bob", "Cal").away_wins()),
        ];
        let all = aggregate_all(&frames, false);
        assert_eq!(all.len(), 3);
        for name in ["Ann", "Bob", "Cal"] {
            assert_eq!(all[&normalize_name(name)], aggregate(name, &frames, false));
        }
        // Idempotent over the same input.
        assert_eq!(all, aggregate_all(&frames, false));
    }

    #[test]
    fn team_is_most_recent() {
        let frames = vec![
            frame(FrameBuilder::new("Ann", "Bob").teams("Crown", "Anchor").day(1)),
            frame(FrameBuilder::new("Ann", "Bob").teams("Red Lion", "Anchor").day(9)),
        ];
        let stat = aggregate("Ann", &frames, false);
        assert_eq!(stat.team.as_deref(), Some("Red Lion"));
    }

    #[test]
    fn rank_players_orders_by_adjusted() {
        let cfg = RatingsConfig::default();
        let mut lucky = PlayerSeasonStat::empty("Lucky");
        lucky.played = 1;
        lucky.won = 1;
        lucky.pct = 100.0;
        let mut solid = PlayerSeasonStat::empty("Solid");
        solid.played = 40;
        solid.won = 28;
        solid.pct = 70.0;

        let ranked = rank_players([&lucky, &solid], &cfg);
        // 28/40 shrinks less than 1/1.
        assert_eq!(ranked[0].player, "Solid");
        assert!(ranked[0].adjusted_pct > ranked[1].adjusted_pct);
    }
}
