// Match outcome probabilities from team strengths.
//
// Binomial frame model: every frame of the match is won by the home side
// with the same probability `p`, derived from the two strengths on the
// log-odds scale plus a home advantage. The scoreline distribution is then
// Binomial(frames_per_match, p), which gives win/draw/loss and the most
// likely scores directly.

use std::collections::BTreeMap;

use breakdish_core::config::{EngineConfig, PredictionConfig, RatingsConfig};
use breakdish_core::model::{
    find_roster, normalize_name, same_name, PlayerSeasonStat, RosterEntry, SquadOverride,
    SquadOverrides, TeamRoster,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::ratings::stats::adjusted_rate;

/// Strengths are kept away from 0 and 1 so the log-odds stay finite.
const STRENGTH_FLOOR: f64 = 0.01;
const STRENGTH_CEIL: f64 = 0.99;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreProbability {
    pub home: u32,
    pub away: u32,
    /// Percent.
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub p_home_win: f64,
    pub p_draw: f64,
    pub p_away_win: f64,
    pub expected_home: f64,
    pub expected_away: f64,
    /// Most probable final scores, most likely first.
    pub top_scores: Vec<ScoreProbability>,
    /// The unmodified prediction when a squad override was applied.
    pub baseline: Option<Box<PredictionResult>>,
}

/// Strength deltas to apply on top of the base strengths.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StrengthAdjustment {
    pub home_delta: f64,
    pub away_delta: f64,
}

// ---------------------------------------------------------------------------
// Frame model
// ---------------------------------------------------------------------------

fn clamp_strength(s: f64) -> f64 {
    if s.is_finite() {
        s.clamp(STRENGTH_FLOOR, STRENGTH_CEIL)
    } else {
        0.5
    }
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Probability the home player wins a single frame.
pub fn frame_win_probability(home_strength: f64, away_strength: f64, home_advantage: f64) -> f64 {
    let h = clamp_strength(home_strength);
    let a = clamp_strength(away_strength);
    let x = logit(h) - logit(a) + home_advantage;
    1.0 / (1.0 + (-x).exp())
}

/// `e * ln_x`, with a zero exponent contributing nothing even when `x` is 0.
fn ln_pow(ln_x: f64, e: u32) -> f64 {
    if e == 0 {
        0.0
    } else {
        e as f64 * ln_x
    }
}

/// Binomial(n, p) probabilities for k = 0..=n home frames.
///
/// Works in log space so long matches neither overflow the coefficient nor
/// underflow the powers.
fn scoreline_pmf(n: u32, p: f64) -> Vec<f64> {
    let (ln_p, ln_q) = (p.ln(), (1.0 - p).ln());
    let mut out = Vec::with_capacity(n as usize + 1);
    let mut ln_coeff = 0.0_f64;
    for k in 0..=n {
        if k > 0 {
            ln_coeff += ((n - k + 1) as f64).ln() - (k as f64).ln();
        }
        out.push((ln_coeff + ln_pow(ln_p, k) + ln_pow(ln_q, n - k)).exp());
    }
    out
}

/// Win/draw/loss fractions (0-1) for a single fixture.
pub(crate) fn outcome_probabilities(
    home_strength: f64,
    away_strength: f64,
    cfg: &PredictionConfig,
) -> (f64, f64, f64) {
    let n = cfg.frames_per_match;
    let p = frame_win_probability(home_strength, away_strength, cfg.home_advantage);
    let (mut home, mut draw, mut away) = (0.0, 0.0, 0.0);
    for (k, prob) in scoreline_pmf(n, p).into_iter().enumerate() {
        let h = k as u32;
        let a = n - h;
        if h > a {
            home += prob;
        } else if h < a {
            away += prob;
        } else {
            draw += prob;
        }
    }
    let sum = home + draw + away;
    if sum > 0.0 {
        (home / sum, draw / sum, away / sum)
    } else {
        (1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0)
    }
}

fn predict_unadjusted(home_strength: f64, away_strength: f64, cfg: &PredictionConfig) -> PredictionResult {
    let n = cfg.frames_per_match;
    let p = frame_win_probability(home_strength, away_strength, cfg.home_advantage);
    let (home, _, away) = outcome_probabilities(home_strength, away_strength, cfg);

    let p_home_win = home * 100.0;
    let p_away_win = away * 100.0;
    // Rounding residue lands in the draw, never below zero.
    let p_draw = (100.0 - p_home_win - p_away_win).max(0.0);

    let mut scores: Vec<ScoreProbability> = scoreline_pmf(n, p)
        .into_iter()
        .enumerate()
        .map(|(k, prob)| ScoreProbability {
            home: k as u32,
            away: n - k as u32,
            probability: prob * 100.0,
        })
        .collect();
    scores.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.home.cmp(&a.home))
    });
    scores.truncate(cfg.top_scores);

    PredictionResult {
        p_home_win,
        p_draw,
        p_away_win,
        expected_home: n as f64 * p,
        expected_away: n as f64 * (1.0 - p),
        top_scores: scores,
        baseline: None,
    }
}

/// Predict a match between two strengths (0-1 adjusted win rates).
///
/// With an adjustment the returned prediction uses the shifted strengths and
/// carries the unshifted one in `baseline`.
pub fn predict(
    home_strength: f64,
    away_strength: f64,
    adjustment: Option<StrengthAdjustment>,
    cfg: &PredictionConfig,
) -> PredictionResult {
    let base = predict_unadjusted(home_strength, away_strength, cfg);
    let Some(adj) = adjustment else {
        return base;
    };
    let mut adjusted = predict_unadjusted(
        clamp_strength(home_strength + adj.home_delta),
        clamp_strength(away_strength + adj.away_delta),
        cfg,
    );
    adjusted.baseline = Some(Box::new(base));
    adjusted
}

// ---------------------------------------------------------------------------
// Team strength and squad overrides
// ---------------------------------------------------------------------------

/// Roster-weighted mean of adjusted win rates (0-1). Each player weighs
/// `played + 1`, so regulars dominate without silencing newcomers.
/// An empty roster sits at the prior mean.
pub fn team_strength(roster: &TeamRoster, cfg: &RatingsConfig) -> f64 {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for p in &roster.players {
        let played = p.stat.as_ref().map_or(0, |s| s.played);
        let w = played as f64 + 1.0;
        weighted += w * adjusted_rate(p.stat.as_ref(), p.prior_rating, cfg);
        weight_sum += w;
    }
    if weight_sum <= 0.0 {
        return cfg.prior_mean;
    }
    weighted / weight_sum
}

/// Shadow `roster` with an override. The input roster is left untouched.
///
/// Added players are looked up in `player_pool` (keyed by normalized name);
/// unknown additions join without a record.
pub fn apply_override(
    roster: &TeamRoster,
    squad_override: &SquadOverride,
    player_pool: &BTreeMap<String, PlayerSeasonStat>,
) -> TeamRoster {
    let mut players: Vec<RosterEntry> = Vec::with_capacity(roster.players.len());
    for p in &roster.players {
        if squad_override.removed.iter().any(|r| same_name(r, &p.name)) {
            continue;
        }
        players.push(p.clone());
    }
    for r in &squad_override.removed {
        if !roster.contains(r) {
            warn!("override removes '{}' who is not on {}'s roster", r, roster.team);
        }
    }
    for name in &squad_override.added {
        if players.iter().any(|p| same_name(&p.name, name)) {
            continue;
        }
        let stat = player_pool.get(&normalize_name(name)).cloned();
        players.push(RosterEntry::new(name, stat));
    }
    TeamRoster {
        team: roster.team.clone(),
        players,
    }
}

/// Share of `others` strictly weaker than `value`, 0-1.
fn percentile_rank(value: f64, others: &[f64]) -> f64 {
    if others.is_empty() {
        return 0.0;
    }
    others.iter().filter(|o| **o < value).count() as f64 / others.len() as f64
}

/// Net strength change each override would cause, keyed by roster team name.
///
/// The raw delta (overridden minus actual strength) is scaled by
/// `1 + |shift|`, where `shift` is how far the change moves the team's
/// percentile rank among the `top_n` strongest teams.
pub fn calc_strength_adjustments(
    rosters: &[TeamRoster],
    overrides: &SquadOverrides,
    player_pool: &BTreeMap<String, PlayerSeasonStat>,
    top_n: usize,
    cfg: &RatingsConfig,
) -> Result<BTreeMap<String, f64>, EngineError> {
    let mut base: Vec<(String, f64)> = rosters
        .iter()
        .map(|r| (normalize_name(&r.team), team_strength(r, cfg)))
        .collect();
    base.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let top: Vec<(String, f64)> = base.iter().take(top_n.max(1)).cloned().collect();

    let mut out = BTreeMap::new();
    for (team, squad_override) in overrides {
        let roster = find_roster(rosters, team).ok_or_else(|| EngineError::UnknownTeam(team.clone()))?;
        let key = normalize_name(&roster.team);
        let before = team_strength(roster, cfg);
        let after = team_strength(&apply_override(roster, squad_override, player_pool), cfg);
        let raw = after - before;

        let others: Vec<f64> = top.iter().filter(|(t, _)| *t != key).map(|(_, s)| *s).collect();
        let shift = percentile_rank(after, &others) - percentile_rank(before, &others);
        let delta = raw * (1.0 + shift.abs());

        debug!(
            "override for {}: strength {:.3} -> {:.3}, percentile shift {:.2}, delta {:.4}",
            roster.team, before, after, shift, delta
        );
        out.insert(roster.team.clone(), delta);
    }
    Ok(out)
}

/// Predict a fixture between two teams in the division, applying any squad
/// overrides for either side. Every override must name a known team.
pub fn predict_fixture(
    home: &str,
    away: &str,
    rosters: &[TeamRoster],
    overrides: &SquadOverrides,
    player_pool: &BTreeMap<String, PlayerSeasonStat>,
    cfg: &EngineConfig,
) -> Result<PredictionResult, EngineError> {
    let home_roster = find_roster(rosters, home).ok_or_else(|| EngineError::UnknownTeam(home.into()))?;
    let away_roster = find_roster(rosters, away).ok_or_else(|| EngineError::UnknownTeam(away.into()))?;

    let home_strength = team_strength(home_roster, &cfg.ratings);
    let away_strength = team_strength(away_roster, &cfg.ratings);

    let active: SquadOverrides = overrides
        .iter()
        .filter(|(_, o)| !o.is_empty())
        .map(|(t, o)| (t.clone(), o.clone()))
        .collect();
    let deltas = calc_strength_adjustments(
        rosters,
        &active,
        player_pool,
        cfg.prediction.override_top_n,
        &cfg.ratings,
    )?;

    let adjustment = if deltas.contains_key(&home_roster.team) || deltas.contains_key(&away_roster.team) {
        Some(StrengthAdjustment {
            home_delta: deltas.get(&home_roster.team).copied().unwrap_or(0.0),
            away_delta: deltas.get(&away_roster.team).copied().unwrap_or(0.0),
        })
    } else {
        None
    };

    Ok(predict(home_strength, away_strength, adjustment, &cfg.prediction))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
