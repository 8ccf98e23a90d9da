// Cross-league strength normalization.
//
// Players who turn out in more than one league ("bridges") tie the leagues
// together: the ratio of a bridge's adjusted win rate in one league to the
// other says how much harder the second league is. Median ratios per league
// pair are chained outward from a reference league to give every reachable
// league a multiplier.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use breakdish_core::config::EngineConfig;
use breakdish_core::model::{normalize_name, same_name, LeagueDataset};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ratings::stats::bayesian_adjust;

// ---------------------------------------------------------------------------
// Bridge players
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeagueAppearance {
    pub league: String,
    pub played: u32,
    pub won: u32,
}

/// A player with a qualifying record in at least two leagues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BridgePlayer {
    pub name: String,
    /// One entry per league, in league-name order.
    pub appearances: Vec<LeagueAppearance>,
}

impl BridgePlayer {
    fn appearance(&self, league: &str) -> Option<&LeagueAppearance> {
        self.appearances.iter().find(|a| same_name(&a.league, league))
    }
}

/// Find every player who has played at least `min_games` frames in two or
/// more leagues. Names are matched after normalization; several rows for the
/// same player within one league are summed.
pub fn find_all_bridge_players(leagues: &[LeagueDataset], min_games: u32) -> Vec<BridgePlayer> {
    // normalized player -> (display name, league -> (played, won))
    let mut seen: BTreeMap<String, (String, BTreeMap<String, (u32, u32)>)> = BTreeMap::new();
    for league in leagues {
        for stat in league.players.iter().filter(|s| !s.cup) {
            let (_, per_league) = seen
                .entry(normalize_name(&stat.player))
                .or_insert_with(|| (stat.player.clone(), BTreeMap::new()));
            let counts = per_league.entry(league.name.clone()).or_insert((0, 0));
            counts.0 += stat.played;
            counts.1 += stat.won;
        }
    }

    let bridges: Vec<BridgePlayer> = seen
        .into_values()
        .filter_map(|(name, per_league)| {
            let appearances: Vec<LeagueAppearance> = per_league
                .into_iter()
                .filter(|(_, (played, _))| *played >= min_games)
                .map(|(league, (played, won))| LeagueAppearance { league, played, won })
                .collect();
            (appearances.len() >= 2).then_some(BridgePlayer { name, appearances })
        })
        .collect();

    debug!(
        "{} bridge players across {} leagues (min {} games)",
        bridges.len(),
        leagues.len(),
        min_games
    );
    bridges
}

// ---------------------------------------------------------------------------
// League multipliers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueStrength {
    pub league: String,
    /// Scale applied to win rates earned in this league. The reference
    /// league is 1.0; harder leagues are above it.
    pub multiplier: f64,
    /// Bridge players with a qualifying record in this league.
    pub bridge_players: usize,
    /// False when no chain of usable pairs reaches the reference league.
    pub anchored: bool,
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Compute a multiplier for each league from the bridge players.
///
/// For every league pair with at least `min_bridge_players` bridges the
/// median of `adj(x) / adj(y)` gives `m(y) = m(x) * ratio`. Multipliers are
/// resolved breadth-first from the reference league: the configured one if
/// it exists, otherwise the league with the most bridges (ties by name).
/// Leagues that cannot be reached keep 1.0 and are marked unanchored.
pub fn calculate_league_strengths(
    leagues: &[LeagueDataset],
    bridges: &[BridgePlayer],
    cfg: &EngineConfig,
) -> Vec<LeagueStrength> {
    let names: Vec<String> = leagues.iter().map(|l| l.name.clone()).collect();
    if names.is_empty() {
        return Vec::new();
    }
    let r = &cfg.ratings;

    let bridge_counts: Vec<usize> = names
        .iter()
        .map(|n| bridges.iter().filter(|b| b.appearance(n).is_some()).count())
        .collect();

    // Directed edges x -> y carrying median(adj_x / adj_y).
    let mut edges: BTreeMap<usize, Vec<(usize, f64)>> = BTreeMap::new();
    for x in 0..names.len() {
        for y in (x + 1)..names.len() {
            let mut ratios: Vec<f64> = bridges
                .iter()
                .filter_map(|b| {
                    let ax = b.appearance(&names[x])?;
                    let ay = b.appearance(&names[y])?;
                    let adj_x = bayesian_adjust(ax.won, ax.played, r.prior_mean, r.prior_weight);
                    let adj_y = bayesian_adjust(ay.won, ay.played, r.prior_mean, r.prior_weight);
                    let ratio = adj_x / adj_y;
                    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
                })
                .collect();
            if ratios.len() < cfg.cross_league.min_bridge_players.max(1) {
                if !ratios.is_empty() {
                    debug!(
                        "{} / {}: only {} bridge players, pair ignored",
                        names[x],
                        names[y],
                        ratios.len()
                    );
                }
                continue;
            }
            if let Some(ratio) = median(&mut ratios) {
                edges.entry(x).or_default().push((y, ratio));
                edges.entry(y).or_default().push((x, 1.0 / ratio));
            }
        }
    }

    let configured = cfg
        .cross_league
        .reference_league
        .as_deref()
        .and_then(|want| {
            let found = names.iter().position(|n| same_name(n, want));
            if found.is_none() {
                warn!("reference league {} not loaded; choosing one from the data", want);
            }
            found
        });
    let reference = configured.unwrap_or_else(|| {
        let order: BTreeSet<(std::cmp::Reverse<usize>, String, usize)> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (std::cmp::Reverse(bridge_counts[i]), normalize_name(n), i))
            .collect();
        order.iter().next().map(|(_, _, i)| *i).unwrap_or(0)
    });

    let mut multipliers: Vec<Option<f64>> = vec![None; names.len()];
    multipliers[reference] = Some(1.0);
    let mut queue = VecDeque::from([reference]);
    while let Some(x) = queue.pop_front() {
        let mx = multipliers[x].unwrap_or(1.0);
        for &(y, ratio) in edges.get(&x).map(Vec::as_slice).unwrap_or(&[]) {
            if multipliers[y].is_none() {
                multipliers[y] = Some(mx * ratio);
                queue.push_back(y);
            }
        }
    }

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            if multipliers[i].is_none() {
                warn!("league {} has no bridge path to {}; using 1.0", name, names[reference]);
            }
            LeagueStrength {
                league: name.clone(),
                multiplier: multipliers[i].unwrap_or(1.0),
                bridge_players: bridge_counts[i],
                anchored: multipliers[i].is_some(),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Normalized comparison
// ---------------------------------------------------------------------------

/// Scale a win percentage by its league's multiplier. The result is a
/// comparison index and can exceed 100.
pub fn normalized_pct(pct: f64, multiplier: f64) -> f64 {
    pct * multiplier
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPlayer {
    pub player: String,
    pub league: String,
    pub team: Option<String>,
    pub played: u32,
    pub adjusted_pct: f64,
    pub normalized_pct: f64,
}

/// Rank every league player on one scale, best first.
pub fn compare_across_leagues(
    leagues: &[LeagueDataset],
    strengths: &[LeagueStrength],
    cfg: &EngineConfig,
) -> Vec<NormalizedPlayer> {
    let r = &cfg.ratings;
    let mut out: Vec<NormalizedPlayer> = Vec::new();
    for league in leagues {
        let multiplier = strengths
            .iter()
            .find(|s| same_name(&s.league, &league.name))
            .map(|s| s.multiplier)
            .unwrap_or(1.0);
        for stat in league.players.iter().filter(|s| s.played > 0 && !s.cup) {
            let adjusted = bayesian_adjust(stat.won, stat.played, r.prior_mean, r.prior_weight) * 100.0;
            out.push(NormalizedPlayer {
                player: stat.player.clone(),
                league: league.name.clone(),
                team: stat.team.clone(),
                played: stat.played,
                adjusted_pct: adjusted,
                normalized_pct: normalized_pct(adjusted, multiplier),
            });
        }
    }
    out.sort_by(|a, b| {
        b.normalized_pct
            .partial_cmp(&a.normalized_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| normalize_name(&a.player).cmp(&normalize_name(&b.player)))
            .then_with(|| a.league.cmp(&b.league))
    });
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
