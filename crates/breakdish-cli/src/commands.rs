// Command implementations.
//
// Each command turns a loaded dataset plus config into a serializable view.
// Rendering lives in `render`; the binary only parses arguments and prints.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context};
use breakdish_core::cache::AggregateCache;
use breakdish_core::config::EngineConfig;
use breakdish_core::model::{
    find_roster, normalize_name, same_name, PlayerSeasonStat, SquadOverride, SquadOverrides,
    Standing,
};
use breakdish_engine::cross_league::{
    calculate_league_strengths, compare_across_leagues, find_all_bridge_players, BridgePlayer,
    LeagueStrength, NormalizedPlayer,
};
use breakdish_engine::forecast::predict::{predict_fixture, team_strength, PredictionResult};
use breakdish_engine::forecast::simulate::{
    standings_from_results, SeasonSimulator, SimulationInput, SimulationResult,
};
use breakdish_engine::ratings::form::{form, home_away_split, player_games, FormSummary, HomeAwaySplit};
use breakdish_engine::ratings::h2h::{h2h, squad_h2h, H2HRecord};
use breakdish_engine::ratings::stats::{
    adjusted_rate, aggregate_all, break_and_dish_rates, BreakAndDishRates,
};
use breakdish_engine::reports::lineup::{suggest_lineup, LineupSuggestion};
use breakdish_engine::reports::scouting::{build_report, ScoutingReport};
use serde::Serialize;
use tracing::{info, warn};

use crate::dataset::Dataset;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

const SEASON_STATS_KEY: &str = "season-stats";

/// A loaded dataset with its config and memoized aggregates.
pub struct Session {
    pub dataset: Dataset,
    pub config: EngineConfig,
    stats: AggregateCache<BTreeMap<String, PlayerSeasonStat>>,
}

impl Session {
    pub fn new(dataset: Dataset, config: EngineConfig) -> Self {
        Session {
            dataset,
            config,
            stats: AggregateCache::new(),
        }
    }

    pub fn open(dir: &Path, config: EngineConfig) -> anyhow::Result<Self> {
        let dataset = Dataset::load(dir).with_context(|| format!("failed to load dataset from {}", dir.display()))?;
        Ok(Session::new(dataset, config))
    }

    /// League season stats keyed by normalized player name.
    pub fn season_stats(&mut self) -> &BTreeMap<String, PlayerSeasonStat> {
        let frames = &self.dataset.frames;
        self.stats
            .get_or_insert_with(self.dataset.version, SEASON_STATS_KEY, || aggregate_all(frames, false))
    }

    /// Swap in freshly loaded data, dropping aggregates of the old version.
    pub fn reload(&mut self, dataset: Dataset) {
        if dataset.version != self.dataset.version {
            self.stats.invalidate_version(self.dataset.version);
        }
        self.dataset = dataset;
    }

    pub fn cached_aggregates(&self) -> usize {
        self.stats.len()
    }
}

// ---------------------------------------------------------------------------
// player
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerProfile {
    pub stat: PlayerSeasonStat,
    /// Adjusted win percentage, 0-100.
    pub adjusted_pct: f64,
    pub rates: BreakAndDishRates,
    pub form: FormSummary,
    pub venue: HomeAwaySplit,
}

/// Season profile for one player. Unknown players get a zeroed profile.
pub fn player_profile(session: &mut Session, name: &str) -> PlayerProfile {
    let cfg = session.config.clone();
    let stat = session
        .season_stats()
        .get(&normalize_name(name))
        .cloned()
        .unwrap_or_else(|| {
            warn!("no frames found for player {}", name);
            PlayerSeasonStat::empty(name)
        });
    let games = player_games(name, &session.dataset.frames);
    PlayerProfile {
        adjusted_pct: adjusted_rate(Some(&stat), None, &cfg.ratings) * 100.0,
        rates: break_and_dish_rates(&stat),
        form: form(&games, &cfg.form),
        venue: home_away_split(&games),
        stat,
    }
}

// ---------------------------------------------------------------------------
// h2h
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HeadToHead {
    Players(H2HRecord),
    Squads(Vec<H2HRecord>),
}

/// Two team names compare squads; anything else compares two players.
pub fn head_to_head(session: &Session, a: &str, b: &str) -> HeadToHead {
    let d = &session.dataset;
    if find_roster(&d.rosters, a).is_some() && find_roster(&d.rosters, b).is_some() {
        HeadToHead::Squads(squad_h2h(a, b, &d.frames, &d.rosters))
    } else {
        HeadToHead::Players(h2h(a, b, &d.frames))
    }
}

// ---------------------------------------------------------------------------
// scout / lineup
// ---------------------------------------------------------------------------

pub fn scout(session: &mut Session, team: &str) -> ScoutingReport {
    let stats: Vec<PlayerSeasonStat> = session.season_stats().values().cloned().collect();
    let d = &session.dataset;
    build_report(team, &d.frames, &d.results, &stats, &session.config)
}

pub fn lineup(session: &mut Session, team: &str, opponent: &str, is_home: bool) -> LineupSuggestion {
    let stats: Vec<PlayerSeasonStat> = session.season_stats().values().cloned().collect();
    let d = &session.dataset;
    suggest_lineup(team, opponent, is_home, &d.frames, &stats, &d.rosters, &session.config)
}

// ---------------------------------------------------------------------------
// predict
// ---------------------------------------------------------------------------

/// Parse a `team:player` override argument.
pub fn parse_team_player(arg: &str) -> anyhow::Result<(String, String)> {
    let Some((team, player)) = arg.split_once(':') else {
        bail!("expected TEAM:PLAYER, got '{}'", arg);
    };
    let (team, player) = (team.trim(), player.trim());
    if team.is_empty() || player.is_empty() {
        bail!("expected TEAM:PLAYER, got '{}'", arg);
    }
    Ok((team.to_string(), player.to_string()))
}

/// Collect `--add` / `--remove` arguments into per-team overrides.
pub fn build_overrides(adds: &[String], removes: &[String]) -> anyhow::Result<SquadOverrides> {
    let mut overrides = SquadOverrides::new();
    for (args, adding) in [(adds, true), (removes, false)] {
        for arg in args {
            let (team, player) = parse_team_player(arg)?;
            let entry: &mut SquadOverride = overrides.entry(team).or_default();
            if adding {
                entry.added.push(player);
            } else {
                entry.removed.push(player);
            }
        }
    }
    Ok(overrides)
}

pub fn predict(
    session: &mut Session,
    home: &str,
    away: &str,
    overrides: &SquadOverrides,
) -> anyhow::Result<PredictionResult> {
    let pool = session.season_stats().clone();
    let d = &session.dataset;
    let result = predict_fixture(home, away, &d.rosters, overrides, &pool, &session.config)
        .with_context(|| format!("cannot predict {} v {}", home, away))?;
    Ok(result)
}

// ---------------------------------------------------------------------------
// simulate
// ---------------------------------------------------------------------------

/// Assemble the simulator input from league results, remaining fixtures and
/// roster strengths, optionally restricted to one division.
pub fn simulation_input(session: &Session, division: Option<&str>) -> SimulationInput {
    let d = &session.dataset;
    let in_division = |div: &str| division.map_or(true, |want| same_name(div, want));

    let results: Vec<_> = d.results.iter().filter(|r| in_division(&r.division)).cloned().collect();
    if division.is_none() {
        let mut divisions: Vec<String> = results.iter().map(|r| normalize_name(&r.division)).collect();
        divisions.sort();
        divisions.dedup();
        if divisions.len() > 1 {
            warn!("results span {} divisions; pass --division to simulate one table", divisions.len());
        }
    }
    let mut standings = standings_from_results(&results);

    let fixtures: Vec<_> = d
        .fixtures
        .iter()
        .filter(|f| f.division.is_empty() || in_division(&f.division))
        .map(|f| f.fixture.clone())
        .collect();
    for f in &fixtures {
        for team in [&f.home, &f.away] {
            if !standings.iter().any(|s| same_name(&s.team, team)) {
                standings.push(Standing::new(team, 0));
            }
        }
    }

    let strengths = standings
        .iter()
        .filter_map(|s| {
            find_roster(&d.rosters, &s.team).map(|r| (s.team.clone(), team_strength(r, &session.config.ratings)))
        })
        .collect();

    SimulationInput {
        fixtures,
        standings,
        strengths,
        locked: Vec::new(),
    }
}

/// Run the simulation on a blocking worker. Setting `cancel` stops it
/// between iterations.
pub async fn run_simulation_blocking(
    input: SimulationInput,
    config: EngineConfig,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<Vec<SimulationResult>> {
    let worker = tokio::task::spawn_blocking(move || {
        let mut simulator = SeasonSimulator::new(config);
        let mut rng = rand::thread_rng();
        simulator.run(&input, &mut rng, Some(cancel.as_ref()))
    });
    let outcome = worker.await.context("simulation worker failed")?;
    Ok(outcome?)
}

/// Run the simulation and cancel it on Ctrl+C.
pub async fn simulate(
    session: &Session,
    division: Option<&str>,
) -> anyhow::Result<Vec<SimulationResult>> {
    let input = simulation_input(session, division);
    info!(
        "simulating {} remaining fixtures for {} teams ({} iterations)",
        input.fixtures.len(),
        input.standings.len(),
        session.config.simulation.iterations
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling simulation");
            flag.store(true, Ordering::Relaxed);
        }
    });

    let outcome = run_simulation_blocking(input, session.config.clone(), cancel).await;
    watcher.abort();
    outcome
}

// ---------------------------------------------------------------------------
// leagues
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeagueComparison {
    pub strengths: Vec<LeagueStrength>,
    pub bridges: Vec<BridgePlayer>,
    pub players: Vec<NormalizedPlayer>,
}

pub fn compare_leagues(dirs: &[impl AsRef<Path>], config: &EngineConfig) -> anyhow::Result<LeagueComparison> {
    if dirs.len() < 2 {
        bail!("need at least two league directories to compare");
    }
    let mut leagues = Vec::with_capacity(dirs.len());
    for dir in dirs {
        let dir = dir.as_ref();
        let dataset =
            Dataset::load(dir).with_context(|| format!("failed to load league from {}", dir.display()))?;
        leagues.push(dataset.league());
    }
    let bridges = find_all_bridge_players(&leagues, config.cross_league.min_games);
    let strengths = calculate_league_strengths(&leagues, &bridges, config);
    let players = compare_across_leagues(&leagues, &strengths, config);
    Ok(LeagueComparison {
        strengths,
        bridges,
        players,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_player_argument_parsing() {
        assert_eq!(
            parse_team_player("Red Lion: Ann ").unwrap(),
            ("Red Lion".to_string(), "Ann".to_string())
        );
        assert!(parse_team_player("Red Lion").is_err());
        assert!(parse_team_player(":Ann").is_err());
    }

    #[test]
    fn overrides_group_by_team() {
        let overrides = build_overrides(
            &["Crown:Star".into(), "Crown:Nova".into()],
            &["Crown:Zed".into(), "Red Lion:Ann".into()],
        )
        .unwrap();
        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides["Crown"].added, vec!["Star", "Nova"]);
        assert_eq!(overrides["Crown"].removed, vec!["Zed"]);
        assert_eq!(overrides["Red Lion"].removed, vec!["Ann"]);
    }
}
