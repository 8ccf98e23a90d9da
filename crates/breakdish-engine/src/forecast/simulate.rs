// Monte Carlo season projection.
//
// Each iteration starts from the current table, plays every remaining
// fixture by sampling win/draw/loss from the match predictor, and records
// where each team finished. The random source is always passed in, so a
// seeded generator reproduces a run bit for bit.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use breakdish_core::config::EngineConfig;
use breakdish_core::model::{normalize_name, Fixture, LockedResult, MatchResult, Standing};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::forecast::predict::outcome_probabilities;

// ---------------------------------------------------------------------------
// League points rule
// ---------------------------------------------------------------------------

pub const HOME_WIN_POINTS: u32 = 2;
pub const DRAW_POINTS: u32 = 1;
pub const AWAY_WIN_POINTS: u32 = 3;

/// Points (home, away) earned for a final score.
pub fn match_points(home_score: u32, away_score: u32) -> (u32, u32) {
    if home_score > away_score {
        (HOME_WIN_POINTS, 0)
    } else if home_score < away_score {
        (0, AWAY_WIN_POINTS)
    } else {
        (DRAW_POINTS, DRAW_POINTS)
    }
}

/// Build the league table from league results (cup results are ignored).
/// Ordered by points, then frame difference, then name.
pub fn standings_from_results(results: &[MatchResult]) -> Vec<Standing> {
    let mut table: BTreeMap<String, Standing> = BTreeMap::new();
    for r in results.iter().filter(|r| !r.cup) {
        let (hp, ap) = match_points(r.home_score, r.away_score);
        for (team, pts, ff, fa) in [
            (&r.home_team, hp, r.home_score, r.away_score),
            (&r.away_team, ap, r.away_score, r.home_score),
        ] {
            let row = table
                .entry(normalize_name(team))
                .or_insert_with(|| Standing::new(team, 0));
            row.played += 1;
            row.points += pts;
            row.frames_for += ff;
            row.frames_against += fa;
        }
    }
    let mut rows: Vec<Standing> = table.into_values().collect();
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.frame_difference().cmp(&a.frame_difference()))
            .then_with(|| normalize_name(&a.team).cmp(&normalize_name(&b.team)))
    });
    rows
}

// ---------------------------------------------------------------------------
// Inputs and outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationInput {
    pub fixtures: Vec<Fixture>,
    pub standings: Vec<Standing>,
    /// Team strengths (0-1) keyed by team name.
    pub strengths: BTreeMap<String, f64>,
    /// What-if results pinned for specific remaining fixtures.
    pub locked: Vec<LockedResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub team: String,
    pub current_pts: u32,
    pub avg_pts: f64,
    /// Percent of runs finishing first.
    pub p_title: f64,
    pub p_top2: f64,
    pub p_bot2: f64,
}

/// A remaining fixture resolved to table indices and outcome bands.
struct SampledFixture {
    home: usize,
    away: usize,
    p_home: f64,
    p_home_or_draw: f64,
}

// ---------------------------------------------------------------------------
// Core run
// ---------------------------------------------------------------------------

/// Simulate the rest of the season `iterations` times.
///
/// Fails only on malformed input: nothing to simulate, or a fixture naming a
/// team that is not in the standings. When `cancel` is set between
/// iterations the run stops with `Cancelled` and no partial result.
pub fn run_simulation<R: Rng + ?Sized>(
    input: &SimulationInput,
    iterations: usize,
    cfg: &EngineConfig,
    rng: &mut R,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<SimulationResult>, EngineError> {
    if input.fixtures.is_empty() && input.standings.is_empty() {
        return Err(EngineError::EmptySimulation);
    }
    let iterations = iterations.max(1);

    let index: HashMap<String, usize> = input
        .standings
        .iter()
        .enumerate()
        .map(|(i, s)| (normalize_name(&s.team), i))
        .collect();
    let resolve = |home: &str, away: &str| -> Result<(usize, usize), EngineError> {
        match (index.get(&normalize_name(home)), index.get(&normalize_name(away))) {
            (Some(&h), Some(&a)) => Ok((h, a)),
            _ => Err(EngineError::UnresolvedFixture {
                home: home.to_string(),
                away: away.to_string(),
            }),
        }
    };

    let strengths: HashMap<String, f64> = input
        .strengths
        .iter()
        .map(|(t, s)| (normalize_name(t), *s))
        .collect();
    let strength_of = |team: &str| -> f64 {
        strengths.get(&normalize_name(team)).copied().unwrap_or_else(|| {
            warn!("no strength for {}, using the prior mean", team);
            cfg.ratings.prior_mean
        })
    };

    // Pinned results are applied once, up front, and never sampled.
    let mut base_points: Vec<u32> = input.standings.iter().map(|s| s.points).collect();
    let mut frame_diff: Vec<i64> = input.standings.iter().map(|s| s.frame_difference()).collect();
    let mut sampled = Vec::with_capacity(input.fixtures.len());
    for fixture in &input.fixtures {
        let (h, a) = resolve(&fixture.home, &fixture.away)?;
        if let Some(lock) = input.locked.iter().find(|l| l.matches(fixture)) {
            let (hp, ap) = match_points(lock.home_score, lock.away_score);
            base_points[h] += hp;
            base_points[a] += ap;
            let margin = lock.home_score as i64 - lock.away_score as i64;
            frame_diff[h] += margin;
            frame_diff[a] -= margin;
            continue;
        }
        let (p_home, p_draw, _) =
            outcome_probabilities(strength_of(&fixture.home), strength_of(&fixture.away), &cfg.prediction);
        sampled.push(SampledFixture {
            home: h,
            away: a,
            p_home,
            p_home_or_draw: p_home + p_draw,
        });
    }
    for lock in &input.locked {
        if !input.fixtures.iter().any(|f| lock.matches(f)) {
            warn!(
                "locked result {} v {} matches no remaining fixture; ignored",
                lock.home, lock.away
            );
        }
    }

    let n = input.standings.len();
    let mut total_points = vec![0u64; n];
    let mut titles = vec![0u64; n];
    let mut top2 = vec![0u64; n];
    let mut bot2 = vec![0u64; n];
    let mut points = vec![0u32; n];
    let mut order: Vec<(u32, i64, u64, usize)> = Vec::with_capacity(n);

    debug!(
        "simulating {} fixtures ({} locked) for {} teams x {} iterations",
        sampled.len(),
        input.fixtures.len() - sampled.len(),
        n,
        iterations
    );

    for _ in 0..iterations {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            info!("season simulation cancelled; discarding partial results");
            return Err(EngineError::Cancelled);
        }

        points.copy_from_slice(&base_points);
        for f in &sampled {
            let u: f64 = rng.gen();
            if u < f.p_home {
                points[f.home] += HOME_WIN_POINTS;
            } else if u < f.p_home_or_draw {
                points[f.home] += DRAW_POINTS;
                points[f.away] += DRAW_POINTS;
            } else {
                points[f.away] += AWAY_WIN_POINTS;
            }
        }

        // Points, then known frame difference; teams still level are
        // separated by a fresh random key each run.
        order.clear();
        for (i, &p) in points.iter().enumerate() {
            order.push((p, frame_diff[i], rng.gen::<u64>(), i));
        }
        order.sort_by(|a, b| {
            b.0.cmp(&a.0)
                .then_with(|| b.1.cmp(&a.1))
                .then_with(|| a.2.cmp(&b.2))
        });

        for (rank, &(p, _, _, i)) in order.iter().enumerate() {
            total_points[i] += p as u64;
            if rank == 0 {
                titles[i] += 1;
            }
            if rank < 2 {
                top2[i] += 1;
            }
            if rank + 2 >= n {
                bot2[i] += 1;
            }
        }
    }

    let runs = iterations as f64;
    let mut results: Vec<SimulationResult> = input
        .standings
        .iter()
        .enumerate()
        .map(|(i, s)| SimulationResult {
            team: s.team.clone(),
            current_pts: s.points,
            avg_pts: total_points[i] as f64 / runs,
            p_title: titles[i] as f64 * 100.0 / runs,
            p_top2: top2[i] as f64 * 100.0 / runs,
            p_bot2: bot2[i] as f64 * 100.0 / runs,
        })
        .collect();
    results.sort_by(|a, b| {
        b.avg_pts
            .partial_cmp(&a.avg_pts)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.p_title.partial_cmp(&a.p_title).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| normalize_name(&a.team).cmp(&normalize_name(&b.team)))
    });
    Ok(results)
}

/// Bit-reproducible run from a fixed seed.
pub fn run_seeded(
    input: &SimulationInput,
    iterations: usize,
    seed: u64,
    cfg: &EngineConfig,
) -> Result<Vec<SimulationResult>, EngineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    run_simulation(input, iterations, cfg, &mut rng, None)
}

// ---------------------------------------------------------------------------
// Stateful wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationState {
    Idle,
    Simulating,
    Complete,
    /// Malformed input; carries the reason.
    Failed(String),
}

/// Tracks one simulation's lifecycle: Idle -> Simulating -> Complete | Failed.
/// A cancelled run returns to Idle.
#[derive(Debug)]
pub struct SeasonSimulator {
    config: EngineConfig,
    state: SimulationState,
}

impl SeasonSimulator {
    pub fn new(config: EngineConfig) -> Self {
        SeasonSimulator {
            config,
            state: SimulationState::Idle,
        }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Run with the configured iteration count. Uses the configured seed
    /// when one is set, otherwise the supplied generator.
    pub fn run<R: Rng + ?Sized>(
        &mut self,
        input: &SimulationInput,
        rng: &mut R,
        cancel: Option<&AtomicBool>,
    ) -> Result<Vec<SimulationResult>, EngineError> {
        self.state = SimulationState::Simulating;
        let iterations = self.config.simulation.iterations;
        let outcome = match self.config.simulation.seed {
            Some(seed) => {
                let mut seeded = StdRng::seed_from_u64(seed);
                run_simulation(input, iterations, &self.config, &mut seeded, cancel)
            }
            None => run_simulation(input, iterations, &self.config, rng, cancel),
        };
        self.state = match &outcome {
            Ok(_) => SimulationState::Complete,
            Err(EngineError::Cancelled) => SimulationState::Idle,
            Err(e) => SimulationState::Failed(e.to_string()),
        };
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
