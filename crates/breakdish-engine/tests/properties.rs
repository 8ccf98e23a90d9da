// Integration tests for the analytics engine.
//
// These drive the public API end to end over a small synthetic season and
// check the properties every caller relies on: symmetry of head-to-head,
// idempotent aggregation, well-formed probabilities and reproducible
// simulations.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use breakdish_core::config::EngineConfig;
use breakdish_core::model::{
    Fixture, Frame, LeagueDataset, MatchResult, RosterEntry, SetNumber, Side, Standing, TeamRoster,
};
use breakdish_engine::cross_league::{calculate_league_strengths, find_all_bridge_players};
use breakdish_engine::forecast::predict::{predict, team_strength};
use breakdish_engine::forecast::simulate::{
    run_seeded, run_simulation, standings_from_results, SeasonSimulator, SimulationInput,
    SimulationState,
};
use breakdish_engine::ratings::form::{form, player_games};
use breakdish_engine::ratings::h2h::h2h;
use breakdish_engine::ratings::stats::{aggregate_all, bayesian_adjust};
use breakdish_engine::reports::lineup::suggest_lineup;
use breakdish_engine::reports::scouting::build_report;
use breakdish_engine::EngineError;
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;

// ===========================================================================
// Test helpers
// ===========================================================================

const TEAMS: [&str; 4] = ["Red Lion", "Crown", "Anchor", "Plough"];

fn squad(team: &str) -> Vec<String> {
    (1..=4).map(|i| format!("{} {}", team, i)).collect()
}

/// Deterministic season: every pair of teams meets home and away, each
/// match is eight frames between the two squads. Outcomes follow a fixed
/// pattern so every run sees the same season.
fn season() -> (Vec<Frame>, Vec<MatchResult>) {
    let start = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    let mut frames = Vec::new();
    let mut results = Vec::new();
    let mut week = 0i64;
    for (hi, home) in TEAMS.iter().enumerate() {
        for (ai, away) in TEAMS.iter().enumerate() {
            if hi == ai {
                continue;
            }
            let date = start + chrono::Duration::weeks(week);
            week += 1;
            let (hs, as_) = (squad(home), squad(away));
            let (mut home_score, mut away_score) = (0, 0);
            for i in 0..8usize {
                let home_wins = (i + hi + week as usize) % (ai + 2) != 0;
                let winner = if home_wins { Side::Home } else { Side::Away };
                if home_wins {
                    home_score += 1;
                } else {
                    away_score += 1;
                }
                frames.push(Frame {
                    date,
                    division: "Premier".into(),
                    home_team: home.to_string(),
                    away_team: away.to_string(),
                    home_player: hs[i % 4].clone(),
                    away_player: as_[(i + 1) % 4].clone(),
                    set: if i < 4 { SetNumber::One } else { SetNumber::Two },
                    winner,
                    break_and_dish: i == 2,
                    forfeit: false,
                    cup: false,
                });
            }
            results.push(MatchResult {
                date,
                division: "Premier".into(),
                home_team: home.to_string(),
                away_team: away.to_string(),
                home_score,
                away_score,
                cup: false,
            });
        }
    }
    (frames, results)
}

fn rosters(frames: &[Frame]) -> Vec<TeamRoster> {
    let stats = aggregate_all(frames, false);
    TEAMS
        .iter()
        .map(|team| TeamRoster {
            team: team.to_string(),
            players: squad(team)
                .iter()
                .map(|p| {
                    let stat = stats.values().find(|s| &s.player == p).cloned();
                    RosterEntry::new(p, stat)
                })
                .collect(),
        })
        .collect()
}

// ===========================================================================
// Test: ratings layer
// ===========================================================================

#[test]
fn bayesian_adjust_converges_to_raw_rate() {
    assert_eq!(bayesian_adjust(0, 0, 0.5, 7.0), 0.5);
    let big = bayesian_adjust(70_000, 100_000, 0.5, 7.0);
    assert!((big - 0.7).abs() < 1e-3);
}

#[test]
fn head_to_head_is_symmetric() {
    let (frames, _) = season();
    for a in squad("Red Lion") {
        for b in squad("Crown") {
            let ab = h2h(&a, &b, &frames);
            let ba = h2h(&b, &a, &frames);
            assert_eq!(ab.wins, ba.losses);
            assert_eq!(ab.losses, ba.wins);
        }
    }
}

#[test]
fn aggregation_is_idempotent() {
    let (frames, results) = season();
    let cfg = EngineConfig::default();

    assert_eq!(aggregate_all(&frames, false), aggregate_all(&frames, false));

    let player = "Red Lion 1";
    let g1 = player_games(player, &frames);
    assert_eq!(form(&g1, &cfg.form), form(&player_games(player, &frames), &cfg.form));

    let stats: Vec<_> = aggregate_all(&frames, false).into_values().collect();
    let r1 = build_report("Crown", &frames, &results, &stats, &cfg);
    let r2 = build_report("Crown", &frames, &results, &stats, &cfg);
    assert_eq!(r1, r2);
    assert_eq!(r1.matches_played, 6);
}

#[test]
fn frame_totals_match_results() {
    let (frames, results) = season();
    let stats = aggregate_all(&frames, false);
    let played: u32 = stats.values().map(|s| s.played).sum();
    let won: u32 = stats.values().map(|s| s.won).sum();
    assert_eq!(played as usize, frames.len() * 2);
    assert_eq!(won as usize, frames.len());
    let frame_total: u32 = results.iter().map(|r| r.home_score + r.away_score).sum();
    assert_eq!(frame_total as usize, frames.len());
}

// ===========================================================================
// Test: lineup
// ===========================================================================

#[test]
fn lineup_two_players_one_slot_uses_both() {
    let mut cfg = EngineConfig::default();
    cfg.lineup.slots_per_set = 1;
    let rosters = vec![
        TeamRoster {
            team: "Red Lion".into(),
            players: vec![RosterEntry::new("Ann", None), RosterEntry::new("Bea", None)],
        },
        TeamRoster {
            team: "Crown".into(),
            players: vec![RosterEntry::new("Zed", None)],
        },
    ];
    let s = suggest_lineup("Red Lion", "Crown", true, &[], &[], &rosters, &cfg);
    assert_eq!(s.set1.len(), 1);
    assert_eq!(s.set2.len(), 1);
    assert_ne!(s.set1[0].player, s.set2[0].player);
}

#[test]
fn lineup_from_season_has_disjoint_sets() {
    let (frames, _) = season();
    let rosters = rosters(&frames);
    let stats: Vec<_> = aggregate_all(&frames, false).into_values().collect();
    let mut cfg = EngineConfig::default();
    cfg.lineup.slots_per_set = 2;
    let s = suggest_lineup("Anchor", "Plough", false, &frames, &stats, &rosters, &cfg);
    assert_eq!(s.set1.len() + s.set2.len(), 4);
    for p in &s.set1 {
        assert!(s.set2.iter().all(|q| q.player != p.player));
    }
}

// ===========================================================================
// Test: prediction
// ===========================================================================

#[test]
fn equal_strengths_are_balanced_without_home_advantage() {
    let mut cfg = EngineConfig::default().prediction;
    cfg.home_advantage = 0.0;
    let p = predict(0.5, 0.5, None, &cfg);
    assert!((p.p_home_win - p.p_away_win).abs() < 1e-9);
    assert!((p.p_home_win + p.p_draw + p.p_away_win - 100.0).abs() <= 1.0);

    cfg.home_advantage = 0.2;
    let p = predict(0.5, 0.5, None, &cfg);
    assert!(p.p_home_win > p.p_away_win);
    assert!((p.p_home_win + p.p_draw + p.p_away_win - 100.0).abs() <= 1.0);
}

#[test]
fn team_strengths_stay_in_unit_interval() {
    let (frames, _) = season();
    let cfg = EngineConfig::default();
    for roster in rosters(&frames) {
        let s = team_strength(&roster, &cfg.ratings);
        assert!((0.0..=1.0).contains(&s), "{}: {}", roster.team, s);
    }
}

// ===========================================================================
// Test: season simulation
// ===========================================================================

fn remaining_input() -> SimulationInput {
    let (frames, results) = season();
    let cfg = EngineConfig::default();
    let standings = standings_from_results(&results);
    let strengths: BTreeMap<String, f64> = rosters(&frames)
        .iter()
        .map(|r| (r.team.clone(), team_strength(r, &cfg.ratings)))
        .collect();
    let fixtures = TEAMS
        .iter()
        .flat_map(|h| {
            TEAMS.iter().filter(move |a| *a != h).map(move |a| Fixture {
                home: h.to_string(),
                away: a.to_string(),
            })
        })
        .collect();
    SimulationInput {
        fixtures,
        standings,
        strengths,
        locked: Vec::new(),
    }
}

#[test]
fn simulation_probabilities_sum_to_slot_counts() {
    let input = remaining_input();
    let results = run_seeded(&input, 1000, 2024, &EngineConfig::default()).unwrap();
    let title: f64 = results.iter().map(|r| r.p_title).sum();
    let top2: f64 = results.iter().map(|r| r.p_top2).sum();
    let bot2: f64 = results.iter().map(|r| r.p_bot2).sum();
    assert!((title - 100.0).abs() <= 2.0);
    assert!((top2 - 200.0).abs() <= 2.0);
    assert!((bot2 - 200.0).abs() <= 2.0);
    for r in &results {
        assert!(r.avg_pts >= r.current_pts as f64);
    }
}

#[test]
fn equal_teams_without_fixtures() {
    let input = SimulationInput {
        standings: TEAMS.iter().map(|t| Standing::new(t, 12)).collect(),
        ..SimulationInput::default()
    };
    let results = run_seeded(&input, 1000, 8, &EngineConfig::default()).unwrap();
    for r in &results {
        assert_eq!(r.avg_pts, 12.0);
        assert!((r.p_title - 25.0).abs() < 6.0, "{} {}", r.team, r.p_title);
    }
}

#[test]
fn seeded_simulation_is_reproducible() {
    let input = remaining_input();
    let cfg = EngineConfig::default();
    assert_eq!(
        run_seeded(&input, 300, 17, &cfg).unwrap(),
        run_seeded(&input, 300, 17, &cfg).unwrap()
    );
}

#[test]
fn simulator_tracks_state_and_cancellation() {
    let mut cfg = EngineConfig::default();
    cfg.simulation.iterations = 200;
    cfg.simulation.seed = Some(5);
    let mut sim = SeasonSimulator::new(cfg.clone());
    let mut rng = StdRng::seed_from_u64(0);
    let input = remaining_input();

    assert_eq!(sim.state(), &SimulationState::Idle);
    let first = sim.run(&input, &mut rng, None).unwrap();
    assert_eq!(sim.state(), &SimulationState::Complete);
    // Configured seed wins over the supplied generator.
    assert_eq!(first, run_seeded(&input, 200, 5, &cfg).unwrap());

    let cancel = AtomicBool::new(true);
    let err = sim.run(&input, &mut rng, Some(&cancel)).unwrap_err();
    assert_eq!(err, EngineError::Cancelled);
    assert_eq!(sim.state(), &SimulationState::Idle);

    let err = run_simulation(&SimulationInput::default(), 10, &cfg, &mut rng, None).unwrap_err();
    assert_eq!(err, EngineError::EmptySimulation);
}

// ===========================================================================
// Test: cross-league
// ===========================================================================

#[test]
fn leagues_without_shared_players_are_neutral() {
    let (frames, _) = season();
    let north = LeagueDataset {
        name: "North".into(),
        players: aggregate_all(&frames, false).into_values().collect(),
    };
    let mut south_players = north.players.clone();
    for p in &mut south_players {
        p.player = format!("South {}", p.player);
    }
    let south = LeagueDataset {
        name: "South".into(),
        players: south_players,
    };
    let leagues = vec![north, south];
    let bridges = find_all_bridge_players(&leagues, 1);
    assert!(bridges.is_empty());
    let strengths = calculate_league_strengths(&leagues, &bridges, &EngineConfig::default());
    assert!(strengths.iter().all(|s| s.multiplier == 1.0));
}
