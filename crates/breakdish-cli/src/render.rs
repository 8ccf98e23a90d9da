// Plain-text rendering of command output.

use std::fmt::Write;

use breakdish_engine::forecast::predict::PredictionResult;
use breakdish_engine::forecast::simulate::SimulationResult;
use breakdish_engine::ratings::form::WindowRecord;
use breakdish_engine::ratings::h2h::H2HRecord;
use breakdish_engine::reports::lineup::{LineupPick, LineupSuggestion};
use breakdish_engine::reports::scouting::ScoutingReport;
use serde::Serialize;

use crate::commands::{HeadToHead, LeagueComparison, PlayerProfile};

/// Pretty JSON for `--json`.
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn record(r: &WindowRecord) -> String {
    format!("{}/{} ({:.1}%)", r.won, r.played, r.pct)
}

pub fn player(p: &PlayerProfile) -> String {
    let mut out = String::new();
    let s = &p.stat;
    let _ = writeln!(out, "{} ({})", s.player, s.team.as_deref().unwrap_or("no team"));
    let _ = writeln!(
        out,
        "  season    {}/{} ({:.1}%), adjusted {:.1}%",
        s.won, s.played, s.pct, p.adjusted_pct
    );
    let _ = writeln!(
        out,
        "  B&D       for {} ({:.2}/frame), against {} ({:.2}/frame), forfeits {}",
        s.bd_for, p.rates.bd_f_rate, s.bd_against, p.rates.bd_a_rate, s.forfeits
    );
    let _ = writeln!(
        out,
        "  form      last5 {}, last10 {}, trend {}",
        record(&p.form.last5),
        record(&p.form.last10),
        p.form.trend.label()
    );
    let _ = writeln!(out, "  venue     home {}, away {}", record(&p.venue.home), record(&p.venue.away));
    out
}

fn h2h_line(r: &H2HRecord) -> String {
    format!("{} v {}: {}-{}", r.player_a, r.player_b, r.wins, r.losses)
}

pub fn head_to_head(h: &HeadToHead) -> String {
    match h {
        HeadToHead::Players(r) if r.meetings() == 0 => {
            format!("{} and {} have never met\n", r.player_a, r.player_b)
        }
        HeadToHead::Players(r) => format!("{}\n", h2h_line(r)),
        HeadToHead::Squads(records) if records.is_empty() => "no meetings between these squads\n".to_string(),
        HeadToHead::Squads(records) => records.iter().map(|r| format!("{}\n", h2h_line(r))).collect(),
    }
}

pub fn scouting(r: &ScoutingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}: {} matches, form {}", r.team, r.matches_played, r.recent_form);
    let _ = writeln!(out, "  home {}, away {}", record(&r.home), record(&r.away));
    let _ = writeln!(
        out,
        "  set 1 {:.1}%, set 2 {:.1}%{}",
        r.set_performance.set1.pct,
        r.set_performance.set2.pct,
        if r.set_even { " (even)" } else { "" }
    );
    let _ = writeln!(
        out,
        "  B&D for {}, against {}, net {:+}; forfeit rate {:.1}%",
        r.bd_for, r.bd_against, r.bd_net, r.forfeit_rate
    );
    for (label, players) in [("strongest", &r.strongest_players), ("weakest", &r.weakest_players)] {
        let names: Vec<String> = players
            .iter()
            .map(|p| format!("{} {:.1}%", p.player, p.adjusted_pct))
            .collect();
        let _ = writeln!(out, "  {:<9} {}", label, names.join(", "));
    }
    out
}

fn picks(out: &mut String, label: &str, picks: &[LineupPick]) {
    let _ = writeln!(out, "{}", label);
    for p in picks {
        let _ = writeln!(
            out,
            "  {:<20} score {:>5.1}  adj {:>5.1}%  form {:>5.1}%  h2h {:+}",
            p.player, p.score, p.adj_pct, p.form_pct, p.h2h_advantage
        );
    }
}

pub fn lineup(s: &LineupSuggestion) -> String {
    let mut out = String::new();
    picks(&mut out, "Set 1", &s.set1);
    picks(&mut out, "Set 2", &s.set2);
    for note in &s.insights {
        let _ = writeln!(out, "* {}", note);
    }
    out
}

fn prediction_lines(out: &mut String, p: &PredictionResult) {
    let _ = writeln!(
        out,
        "  home {:.1}%  draw {:.1}%  away {:.1}%   expected {:.1}-{:.1}",
        p.p_home_win, p.p_draw, p.p_away_win, p.expected_home, p.expected_away
    );
    let scores: Vec<String> = p
        .top_scores
        .iter()
        .map(|s| format!("{}-{} {:.1}%", s.home, s.away, s.probability))
        .collect();
    let _ = writeln!(out, "  likely scores: {}", scores.join(", "));
}

pub fn prediction(home: &str, away: &str, p: &PredictionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} v {}", home, away);
    prediction_lines(&mut out, p);
    if let Some(base) = &p.baseline {
        let _ = writeln!(out, "without changes:");
        prediction_lines(&mut out, base);
    }
    out
}

pub fn simulation(results: &[SimulationResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<24} {:>5} {:>7} {:>7} {:>7} {:>7}",
        "team", "pts", "avg", "title%", "top2%", "bot2%"
    );
    for r in results {
        let _ = writeln!(
            out,
            "{:<24} {:>5} {:>7.1} {:>7.1} {:>7.1} {:>7.1}",
            r.team, r.current_pts, r.avg_pts, r.p_title, r.p_top2, r.p_bot2
        );
    }
    out
}

pub fn leagues(c: &LeagueComparison, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} bridge players", c.bridges.len());
    for s in &c.strengths {
        let _ = writeln!(
            out,
            "  {:<20} x{:.3}  ({} bridges{})",
            s.league,
            s.multiplier,
            s.bridge_players,
            if s.anchored { "" } else { ", unanchored" }
        );
    }
    let _ = writeln!(out, "top players:");
    for p in c.players.iter().take(top) {
        let _ = writeln!(
            out,
            "  {:<20} {:<14} adj {:>5.1}%  normalized {:>5.1}",
            p.player, p.league, p.adjusted_pct, p.normalized_pct
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_met_message() {
        let h = HeadToHead::Players(H2HRecord {
            player_a: "Ann".into(),
            player_b: "Zed".into(),
            wins: 0,
            losses: 0,
        });
        assert_eq!(head_to_head(&h), "Ann and Zed have never met\n");
    }

    #[test]
    fn simulation_table_has_row_per_team() {
        let rows = vec![SimulationResult {
            team: "Red Lion".into(),
            current_pts: 10,
            avg_pts: 14.5,
            p_title: 60.0,
            p_top2: 90.0,
            p_bot2: 2.0,
        }];
        let text = simulation(&rows);
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Red Lion"));
    }
}
