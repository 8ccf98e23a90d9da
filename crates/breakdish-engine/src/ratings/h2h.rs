// Head-to-head records between players and across squads.

use std::collections::HashMap;

use breakdish_core::model::{find_roster, normalize_name, Frame, TeamRoster};
use serde::Serialize;

/// Wins and losses of `player_a` against `player_b`, from A's side.
///
/// `h2h(a, b).wins == h2h(b, a).losses` always holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct H2HRecord {
    pub player_a: String,
    pub player_b: String,
    pub wins: u32,
    pub losses: u32,
}

impl H2HRecord {
    pub fn meetings(&self) -> u32 {
        self.wins + self.losses
    }

    /// Wins minus losses.
    pub fn advantage(&self) -> i64 {
        self.wins as i64 - self.losses as i64
    }
}

/// Count A's wins and losses against B over frames where they faced each
/// other. Forfeits are excluded.
pub fn h2h(player_a: &str, player_b: &str, frames: &[Frame]) -> H2HRecord {
    let mut rec = H2HRecord {
        player_a: player_a.to_string(),
        player_b: player_b.to_string(),
        wins: 0,
        losses: 0,
    };
    for f in frames.iter().filter(|f| !f.forfeit) {
        let (Some(side_a), Some(side_b)) = (f.side_of(player_a), f.side_of(player_b)) else {
            continue;
        };
        if side_a == side_b {
            continue;
        }
        if f.winner == side_a {
            rec.wins += 1;
        } else {
            rec.losses += 1;
        }
    }
    rec
}

/// Frame wins keyed by (winner, loser), normalized.
fn win_index(frames: &[Frame]) -> HashMap<(String, String), u32> {
    let mut index = HashMap::new();
    for f in frames.iter().filter(|f| !f.forfeit) {
        let winner = normalize_name(f.player(f.winner));
        let loser = normalize_name(f.player(f.winner.opposite()));
        if winner.is_empty() || loser.is_empty() || winner == loser {
            continue;
        }
        *index.entry((winner, loser)).or_insert(0) += 1;
    }
    index
}

/// Every pairing of team A's roster against team B's with at least one
/// meeting. Pairs that never met are omitted rather than reported as 0-0.
/// An unknown team yields no records.
pub fn squad_h2h(
    team_a: &str,
    team_b: &str,
    frames: &[Frame],
    rosters: &[TeamRoster],
) -> Vec<H2HRecord> {
    let (Some(roster_a), Some(roster_b)) = (find_roster(rosters, team_a), find_roster(rosters, team_b))
    else {
        return Vec::new();
    };

    let index = win_index(frames);
    let mut records = Vec::new();
    for a in &roster_a.players {
        let key_a = normalize_name(&a.name);
        for b in &roster_b.players {
            let key_b = normalize_name(&b.name);
            if key_a == key_b {
                continue;
            }
            let wins = index.get(&(key_a.clone(), key_b.clone())).copied().unwrap_or(0);
            let losses = index.get(&(key_b, key_a.clone())).copied().unwrap_or(0);
            if wins + losses == 0 {
                continue;
            }
            records.push(H2HRecord {
                player_a: a.name.clone(),
                player_b: b.name.clone(),
                wins,
                losses,
            });
        }
    }
    records
}

/// Net head-to-head advantage of `player` over everyone on `opponents`.
pub fn advantage_against(player: &str, opponents: &TeamRoster, frames: &[Frame]) -> i64 {
    opponents
        .players
        .iter()
        .map(|o| h2h(player, &o.name, frames).advantage())
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{frame, FrameBuilder};
    use breakdish_core::model::RosterEntry;

    fn roster(team: &str, names: &[&str]) -> TeamRoster {
        TeamRoster {
            team: team.into(),
            players: names.iter().map(|n| RosterEntry::new(n, None)).collect(),
        }
    }

    fn history() -> Vec<Frame> {
        vec![
            frame(FrameBuilder::new("Ann", "Bob").home_wins()),
            frame(FrameBuilder::new("Ann", "Bob").home_wins()),
            frame(FrameBuilder::new("Bob", "Ann").home_wins()),
            frame(FrameBuilder::new("Ann", "Cal").away_wins()),
            frame(FrameBuilder::new("Ann", "Bob").away_wins().forfeit()),
        ]
    }

    #[test]
    fn h2h_counts_from_a_side() {
        let rec = h2h("Ann", "Bob", &history());
        assert_eq!(rec.wins, 2);
        assert_eq!(rec.losses, 1);
        assert_eq!(rec.advantage(), 1);
    }

    #[test]
    fn h2h_is_symmetric() {
        let frames = history();
        for (a, b) in [("Ann", "Bob"), ("Ann", "Cal"), ("Bob", "Cal")] {
            let ab = h2h(a, b, &frames);
            let ba = h2h(b, a, &frames);
            assert_eq!(ab.wins, ba.losses);
            assert_eq!(ab.losses, ba.wins);
        }
    }

    #[test]
    fn h2h_without_meetings_is_empty_record() {
        let rec = h2h("Bob", "Cal", &history());
        assert_eq!(rec.meetings(), 0);
    }

    #[test]
    fn squad_h2h_omits_pairs_that_never_met() {
        let rosters = vec![roster("Red Lion", &["Ann", "Dee"]), roster("Crown", &["Bob", "Cal"])];
        let recs = squad_h2h("Red Lion", "Crown", &history(), &rosters);
        assert_eq!(recs.len(), 2);
        let ann_bob = recs.iter().find(|r| r.player_b == "Bob").unwrap();
        assert_eq!((ann_bob.wins, ann_bob.losses), (2, 1));
        let ann_cal = recs.iter().find(|r| r.player_b == "Cal").unwrap();
        assert_eq!((ann_cal.wins, ann_cal.losses), (0, 1));
        assert!(recs.iter().all(|r| r.player_a != "Dee"));
    }

    #[test]
    fn squad_h2h_matches_pairwise_h2h() {
        let frames = history();
        let rosters = vec![roster("Red Lion", &["Ann"]), roster("Crown", &["Bob", "Cal"])];
        for rec in squad_h2h("Red Lion", "Crown", &frames, &rosters) {
            let direct = h2h(&rec.player_a, &rec.player_b, &frames);
            assert_eq!(rec, direct);
        }
    }

    #[test]
    fn squad_h2h_unknown_team_is_empty() {
        let rosters = vec![roster("Red Lion", &["Ann"])];
        assert!(squad_h2h("Red Lion", "Nowhere", &history(), &rosters).is_empty());
    }

    #[test]
    fn advantage_sums_over_roster() {
        let opponents = roster("Crown", &["Bob", "Cal"]);
        assert_eq!(advantage_against("Ann", &opponents, &history()), 0);
    }
}
