// Builders shared by the engine's unit tests.

use breakdish_core::model::{Frame, MatchResult, SetNumber, Side};
use chrono::NaiveDate;

pub fn approx_eq(a: f64, b: f64, eps: f64) -> bool {
    (a - b).abs() < eps
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(day as i64)
}

/// Fluent description of a frame. Defaults: Red Lion (home) v Crown (away),
/// set 1, day 0, home player wins, league frame.
pub struct FrameBuilder {
    frame: Frame,
}

impl FrameBuilder {
    pub fn new(home_player: &str, away_player: &str) -> Self {
        FrameBuilder {
            frame: Frame {
                date: date(0),
                division: "Premier".into(),
                home_team: "Red Lion".into(),
                away_team: "Crown".into(),
                home_player: home_player.into(),
                away_player: away_player.into(),
                set: SetNumber::One,
                winner: Side::Home,
                break_and_dish: false,
                forfeit: false,
                cup: false,
            },
        }
    }

    pub fn home_wins(mut self) -> Self {
        self.frame.winner = Side::Home;
        self
    }

    pub fn away_wins(mut self) -> Self {
        self.frame.winner = Side::Away;
        self
    }

    pub fn bd(mut self) -> Self {
        self.frame.break_and_dish = true;
        self
    }

    pub fn forfeit(mut self) -> Self {
        self.frame.forfeit = true;
        self
    }

    pub fn cup(mut self) -> Self {
        self.frame.cup = true;
        self
    }

    pub fn set2(mut self) -> Self {
        self.frame.set = SetNumber::Two;
        self
    }

    pub fn day(mut self, day: u32) -> Self {
        self.frame.date = date(day);
        self
    }

    pub fn teams(mut self, home: &str, away: &str) -> Self {
        self.frame.home_team = home.into();
        self.frame.away_team = away.into();
        self
    }
}

pub fn frame(builder: FrameBuilder) -> Frame {
    builder.frame
}

pub fn result(day: u32, home: &str, away: &str, home_score: u32, away_score: u32) -> MatchResult {
    MatchResult {
        date: date(day),
        division: "Premier".into(),
        home_team: home.into(),
        away_team: away.into(),
        home_score,
        away_score,
        cup: false,
    }
}
