// Dataset loading from a directory of CSV exports.
//
// Expected files: frames.csv, results.csv, rosters.csv and, optionally,
// fixtures.csv. Malformed rows are logged and skipped; a missing required
// file or an empty frame list is an error.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::io::Read;
use std::path::{Path, PathBuf};

use breakdish_core::model::{
    normalize_name, Fixture, Frame, LeagueDataset, MatchResult, PlayerSeasonStat, RosterEntry,
    SetNumber, Side, TeamRoster,
};
use breakdish_engine::ratings::stats::aggregate_all;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub const FRAMES_FILE: &str = "frames.csv";
pub const RESULTS_FILE: &str = "results.csv";
pub const ROSTERS_FILE: &str = "rosters.csv";
pub const FIXTURES_FILE: &str = "fixtures.csv";

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// A remaining fixture together with the division it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledFixture {
    pub division: String,
    pub fixture: Fixture,
}

/// Everything loaded from one league directory.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub frames: Vec<Frame>,
    pub results: Vec<MatchResult>,
    /// Rosters with each player's league season stat attached.
    pub rosters: Vec<TeamRoster>,
    pub fixtures: Vec<ScheduledFixture>,
    /// Content hash of the source files. Changes whenever the data does.
    pub version: u64,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawFrame {
    date: String,
    #[serde(default)]
    division: String,
    home_team: String,
    away_team: String,
    home_player: String,
    away_player: String,
    set: u8,
    winner: String,
    #[serde(default)]
    break_and_dish: String,
    #[serde(default)]
    forfeit: String,
    #[serde(default)]
    cup: String,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    date: String,
    #[serde(default)]
    division: String,
    home_team: String,
    away_team: String,
    home_score: u32,
    away_score: u32,
    #[serde(default)]
    cup: String,
}

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    team: String,
    player: String,
    #[serde(default)]
    prior_rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawFixture {
    #[serde(default)]
    division: String,
    home_team: String,
    away_team: String,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Lenient boolean column: blank is false.
fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" | "n" => Some(false),
        "1" | "true" | "yes" | "y" => Some(true),
        _ => None,
    }
}

fn parse_side(text: &str) -> Option<Side> {
    match text.trim().to_ascii_lowercase().as_str() {
        "home" | "h" => Some(Side::Home),
        "away" | "a" => Some(Side::Away),
        _ => None,
    }
}

fn flags(values: &[(&str, &str)], context: &str) -> Option<Vec<bool>> {
    let mut out = Vec::with_capacity(values.len());
    for (column, value) in values {
        match parse_flag(value) {
            Some(b) => out.push(b),
            None => {
                warn!("skipping {}: bad {} value '{}'", context, column, value);
                return None;
            }
        }
    }
    Some(out)
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_frames_from_reader<R: Read>(rdr: R) -> Result<Vec<Frame>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut frames = Vec::new();
    for result in reader.deserialize::<RawFrame>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed frame row: {}", e);
                continue;
            }
        };
        let context = format!("frame {} v {}", raw.home_player.trim(), raw.away_player.trim());
        let Some(date) = parse_date(&raw.date) else {
            warn!("skipping {}: bad date '{}'", context, raw.date);
            continue;
        };
        let Some(set) = SetNumber::from_index(raw.set) else {
            warn!("skipping {}: set must be 1 or 2, got {}", context, raw.set);
            continue;
        };
        let Some(winner) = parse_side(&raw.winner) else {
            warn!("skipping {}: winner must be home or away, got '{}'", context, raw.winner);
            continue;
        };
        let Some(f) = flags(
            &[
                ("break_and_dish", raw.break_and_dish.as_str()),
                ("forfeit", raw.forfeit.as_str()),
                ("cup", raw.cup.as_str()),
            ],
            &context,
        ) else {
            continue;
        };
        frames.push(Frame {
            date,
            division: raw.division.trim().to_string(),
            home_team: raw.home_team.trim().to_string(),
            away_team: raw.away_team.trim().to_string(),
            home_player: raw.home_player.trim().to_string(),
            away_player: raw.away_player.trim().to_string(),
            set,
            winner,
            break_and_dish: f[0],
            forfeit: f[1],
            cup: f[2],
        });
    }
    Ok(frames)
}

fn load_results_from_reader<R: Read>(rdr: R) -> Result<Vec<MatchResult>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut results = Vec::new();
    for result in reader.deserialize::<RawResult>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed result row: {}", e);
                continue;
            }
        };
        let context = format!("result {} v {}", raw.home_team.trim(), raw.away_team.trim());
        let Some(date) = parse_date(&raw.date) else {
            warn!("skipping {}: bad date '{}'", context, raw.date);
            continue;
        };
        let Some(f) = flags(&[("cup", raw.cup.as_str())], &context) else {
            continue;
        };
        results.push(MatchResult {
            date,
            division: raw.division.trim().to_string(),
            home_team: raw.home_team.trim().to_string(),
            away_team: raw.away_team.trim().to_string(),
            home_score: raw.home_score,
            away_score: raw.away_score,
            cup: f[0],
        });
    }
    Ok(results)
}

fn load_rosters_from_reader<R: Read>(rdr: R) -> Result<Vec<TeamRoster>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    // normalized team -> roster, in first-seen order
    let mut order: Vec<String> = Vec::new();
    let mut teams: BTreeMap<String, TeamRoster> = BTreeMap::new();
    for result in reader.deserialize::<RawRosterRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
                continue;
            }
        };
        let (team, player) = (raw.team.trim(), raw.player.trim());
        if team.is_empty() || player.is_empty() {
            warn!("skipping roster row with blank team or player");
            continue;
        }
        let key = normalize_name(team);
        let roster = teams.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            TeamRoster {
                team: team.to_string(),
                players: Vec::new(),
            }
        });
        if roster.contains(player) {
            warn!("duplicate roster entry for '{}' in {}", player, team);
            continue;
        }
        let mut entry = RosterEntry::new(player, None);
        entry.prior_rating = raw.prior_rating.filter(|r| r.is_finite());
        roster.players.push(entry);
    }
    Ok(order.iter().filter_map(|k| teams.remove(k)).collect())
}

fn load_fixtures_from_reader<R: Read>(rdr: R) -> Result<Vec<ScheduledFixture>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut fixtures = Vec::new();
    for result in reader.deserialize::<RawFixture>() {
        match result {
            Ok(raw) => fixtures.push(ScheduledFixture {
                division: raw.division.trim().to_string(),
                fixture: Fixture {
                    home: raw.home_team.trim().to_string(),
                    away: raw.away_team.trim().to_string(),
                },
            }),
            Err(e) => warn!("skipping malformed fixture row: {}", e),
        }
    }
    Ok(fixtures)
}

// ---------------------------------------------------------------------------
// File access
// ---------------------------------------------------------------------------

fn read_bytes(path: &Path) -> Result<Vec<u8>, DatasetError> {
    std::fs::read(path).map_err(|e| DatasetError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

fn csv_err(path: &Path) -> impl FnOnce(csv::Error) -> DatasetError + '_ {
    move |e| DatasetError::Csv {
        path: path.display().to_string(),
        source: e,
    }
}

/// Attach each rostered player's league season stat.
pub fn attach_stats(rosters: &mut [TeamRoster], stats: &BTreeMap<String, PlayerSeasonStat>) {
    for roster in rosters.iter_mut() {
        for entry in roster.players.iter_mut() {
            entry.stat = stats.get(&normalize_name(&entry.name)).cloned();
        }
    }
}

impl Dataset {
    /// Load a league directory.
    pub fn load(dir: &Path) -> Result<Dataset, DatasetError> {
        let mut hasher = DefaultHasher::new();
        let mut read = |file: &str| -> Result<Vec<u8>, DatasetError> {
            let bytes = read_bytes(&dir.join(file))?;
            file.hash(&mut hasher);
            bytes.hash(&mut hasher);
            Ok(bytes)
        };

        let frames_path = dir.join(FRAMES_FILE);
        let frames = load_frames_from_reader(read(FRAMES_FILE)?.as_slice()).map_err(csv_err(&frames_path))?;
        let results_path = dir.join(RESULTS_FILE);
        let results =
            load_results_from_reader(read(RESULTS_FILE)?.as_slice()).map_err(csv_err(&results_path))?;
        let rosters_path = dir.join(ROSTERS_FILE);
        let mut rosters =
            load_rosters_from_reader(read(ROSTERS_FILE)?.as_slice()).map_err(csv_err(&rosters_path))?;

        let fixtures_path = dir.join(FIXTURES_FILE);
        let fixtures = if fixtures_path.exists() {
            load_fixtures_from_reader(read(FIXTURES_FILE)?.as_slice()).map_err(csv_err(&fixtures_path))?
        } else {
            debug!("no {} in {}", FIXTURES_FILE, dir.display());
            Vec::new()
        };

        if frames.is_empty() {
            return Err(DatasetError::Validation(format!(
                "{} produced zero valid rows",
                frames_path.display()
            )));
        }

        attach_stats(&mut rosters, &aggregate_all(&frames, false));

        let name = dataset_name(dir);
        info!(
            "loaded {}: {} frames, {} results, {} teams, {} fixtures",
            name,
            frames.len(),
            results.len(),
            rosters.len(),
            fixtures.len()
        );
        Ok(Dataset {
            name,
            frames,
            results,
            rosters,
            fixtures,
            version: hasher.finish(),
        })
    }

    /// League season stats for every player who appears in a frame.
    pub fn season_stats(&self) -> Vec<PlayerSeasonStat> {
        aggregate_all(&self.frames, false).into_values().collect()
    }

    /// The player view used for cross-league work.
    pub fn league(&self) -> LeagueDataset {
        LeagueDataset {
            name: self.name.clone(),
            players: self.season_stats(),
        }
    }
}

fn dataset_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .or_else(|| {
            std::fs::canonicalize(dir)
                .ok()
                .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| PathBuf::from(dir).display().to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FRAMES: &str = "\
date,division,home_team,away_team,home_player,away_player,set,winner,break_and_dish,forfeit,cup
2025-01-06,Premier,Red Lion,Crown,Ann,Zed,1,home,1,,
06/01/2025,Premier,Red Lion,Crown,Bea,Yan,2,away,,0,
2025-01-13,Premier,Crown,Red Lion,Zed,Ann,1,sideways,,,
2025-01-13,Premier,Crown,Red Lion,Yan,Bea,3,home,,,
not-a-date,Premier,Crown,Red Lion,Yan,Bea,1,home,,,
2025-01-20,Premier,Crown,Red Lion,Yan,Bea,1,home,,yes,true
";

    #[test]
    fn frames_skip_bad_rows() {
        let frames = load_frames_from_reader(FRAMES.as_bytes()).unwrap();
        assert_eq!(frames.len(), 3);
        assert!(frames[0].break_and_dish);
        assert_eq!(frames[0].winner, Side::Home);
        assert_eq!(frames[1].date, NaiveDate::from_ymd_opt(2025, 1, 6).unwrap());
        assert_eq!(frames[1].set, SetNumber::Two);
        assert!(frames[2].forfeit && frames[2].cup);
    }

    #[test]
    fn results_parse_cup_flag() {
        let csv = "\
date,division,home_team,away_team,home_score,away_score,cup
2025-01-06,Premier,Red Lion,Crown,6,4,
2025-01-13,Premier,Crown,Red Lion,x,4,
2025-01-20,,Crown,Red Lion,5,5,1
";
        let results = load_results_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(!results[0].cup);
        assert!(results[1].cup);
    }

    #[test]
    fn rosters_group_by_team_in_file_order() {
        let csv = "\
team,player,prior_rating
Red Lion,Ann,
Crown,Zed,0.6
red lion,Bea,
Red Lion,ann,
";
        let rosters = load_rosters_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(rosters.len(), 2);
        assert_eq!(rosters[0].team, "Red Lion");
        assert_eq!(rosters[0].players.len(), 2);
        assert_eq!(rosters[1].players[0].prior_rating, Some(0.6));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag(""), Some(false));
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_side("A"), Some(Side::Away));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = read_bytes(Path::new("/definitely/not/here/frames.csv")).unwrap_err();
        assert!(matches!(err, DatasetError::Io { .. }));
    }
}
