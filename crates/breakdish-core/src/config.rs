// Engine configuration loading and validation (breakdish.toml).
//
// Every section and field is optional in the file; missing values fall back
// to the built-in defaults, which are also what `EngineConfig::default()`
// returns.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub ratings: RatingsConfig,
    pub form: FormConfig,
    pub scouting: ScoutingConfig,
    pub lineup: LineupConfig,
    pub prediction: PredictionConfig,
    pub simulation: SimulationConfig,
    pub cross_league: CrossLeagueConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Shrinkage prior for Bayesian-adjusted win rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RatingsConfig {
    /// League-average win rate the estimate is pulled toward (0-1).
    pub prior_mean: f64,
    /// Pseudo-count: how many frames' worth of belief the prior carries.
    pub prior_weight: f64,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        RatingsConfig {
            prior_mean: 0.5,
            prior_weight: 7.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub short_window: usize,
    pub long_window: usize,
    /// Percentage points the short window must beat (or trail) the season
    /// rate by to count as hot (or cold).
    pub trend_threshold: f64,
    /// Set bias (percentage points) under which set performance is "even".
    pub even_bias: f64,
}

impl Default for FormConfig {
    fn default() -> Self {
        FormConfig {
            short_window: 5,
            long_window: 10,
            trend_threshold: 15.0,
            even_bias: 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutingConfig {
    pub top_n: usize,
}

impl Default for ScoutingConfig {
    fn default() -> Self {
        ScoutingConfig { top_n: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineupConfig {
    pub slots_per_set: usize,
    pub adj_weight: f64,
    pub form_weight: f64,
    pub h2h_weight: f64,
    /// Games at a venue before the home/away split is trusted.
    pub min_venue_games: u32,
}

impl Default for LineupConfig {
    fn default() -> Self {
        LineupConfig {
            slots_per_set: 5,
            adj_weight: 0.6,
            form_weight: 0.3,
            h2h_weight: 0.02,
            min_venue_games: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictionConfig {
    pub frames_per_match: u32,
    /// Home advantage added to the frame win log-odds. Zero disables it.
    pub home_advantage: f64,
    /// How many most-likely scorelines to report.
    pub top_scores: usize,
    /// Size of the top group used to scale squad override deltas.
    pub override_top_n: usize,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        PredictionConfig {
            frames_per_match: 10,
            home_advantage: 0.15,
            top_scores: 5,
            override_top_n: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub iterations: usize,
    /// Fixed seed for reproducible runs. Unseeded runs draw from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            iterations: 1000,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossLeagueConfig {
    /// Frames a player needs in each league to count as a bridge.
    pub min_games: u32,
    /// Bridge players a league pair needs before its ratio is used.
    pub min_bridge_players: usize,
    pub reference_league: Option<String>,
}

impl Default for CrossLeagueConfig {
    fn default() -> Self {
        CrossLeagueConfig {
            min_games: 5,
            min_bridge_players: 3,
            reference_league: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate an engine config file.
pub fn load_config_from(path: &Path) -> Result<EngineConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    parse_config_at(&text, path)
}

/// Parse and validate config text that did not come from a file.
pub fn parse_config(text: &str) -> Result<EngineConfig, ConfigError> {
    parse_config_at(text, Path::new("<inline>"))
}

fn parse_config_at(text: &str, path: &Path) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: String) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message,
    }
}

pub fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let r = &config.ratings;
    if !(0.0..=1.0).contains(&r.prior_mean) {
        return Err(invalid(
            "ratings.prior_mean",
            format!("must be between 0.0 and 1.0 inclusive, got {}", r.prior_mean),
        ));
    }
    if !r.prior_weight.is_finite() || r.prior_weight < 0.0 {
        return Err(invalid(
            "ratings.prior_weight",
            format!("must be >= 0, got {}", r.prior_weight),
        ));
    }

    let f = &config.form;
    if f.short_window == 0 || f.long_window == 0 {
        return Err(invalid("form.short_window", "windows must be > 0".into()));
    }
    if f.short_window > f.long_window {
        return Err(invalid(
            "form.short_window",
            format!(
                "must not exceed form.long_window ({} > {})",
                f.short_window, f.long_window
            ),
        ));
    }
    if !f.trend_threshold.is_finite() || f.trend_threshold < 0.0 {
        return Err(invalid(
            "form.trend_threshold",
            format!("must be >= 0, got {}", f.trend_threshold),
        ));
    }

    let l = &config.lineup;
    if l.slots_per_set == 0 {
        return Err(invalid("lineup.slots_per_set", "must be > 0".into()));
    }
    let weight_fields: &[(&str, f64)] = &[
        ("lineup.adj_weight", l.adj_weight),
        ("lineup.form_weight", l.form_weight),
        ("lineup.h2h_weight", l.h2h_weight),
    ];
    for (name, val) in weight_fields {
        if !val.is_finite() {
            return Err(invalid(name, format!("must be finite, got {val}")));
        }
    }

    let p = &config.prediction;
    if p.frames_per_match == 0 {
        return Err(invalid("prediction.frames_per_match", "must be > 0".into()));
    }
    if !p.home_advantage.is_finite() {
        return Err(invalid(
            "prediction.home_advantage",
            format!("must be finite, got {}", p.home_advantage),
        ));
    }

    if config.simulation.iterations == 0 {
        return Err(invalid("simulation.iterations", "must be > 0".into()));
    }

    if config.cross_league.min_bridge_players < 2 {
        return Err(invalid(
            "cross_league.min_bridge_players",
            format!(
                "must be at least 2, got {}",
                config.cross_league.min_bridge_players
            ),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
