// breakdish entry point.
//
// 1. Parse arguments
// 2. Initialize tracing (stderr, so stdout stays clean for --json)
// 3. Resolve config
// 4. Load the dataset and run the requested command

use std::path::PathBuf;

use anyhow::Context;
use breakdish_cli::commands::{self, Session};
use breakdish_cli::render;
use clap::{Parser, Subcommand};
use tracing::info;

/// Workspace crates log at info; dependencies only warn.
const DEFAULT_LOG_FILTER: &str = "breakdish=info,breakdish_cli=info,breakdish_engine=info,breakdish_core=info,warn";

#[derive(Parser)]
#[command(name = "breakdish")]
#[command(about = "Pool league analytics: ratings, scouting, predictions and season projections")]
struct Cli {
    /// League data directory (frames.csv, results.csv, rosters.csv, fixtures.csv)
    #[arg(short, long, global = true, default_value = ".")]
    data: PathBuf,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Season profile for a player
    Player { name: String },
    /// Head-to-head between two players, or two squads
    H2h { a: String, b: String },
    /// Scouting report for an opponent
    Scout { team: String },
    /// Suggested Set 1 / Set 2 lineup
    Lineup {
        team: String,
        opponent: String,
        /// Playing away from home
        #[arg(long)]
        away: bool,
    },
    /// Predict a fixture, optionally with squad changes
    Predict {
        home: String,
        away: String,
        /// Add a player to a squad (TEAM:PLAYER), repeatable
        #[arg(long = "add", value_name = "TEAM:PLAYER")]
        add: Vec<String>,
        /// Remove a player from a squad (TEAM:PLAYER), repeatable
        #[arg(long = "remove", value_name = "TEAM:PLAYER")]
        remove: Vec<String>,
    },
    /// Monte Carlo projection of the rest of the season
    Simulate {
        /// Override the configured iteration count
        #[arg(long)]
        iterations: Option<usize>,
        /// Fixed seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Restrict to one division
        #[arg(long)]
        division: Option<String>,
    },
    /// Compare players across league directories
    Leagues {
        #[arg(required = true, num_args = 2..)]
        dirs: Vec<PathBuf>,
        /// Players to list
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let mut config = breakdish_cli::settings::resolve_config(cli.config.as_deref())?;

    let output = match cli.command {
        Commands::Leagues { dirs, top } => {
            let comparison = commands::compare_leagues(dirs.as_slice(), &config)?;
            if cli.json {
                render::json(&comparison)?
            } else {
                render::leagues(&comparison, top)
            }
        }
        Commands::Simulate {
            iterations,
            seed,
            division,
        } => {
            if let Some(n) = iterations {
                config.simulation.iterations = n.max(1);
            }
            if seed.is_some() {
                config.simulation.seed = seed;
            }
            let session = Session::open(&cli.data, config)?;
            let results = commands::simulate(&session, division.as_deref())
                .await
                .context("season simulation did not complete")?;
            if cli.json {
                render::json(&results)?
            } else {
                render::simulation(&results)
            }
        }
        command => {
            let mut session = Session::open(&cli.data, config)?;
            run_query(&mut session, command, cli.json)?
        }
    };

    print!("{}", output);
    info!("done");
    Ok(())
}

/// Commands that read the dataset and return immediately.
fn run_query(session: &mut Session, command: Commands, json: bool) -> anyhow::Result<String> {
    let text = match command {
        Commands::Player { name } => {
            let p = commands::player_profile(session, &name);
            if json { render::json(&p)? } else { render::player(&p) }
        }
        Commands::H2h { a, b } => {
            let h = commands::head_to_head(session, &a, &b);
            if json { render::json(&h)? } else { render::head_to_head(&h) }
        }
        Commands::Scout { team } => {
            let r = commands::scout(session, &team);
            if json { render::json(&r)? } else { render::scouting(&r) }
        }
        Commands::Lineup { team, opponent, away } => {
            let s = commands::lineup(session, &team, &opponent, !away);
            if json { render::json(&s)? } else { render::lineup(&s) }
        }
        Commands::Predict {
            home,
            away,
            add,
            remove,
        } => {
            let overrides = commands::build_overrides(&add, &remove)?;
            let p = commands::predict(session, &home, &away, &overrides)?;
            if json { render::json(&p)? } else { render::prediction(&home, &away, &p) }
        }
        Commands::Simulate { .. } | Commands::Leagues { .. } => {
            anyhow::bail!("command needs the async runner")
        }
    };
    Ok(text)
}

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn default_filter_covers_every_workspace_crate() {
        assert!(EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        for target in ["breakdish_cli", "breakdish_engine", "breakdish_core"] {
            assert!(
                DEFAULT_LOG_FILTER.contains(&format!("{target}=info")),
                "{target} missing from default filter"
            );
        }
    }
}
