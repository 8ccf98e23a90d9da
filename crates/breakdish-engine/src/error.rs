// Caller errors the engine reports instead of absorbing.
//
// Missing or thin data is never an error: those paths return zeroed stats or
// empty collections. Only malformed requests end up here.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("unknown team: {0}")]
    UnknownTeam(String),

    #[error("nothing to simulate: no remaining fixtures and no standings")]
    EmptySimulation,

    #[error("fixture {home} v {away} references a team missing from the standings")]
    UnresolvedFixture { home: String, away: String },

    #[error("simulation cancelled")]
    Cancelled,
}
