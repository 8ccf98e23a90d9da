// breakdish-engine: pool league analytics.
//
// Pure, synchronous computations over the shared data model. Callers own
// loading, caching and presentation; nothing here does I/O.

pub mod cross_league;
pub mod error;
pub mod forecast;
pub mod ratings;
pub mod reports;

#[cfg(test)]
mod test_support;

pub use error::EngineError;
