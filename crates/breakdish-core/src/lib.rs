// Shared data model, configuration and caching for the breakdish workspace.

pub mod cache;
pub mod config;
pub mod model;
