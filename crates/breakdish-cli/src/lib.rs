// breakdish-cli: command-line host for the analytics engine.
//
// Loads a league directory of CSV exports, resolves config, runs engine
// operations and renders text or JSON.

pub mod commands;
pub mod dataset;
pub mod render;
pub mod settings;
