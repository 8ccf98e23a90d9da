// Composite reports built from the ratings layer.

pub mod lineup;
pub mod scouting;
