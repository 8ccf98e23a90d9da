// Player-level analytics: counting stats, form and head-to-head.
//
// Nothing in here depends on the reports or forecast layers.

pub mod form;
pub mod h2h;
pub mod stats;
