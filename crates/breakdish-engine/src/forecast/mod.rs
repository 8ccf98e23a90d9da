// Match prediction and season projection.

pub mod predict;
pub mod simulate;
