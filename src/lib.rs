//! Cost-weighted 2D bin packing with guillotine cuts.
//!
//! Items are packed into heterogeneous bins, each with its own size and usage
//! cost. Bins are opened cheapest-per-area first and the engine never backtracks.

pub mod error;
pub mod guillotine;
pub mod input;
pub mod score;
pub mod solver;
pub mod types;
