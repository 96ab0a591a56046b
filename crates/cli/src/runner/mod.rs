//! Simulated playback run orchestration.

mod orchestrator;
mod stats;

pub use orchestrator::{RunConfig, Runner};
pub use stats::RunStats;
