//! # Media Factory
//!
//! Media backend and preloading module.
//!
//! Responsibilities:
//! - Open `StreamHandle`s through a `StreamBackend`
//! - Preload every manifest resource so attach is near-instant
//! - Lend idle handles to the sync controller and take them back
//! - Provide a deterministic simulated backend for tests and the CLI

pub mod cache;
pub mod simulated_backend;
pub mod simulated_stream;

pub use cache::MediaCache;
pub use contracts::{StreamBackend, StreamHandle};
pub use simulated_backend::SimulatedBackend;
pub use simulated_stream::{CommandLog, SimulatedStream, SimulatedStreamConfig, StreamProbe};
