//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Stream positions are media time in seconds (f64)
//! - Frame indices are derived from a single nominal frame rate per session

mod error;
mod manifest;
mod playback_config;
mod stream;
mod stream_id;
mod sync;

pub use error::*;
pub use manifest::*;
pub use playback_config::*;
pub use stream::*;
pub use stream_id::StreamId;
pub use sync::*;
