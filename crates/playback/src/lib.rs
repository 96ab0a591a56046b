//! # Playback
//!
//! User-facing playback surface.
//!
//! Responsibilities:
//! - `PlaybackSession`: transport commands over one master stream
//! - `Viewer`: video selection, overlay toggling and age-group filtering
//!   over a preloaded `MediaCache`

pub mod error;
pub mod session;
pub mod viewer;

pub use error::{PlaybackError, Result};
pub use session::PlaybackSession;
pub use viewer::Viewer;
