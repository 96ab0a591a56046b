//! StreamHandle trait - playable media resource abstraction
//!
//! Defines the capability surface every media backend must provide so that the
//! sync controller can drive master and overlay streams without knowing the
//! concrete decoder.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{ContractError, StreamId};

/// Default playback rate
pub const UNIT_RATE: f64 = 1.0;

/// Loading state of a media resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyState {
    /// Not asked to load yet
    #[default]
    Unloaded,
    /// Load in progress
    Loading,
    /// Enough data buffered to play and seek
    Ready,
    /// Resource will never become ready without being reopened
    Errored,
}

impl ReadyState {
    /// Whether the resource is usable for playback
    pub fn is_ready(self) -> bool {
        matches!(self, ReadyState::Ready)
    }
}

/// Events emitted by a stream handle
///
/// These map one-to-one onto the media element events of a browser host:
/// `loadeddata`, `play`, `pause`, `seeked`, `ratechange` and `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Resource reached `Ready`
    Loaded,
    /// Playback started
    PlayingStarted,
    /// Playback stopped
    PlayingStopped,
    /// A seek completed (scrub, frame step or loop wrap)
    PositionJumped { position: f64 },
    /// Playback rate changed
    RateChanged { rate: f64 },
    /// Resource failed
    Error { message: String },
}

/// Event together with the stream that emitted it
#[derive(Debug, Clone, PartialEq)]
pub struct StreamNotification {
    pub stream_id: StreamId,
    pub event: StreamEvent,
}

/// Event callback type
///
/// Called synchronously by the backend while it mutates the stream. Callbacks
/// must return immediately; consumers typically forward into a queue.
pub type StreamEventCallback = Arc<dyn Fn(StreamNotification) + Send + Sync>;

/// Handle returned by [`StreamHandle::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Playable media resource
///
/// Implemented by real decoders and by the simulated backend. A handle is
/// owned by exactly one component at a time (cache while idle, controller
/// while attached), so mutation goes through `&mut self`.
///
/// # Example
///
/// ```ignore
/// let mut stream: Box<dyn StreamHandle> = backend.open("base".into(), "/videos/event01.mp4");
/// stream.subscribe(Arc::new(|n| println!("{} -> {:?}", n.stream_id, n.event)));
/// stream.load();
/// stream.play()?;
/// ```
pub trait StreamHandle: Send {
    /// Resource id
    fn stream_id(&self) -> &StreamId;

    /// Opaque source path the handle was opened with
    fn source_path(&self) -> &str;

    /// Current loading state
    fn ready_state(&self) -> ReadyState;

    /// Begin loading. Completion is reported through `Loaded` or `Error`.
    ///
    /// Calling `load` on a handle that is already loading or ready is a no-op.
    fn load(&mut self);

    /// Start playback
    ///
    /// # Errors
    /// `PlaybackStart` when the runtime refuses, `ResourceLoad` when errored.
    fn play(&mut self) -> Result<(), ContractError>;

    /// Stop playback. Pausing a paused stream emits nothing.
    fn pause(&mut self);

    /// Whether the stream is currently playing
    fn is_playing(&self) -> bool;

    /// Current media time in seconds
    fn position(&self) -> f64;

    /// Jump to a media time in seconds
    ///
    /// # Errors
    /// `Seek` when the position cannot be applied.
    fn seek(&mut self, position: f64) -> Result<(), ContractError>;

    /// Current playback rate
    fn rate(&self) -> f64;

    /// Change the playback rate. Setting the current rate emits nothing.
    fn set_rate(&mut self, rate: f64);

    /// Whether audio output is muted
    fn is_muted(&self) -> bool;

    /// Mute or unmute audio output
    fn set_muted(&mut self, muted: bool);

    /// Media duration in seconds, once known
    fn duration(&self) -> Option<f64>;

    /// Register an event callback
    fn subscribe(&mut self, callback: StreamEventCallback) -> SubscriptionId;

    /// Remove an event callback. Unknown ids are ignored.
    fn unsubscribe(&mut self, subscription: SubscriptionId);
}

impl fmt::Debug for dyn StreamHandle + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("stream_id", self.stream_id())
            .field("source_path", &self.source_path())
            .field("ready_state", &self.ready_state())
            .field("position", &self.position())
            .field("rate", &self.rate())
            .field("playing", &self.is_playing())
            .finish()
    }
}

/// Stream backend
///
/// Opens handles for resource descriptors. The source path is opaque to
/// everything above the backend.
pub trait StreamBackend {
    /// Open a handle in the `Unloaded` state
    fn open(&self, stream_id: StreamId, source_path: &str) -> Box<dyn StreamHandle>;
}
