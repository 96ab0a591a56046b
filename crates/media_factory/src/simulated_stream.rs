//! Simulated media stream
//!
//! Implements `StreamHandle` on top of a virtual clock. Used for testing and
//! for the CLI when no real decoder is available.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{
    ContractError, ReadyState, StreamEvent, StreamEventCallback, StreamHandle, StreamId,
    StreamNotification, SubscriptionId, UNIT_RATE,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Simulated stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedStreamConfig {
    /// Media duration (None = unknown/unbounded)
    pub duration_s: Option<f64>,
    /// Virtual seconds between `load()` and `Loaded` (0 = synchronous)
    pub load_delay_s: f64,
    /// Loading always ends in `Errored`
    pub fail_load: bool,
    /// `play()` is refused (autoplay policy)
    pub reject_play: bool,
    /// `seek()` is refused
    pub fail_seek: bool,
    /// Wrap to 0 at the end instead of stopping
    pub looping: bool,
    /// Multiplier on the playback rate, models an independently clocked decoder
    pub clock_skew: f64,
}

impl Default for SimulatedStreamConfig {
    fn default() -> Self {
        Self {
            duration_s: Some(60.0),
            load_delay_s: 0.0,
            fail_load: false,
            reject_play: false,
            fail_seek: false,
            looping: false,
            clock_skew: 1.0,
        }
    }
}

/// Commands received by a stream, for inspecting controller behavior
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandLog {
    pub load: u64,
    pub play: u64,
    pub pause: u64,
    pub seek: u64,
    pub set_rate: u64,
}

impl CommandLog {
    /// Total number of commands
    pub fn total(&self) -> u64 {
        self.load + self.play + self.pause + self.seek + self.set_rate
    }
}

pub(crate) struct StreamState {
    config: SimulatedStreamConfig,
    ready_state: ReadyState,
    load_remaining: f64,
    position: f64,
    rate: f64,
    playing: bool,
    muted: bool,
    commands: CommandLog,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, StreamEventCallback)>,
}

impl fmt::Debug for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamState")
            .field("ready_state", &self.ready_state)
            .field("position", &self.position)
            .field("rate", &self.rate)
            .field("playing", &self.playing)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

pub(crate) type SharedState = Arc<Mutex<StreamState>>;

fn lock(state: &Mutex<StreamState>) -> MutexGuard<'_, StreamState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated stream
///
/// Position only advances through [`SimulatedStream::advance`], which the
/// [`SimulatedBackend`](crate::SimulatedBackend) calls for every live stream.
/// Events are delivered synchronously to subscribers after the state lock is
/// released.
pub struct SimulatedStream {
    stream_id: StreamId,
    source_path: String,
    state: SharedState,
}

impl fmt::Debug for SimulatedStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedStream")
            .field("stream_id", &self.stream_id)
            .field("source_path", &self.source_path)
            .field("state", &*lock(&self.state))
            .finish()
    }
}

impl SimulatedStream {
    /// Create a new simulated stream in the `Unloaded` state
    pub fn new(
        stream_id: StreamId,
        source_path: impl Into<String>,
        config: SimulatedStreamConfig,
    ) -> Self {
        let state = StreamState {
            config,
            ready_state: ReadyState::Unloaded,
            load_remaining: 0.0,
            position: 0.0,
            rate: UNIT_RATE,
            playing: false,
            muted: false,
            commands: CommandLog::default(),
            next_subscription: 1,
            subscribers: Vec::new(),
        };
        Self {
            stream_id,
            source_path: source_path.into(),
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Create a simulated stream with default configuration
    pub fn with_defaults(stream_id: StreamId, source_path: impl Into<String>) -> Self {
        Self::new(stream_id, source_path, SimulatedStreamConfig::default())
    }

    pub(crate) fn shared_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    /// Read-only view that survives moving the stream into a `Box<dyn StreamHandle>`
    pub fn probe(&self) -> StreamProbe {
        StreamProbe {
            stream_id: self.stream_id.clone(),
            state: self.shared_state(),
        }
    }

    /// Advance the virtual clock by `dt` seconds
    pub fn advance(&self, dt: f64) {
        advance_state(&self.stream_id, &self.state, dt);
    }

    fn emit(&self, events: Vec<StreamEvent>) {
        dispatch(&self.stream_id, &self.state, events);
    }
}

/// Advance one stream's clock and deliver resulting events
pub(crate) fn advance_state(stream_id: &StreamId, state: &SharedState, dt: f64) {
    if dt <= 0.0 || !dt.is_finite() {
        return;
    }

    let mut events = Vec::new();
    {
        let mut s = lock(state);

        if s.ready_state == ReadyState::Loading {
            s.load_remaining -= dt;
            if s.load_remaining <= 0.0 {
                events.push(finish_load(&mut s));
            }
        }

        if s.playing && s.ready_state.is_ready() {
            s.position += dt * s.rate * s.config.clock_skew;
            if let Some(duration) = s.config.duration_s {
                if s.position >= duration {
                    if s.config.looping && duration > 0.0 {
                        s.position %= duration;
                        events.push(StreamEvent::PositionJumped {
                            position: s.position,
                        });
                    } else {
                        s.position = duration;
                        s.playing = false;
                        events.push(StreamEvent::PlayingStopped);
                    }
                }
            }
        }
    }

    dispatch(stream_id, state, events);
}

fn finish_load(s: &mut StreamState) -> StreamEvent {
    if s.config.fail_load {
        s.ready_state = ReadyState::Errored;
        s.playing = false;
        StreamEvent::Error {
            message: "media resource could not be decoded".to_string(),
        }
    } else {
        s.ready_state = ReadyState::Ready;
        StreamEvent::Loaded
    }
}

fn dispatch(stream_id: &StreamId, state: &SharedState, events: Vec<StreamEvent>) {
    if events.is_empty() {
        return;
    }

    let callbacks: Vec<StreamEventCallback> = lock(state)
        .subscribers
        .iter()
        .map(|(_, cb)| Arc::clone(cb))
        .collect();

    for event in events {
        trace!(stream_id = %stream_id, event = ?event, "simulated stream event");
        for callback in &callbacks {
            callback(StreamNotification {
                stream_id: stream_id.clone(),
                event: event.clone(),
            });
        }
    }
}

impl StreamHandle for SimulatedStream {
    fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    fn source_path(&self) -> &str {
        &self.source_path
    }

    fn ready_state(&self) -> ReadyState {
        lock(&self.state).ready_state
    }

    fn load(&mut self) {
        let event = {
            let mut s = lock(&self.state);
            s.commands.load += 1;
            match s.ready_state {
                ReadyState::Loading | ReadyState::Ready => None,
                ReadyState::Unloaded | ReadyState::Errored => {
                    s.ready_state = ReadyState::Loading;
                    s.load_remaining = s.config.load_delay_s;
                    if s.load_remaining <= 0.0 {
                        Some(finish_load(&mut s))
                    } else {
                        None
                    }
                }
            }
        };
        debug!(stream_id = %self.stream_id, source = %self.source_path, "load requested");
        self.emit(event.into_iter().collect());
    }

    fn play(&mut self) -> Result<(), ContractError> {
        let event = {
            let mut s = lock(&self.state);
            s.commands.play += 1;
            if s.ready_state == ReadyState::Errored {
                return Err(ContractError::resource_load(
                    self.stream_id.as_str(),
                    "resource errored",
                ));
            }
            if s.config.reject_play {
                return Err(ContractError::playback_start(
                    self.stream_id.as_str(),
                    "play() request was denied by the runtime",
                ));
            }
            if s.playing {
                None
            } else {
                s.playing = true;
                Some(StreamEvent::PlayingStarted)
            }
        };
        self.emit(event.into_iter().collect());
        Ok(())
    }

    fn pause(&mut self) {
        let event = {
            let mut s = lock(&self.state);
            s.commands.pause += 1;
            if s.playing {
                s.playing = false;
                Some(StreamEvent::PlayingStopped)
            } else {
                None
            }
        };
        self.emit(event.into_iter().collect());
    }

    fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    fn position(&self) -> f64 {
        lock(&self.state).position
    }

    fn seek(&mut self, position: f64) -> Result<(), ContractError> {
        let event = {
            let mut s = lock(&self.state);
            s.commands.seek += 1;
            if !position.is_finite() {
                return Err(ContractError::seek(
                    self.stream_id.as_str(),
                    format!("position {position} is not finite"),
                ));
            }
            if s.config.fail_seek || s.ready_state == ReadyState::Errored {
                return Err(ContractError::seek(
                    self.stream_id.as_str(),
                    "stream refused position change",
                ));
            }
            let upper = s.config.duration_s.unwrap_or(f64::MAX);
            s.position = position.clamp(0.0, upper);
            StreamEvent::PositionJumped {
                position: s.position,
            }
        };
        self.emit(vec![event]);
        Ok(())
    }

    fn rate(&self) -> f64 {
        lock(&self.state).rate
    }

    fn set_rate(&mut self, rate: f64) {
        let event = {
            let mut s = lock(&self.state);
            s.commands.set_rate += 1;
            if !(rate.is_finite() && rate > 0.0) || rate == s.rate {
                None
            } else {
                s.rate = rate;
                Some(StreamEvent::RateChanged { rate })
            }
        };
        self.emit(event.into_iter().collect());
    }

    fn is_muted(&self) -> bool {
        lock(&self.state).muted
    }

    fn set_muted(&mut self, muted: bool) {
        lock(&self.state).muted = muted;
    }

    fn duration(&self) -> Option<f64> {
        let s = lock(&self.state);
        if s.ready_state.is_ready() {
            s.config.duration_s
        } else {
            None
        }
    }

    fn subscribe(&mut self, callback: StreamEventCallback) -> SubscriptionId {
        let mut s = lock(&self.state);
        let id = SubscriptionId(s.next_subscription);
        s.next_subscription += 1;
        s.subscribers.push((id, callback));
        id
    }

    fn unsubscribe(&mut self, subscription: SubscriptionId) {
        lock(&self.state)
            .subscribers
            .retain(|(id, _)| *id != subscription);
    }
}

/// Read-only view of a simulated stream
///
/// Tests keep a probe after handing the stream to the cache or controller.
#[derive(Clone)]
pub struct StreamProbe {
    stream_id: StreamId,
    state: SharedState,
}

impl fmt::Debug for StreamProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamProbe")
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

impl StreamProbe {
    pub(crate) fn new(stream_id: StreamId, state: SharedState) -> Self {
        Self { stream_id, state }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn position(&self) -> f64 {
        lock(&self.state).position
    }

    pub fn rate(&self) -> f64 {
        lock(&self.state).rate
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.state).playing
    }

    pub fn is_muted(&self) -> bool {
        lock(&self.state).muted
    }

    pub fn ready_state(&self) -> ReadyState {
        lock(&self.state).ready_state
    }

    pub fn commands(&self) -> CommandLog {
        lock(&self.state).commands
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.state).subscribers.len()
    }

    /// Move the position without emitting an event, to inject drift
    pub fn nudge(&self, delta: f64) {
        let mut s = lock(&self.state);
        s.position = (s.position + delta).max(0.0);
    }

    /// Change failure injection at runtime
    pub fn reconfigure(&self, update: impl FnOnce(&mut SimulatedStreamConfig)) {
        update(&mut lock(&self.state).config);
    }
}
