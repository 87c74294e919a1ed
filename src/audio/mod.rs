//! # Audio Module
//!
//! Per-guild playback sessions for the bot.
//!
//! ## Architecture
//!
//! ### [`player`] - Music Player
//! - Entry point for every guild operation (enqueue, skip, stop, pause...)
//! - Drives the session state machine: Idle → Connecting → Playing → ...
//! - Reacts to end-of-track / error events coming from the voice transport
//!
//! ### [`queue`] - Track Queue
//! - FIFO of pending tracks, the active track is never in it
//!
//! ### [`session`] / [`registry`] - Session State
//! - One [`session::Session`] per guild, serialized by its own mutex
//! - The registry creates sessions lazily and drops them on stop
//!
//! ### [`progress`] - Progress Reporter
//! - Periodic progress bar edited in place in the text channel
//!
//! ### [`occupancy`] - Occupancy Monitor
//! - Grace-period auto-disconnect when the voice channel is left empty
//!
//! ## Concurrency
//!
//! Operations on different guilds never contend. Within a guild every
//! transition happens under the session lock, but the lock is released while
//! joining the channel, opening the stream or transcoding. Callbacks carry the
//! attempt `epoch` they were created for so that stale events are ignored.

pub mod occupancy;
pub mod player;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod session;

#[cfg(test)]
pub(crate) mod testing;

pub use player::{EnqueueContext, MusicPlayer, PlayerSettings};
pub use queue::{Track, TrackQueue};
pub use session::SessionState;
