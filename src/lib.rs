//! # Guild Player
//!
//! Per-guild audio playback sessions for a Discord bot: a FIFO queue per
//! guild, a playback state machine, an in-place progress bar and automatic
//! disconnect when the voice channel is left empty.
//!
//! The crate is split between the session logic ([`audio`]) and the
//! collaborators it drives through traits: [`sources`] (yt-dlp + ffmpeg),
//! [`voice`] (songbird) and [`ui`] (serenity text channels).

pub mod audio;
pub mod bot;
pub mod config;
pub mod error;
pub mod sources;
pub mod ui;
pub mod voice;

pub use audio::{EnqueueContext, MusicPlayer, PlayerSettings, SessionState, Track};
pub use config::Config;
pub use error::{PlayerError, Result};
