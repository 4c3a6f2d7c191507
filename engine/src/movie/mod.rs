//! Cinematic playback.
//!
//! This module plays the game's motion-video cutscenes. It consists of
//! several submodules:
//!
//! - `codec`: contract with the external decoder
//! - `scaler`: output geometry and nearest-neighbour resampling
//! - `blit`: frame delivery to the screen, window or alpha overlay
//! - `subtitles`: sidecar caption loading and rendering
//! - `alpha`: alpha-masked compositing over existing UI
//! - `frames`: last-frame cache kept across sessions
//! - `stats`: per-session frame statistics
//! - `player`: the playback state machine tying it together
//! - `sequence`: several movies played back to back
//!
//! # Tick flow
//!
//! 1. The application calls [`MoviePlayer::update`] once per tick
//! 2. The player reads the next alpha record and steps the decoder
//! 3. The decoder hands the frame to the sink, which blits it
//! 4. Due subtitles are drawn under the video
//! 5. The screen is presented

mod alpha;
mod blit;
mod codec;
mod frames;
mod player;
mod scaler;
mod sequence;
mod stats;
mod subtitles;

pub use alpha::AlphaOverlay;
pub use blit::{BlitMode, DirectOptions, FrameGeometry, PaletteSetter, PlaybackSink, SinkReport};
pub use codec::{
    DecodedFrame, FrameCounts, FrameSink, MovieDecoder, SILENT_CENTIBELS, StepOutcome,
    hmi_to_decibels,
};
pub use frames::LastFrameCache;
pub use player::{FrameHook, MoviePlayer, PlayerSettings, SubtitlePathBuilder};
pub use scaler::{FrameLayout, compute_layout, effective_margin, resample_into, resample_nearest};
pub use sequence::MovieSequence;
pub use stats::PlaybackStats;
pub use subtitles::{
    SUBTITLE_PADDING, SubtitleBand, SubtitleEntry, SubtitleQueue, parse_line, render_due,
    subtitle_path_for,
};
