//! Decoder contract.
//!
//! The motion-video decoder is an external component. The player drives it
//! through [`MovieDecoder`] and receives decoded frames and palette changes
//! through a [`FrameSink`] passed into every step.

use common::MovieError;
use std::io::Read;

use crate::config::MAX_VOLUME;

/// Quietest attenuation understood by the audio backend, in 1/100 dB
pub const SILENT_CENTIBELS: i32 = -10000;

/// A frame handed out by the decoder. `pixels` is tightly packed,
/// `src_w * src_h` palette indices.
#[derive(Debug, Clone, Copy)]
pub struct DecodedFrame<'a> {
    pub pixels: &'a [u8],
    pub src_w: i32,
    pub src_h: i32,
    pub src_x: i32,
    pub src_y: i32,
    pub dst_w: i32,
    pub dst_h: i32,
    pub dst_x: i32,
    pub dst_y: i32,
}

impl DecodedFrame<'_> {
    /// Whether the pixel slice holds the whole frame
    pub fn is_complete(&self) -> bool {
        self.src_w > 0
            && self.src_h > 0
            && self.pixels.len() >= self.src_w as usize * self.src_h as usize
    }
}

/// Receiver for decoder output
pub trait FrameSink {
    fn show_frame(&mut self, frame: &DecodedFrame<'_>);

    /// `palette` holds `count` 6-bit RGB triplets for entries starting at `start`
    fn set_palette(&mut self, palette: &[u8], start: usize, count: usize);
}

/// Result of decoding one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Frame,
    End,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCounts {
    pub shown: u64,
    pub dropped: u64,
}

pub trait MovieDecoder {
    fn set_screen_size(&mut self, width: i32, height: i32);

    /// Read the stream header and get ready to decode at `(x, y)`
    fn prepare(&mut self, stream: &mut dyn Read, x: i32, y: i32, flags: u32)
    -> Result<(), MovieError>;

    /// Decode one frame, delivering output to `sink`
    fn step(&mut self, stream: &mut dyn Read, sink: &mut dyn FrameSink) -> StepOutcome;

    fn frame_counts(&self) -> FrameCounts;

    /// Most recent decoded frame, valid until `release`
    fn frame_buffer(&self) -> Option<&[u8]>;

    /// Stop audio and finish the current movie
    fn end_movie(&mut self);

    /// Free every buffer the decoder allocated for the movie
    fn release(&mut self);

    /// Attenuation in 1/100 dB, `SILENT_CENTIBELS..=0`
    fn set_volume(&mut self, centibels: i32);
}

/// Convert the game's linear 0..=32767 volume into attenuation in 1/100 dB.
///
/// Every halving of the volume drops another 10 dB.
pub fn hmi_to_decibels(volume: i32) -> i32 {
    if volume <= 0 {
        return SILENT_CENTIBELS;
    }

    let volume = volume.min(MAX_VOLUME) as f64;
    let attenuation = -1000.0 * (MAX_VOLUME as f64 / volume).log2();
    (attenuation as i32).clamp(SILENT_CENTIBELS, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmi_to_decibels() {
        assert_eq!(hmi_to_decibels(0), SILENT_CENTIBELS);
        assert_eq!(hmi_to_decibels(-5), SILENT_CENTIBELS);
        assert_eq!(hmi_to_decibels(MAX_VOLUME), 0);
        assert_eq!(hmi_to_decibels(40000), 0);

        let half = hmi_to_decibels(MAX_VOLUME / 2);
        assert!((-1001..=-999).contains(&half), "got {}", half);

        assert_eq!(hmi_to_decibels(1), SILENT_CENTIBELS);
    }

    #[test]
    fn test_frame_completeness() {
        let pixels = [0u8; 6];
        let frame = DecodedFrame {
            pixels: &pixels,
            src_w: 3,
            src_h: 2,
            src_x: 0,
            src_y: 0,
            dst_w: 3,
            dst_h: 2,
            dst_x: 0,
            dst_y: 0,
        };
        assert!(frame.is_complete());

        let short = DecodedFrame { src_h: 3, ..frame };
        assert!(!short.is_complete());
    }
}
