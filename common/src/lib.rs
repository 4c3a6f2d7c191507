//! Common types shared by the isocine engine crates.
//!
//! This crate holds the small value types that cross module boundaries:
//! screen geometry, movie sizing modes, playback flags and the error
//! taxonomy reported by the movie subsystem.
//!
//! # Examples
//!
//! ```
//! use common::{MovieSizeMode, Rect};
//!
//! let rect = Rect::new(10, 20, 320, 200);
//! assert_eq!(rect.right(), 330);
//! assert_eq!(MovieSizeMode::from_index(1), MovieSizeMode::Aspect);
//! ```

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by the movie subsystem.
///
/// None of these are fatal to the process. The caller decides whether to
/// skip the cinematic or carry on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MovieError {
    /// Movie stream or a sidecar file is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unit of input (subtitle line, alpha record) could not be used
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// A buffer could not be allocated
    #[error("Out of memory: {0}")]
    ResourceExhausted(String),

    /// The decoder rejected the stream
    #[error("Stream fault: {0}")]
    StreamFault(String),

    /// A session is already open
    #[error("A movie is already playing")]
    Busy,

    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MovieError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(e.to_string()),
            _ => Self::Io(e.to_string()),
        }
    }
}

impl From<std::collections::TryReserveError> for MovieError {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted(e.to_string())
    }
}

/// Axis-aligned rectangle in pixels. `right()` and `bottom()` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn right(&self) -> i32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Move the rectangle by the given offset
    pub const fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Whether `other` lies fully inside this rectangle
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Overlapping part of two rectangles, `None` when they don't touch
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// How full-window movies are sized on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovieSizeMode {
    /// Source size, centred
    #[default]
    Native,
    /// Scale uniformly to the largest size that fits
    Aspect,
    /// Stretch to the full screen width
    Fullscreen,
}

impl MovieSizeMode {
    /// Map the legacy numeric setting (0, 1, 2) to a mode
    pub fn from_index(value: i32) -> Self {
        match value {
            1 => Self::Aspect,
            2 => Self::Fullscreen,
            _ => Self::Native,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Aspect => "aspect",
            Self::Fullscreen => "fullscreen",
        }
    }
}

bitflags! {
    /// Options the caller sets before starting a movie
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MovieFlags: u32 {
        /// Load and draw the subtitle sidecar for the next movie
        const ENABLE_SUBTITLES = 0x08;
    }
}

/// Coarse lifecycle state visible to the application layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Idle,
    Running,
    /// Stop was requested, teardown happens on the next update
    Stopping,
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    EndOfStream,
    Aborted,
    StreamFault,
}

/// Result of a single player tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is playing
    Idle,
    /// A frame was stepped and the session is still open
    Playing,
    /// The session was torn down during this tick
    Finished(FinishReason),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_edges() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert!(!rect.is_empty());
        assert!(Rect::new(0, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_rect_intersect() {
        let a = Rect::new(0, 0, 100, 100);
        let b = Rect::new(50, 60, 100, 100);
        assert_eq!(a.intersect(&b), Some(Rect::new(50, 60, 50, 40)));

        let c = Rect::new(100, 0, 10, 10);
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_rect_contains() {
        let outer = Rect::new(0, 0, 640, 480);
        assert!(outer.contains_rect(&Rect::new(0, 0, 640, 480)));
        assert!(outer.contains_rect(&Rect::new(10, 10, 20, 20)));
        assert!(!outer.contains_rect(&Rect::new(630, 10, 20, 20)));
    }

    #[test]
    fn test_size_mode_from_index() {
        assert_eq!(MovieSizeMode::from_index(0), MovieSizeMode::Native);
        assert_eq!(MovieSizeMode::from_index(1), MovieSizeMode::Aspect);
        assert_eq!(MovieSizeMode::from_index(2), MovieSizeMode::Fullscreen);
        assert_eq!(MovieSizeMode::from_index(7), MovieSizeMode::Native);
        assert_eq!(MovieSizeMode::from_index(-1), MovieSizeMode::Native);
    }

    #[test]
    fn test_size_mode_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            size: MovieSizeMode,
        }

        let parsed: Wrapper = toml::from_str("size = \"fullscreen\"").unwrap();
        assert_eq!(parsed.size, MovieSizeMode::Fullscreen);
        assert!(toml::from_str::<Wrapper>("size = \"huge\"").is_err());
    }

    #[test]
    fn test_movie_flags() {
        let flags = MovieFlags::from_bits_truncate(0x08 | 0x02);
        assert!(flags.contains(MovieFlags::ENABLE_SUBTITLES));
        assert_eq!(flags.bits(), 0x08);
        assert!(MovieFlags::default().is_empty());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(MovieError::from(io_err), MovieError::NotFound(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(MovieError::from(io_err), MovieError::Io(_)));

        assert_eq!(MovieError::Busy.to_string(), "A movie is already playing");
    }
}
