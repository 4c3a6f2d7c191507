//! Frame delivery from the decoder to the screen.
//!
//! [`PlaybackSink`] is handed to the decoder for one step. Depending on how
//! the session was started it scales the frame onto the whole screen,
//! into a sub-rectangle of the movie window, or blends it over the
//! window through the alpha overlay.

use common::{MovieError, MovieSizeMode, Rect};

use super::alpha::AlphaOverlay;
use super::codec::{DecodedFrame, FrameSink};
use super::scaler::{FrameLayout, compute_layout, resample_into, resample_nearest};
use crate::log_and_continue;
use crate::surface::{Screen, WindowId};

/// Replaces the default palette update (`Screen::set_palette_range`)
pub type PaletteSetter = Box<dyn FnMut(&mut Screen, &[u8], usize, usize)>;

/// How a session puts frames on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlitMode {
    /// Scaled per the size mode onto the whole screen, presented at once
    FullWindow,
    /// Stretched into a rectangle of the movie window
    SubRect,
    /// Blended over the movie window through the alpha mask
    Alpha,
}

/// Scaling inputs for the full-window path
#[derive(Debug, Clone, Copy)]
pub struct DirectOptions {
    pub size_mode: MovieSizeMode,
    /// Margin after the subtitle rule has been applied
    pub margin: f32,
    pub has_subtitles: bool,
}

/// Where the last frame went, in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameGeometry {
    pub src_w: i32,
    pub src_h: i32,
    pub layout: FrameLayout,
}

/// What happened during one decoder step
#[derive(Debug, Default)]
pub struct SinkReport {
    pub geometry: Option<FrameGeometry>,
    pub fault: Option<MovieError>,
    pub frames: u32,
    /// The window changed after the last present
    pub needs_present: bool,
    /// The palette was updated during the step
    pub palette_changed: bool,
}

pub struct PlaybackSink<'a> {
    screen: &'a mut Screen,
    window: WindowId,
    mode: BlitMode,
    /// Movie rectangle in window coordinates
    rect: Rect,
    direct: DirectOptions,
    alpha: Option<&'a mut AlphaOverlay>,
    palette_setter: Option<&'a mut PaletteSetter>,
    report: SinkReport,
}

impl<'a> PlaybackSink<'a> {
    pub fn new(
        screen: &'a mut Screen,
        window: WindowId,
        mode: BlitMode,
        rect: Rect,
        direct: DirectOptions,
    ) -> Self {
        Self {
            screen,
            window,
            mode,
            rect,
            direct,
            alpha: None,
            palette_setter: None,
            report: SinkReport::default(),
        }
    }

    pub fn with_alpha(mut self, alpha: Option<&'a mut AlphaOverlay>) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_palette_setter(mut self, setter: Option<&'a mut PaletteSetter>) -> Self {
        self.palette_setter = setter;
        self
    }

    pub fn finish(self) -> SinkReport {
        self.report
    }

    fn fail(&mut self, error: MovieError) {
        log::error!("Failed to show movie frame: {}", error);
        if self.report.fault.is_none() {
            self.report.fault = Some(error);
        }
    }

    fn show_direct(&mut self, frame: &DecodedFrame<'_>) {
        let (screen_w, screen_h) = (self.screen.width(), self.screen.height());
        let mut layout = compute_layout(
            frame.src_w,
            frame.src_h,
            screen_w,
            screen_h,
            self.direct.size_mode,
            self.direct.margin,
            self.direct.has_subtitles,
        );

        let scaled;
        let pixels: &[u8] = if layout.width == frame.src_w && layout.height == frame.src_h {
            frame.pixels
        } else {
            match resample_nearest(frame.pixels, frame.src_w, frame.src_h, layout.width, layout.height) {
                Ok(buffer) => {
                    scaled = buffer;
                    &scaled
                }
                Err(MovieError::ResourceExhausted(e)) => {
                    log::warn!("No memory for scaled frame, showing native size: {}", e);
                    layout = compute_layout(
                        frame.src_w,
                        frame.src_h,
                        screen_w,
                        screen_h,
                        MovieSizeMode::Native,
                        0.0,
                        false,
                    );
                    frame.pixels
                }
                Err(e) => {
                    self.fail(e);
                    return;
                }
            }
        };

        self.screen.blit(
            pixels,
            layout.width as usize,
            Rect::new(0, 0, layout.width, layout.height),
            layout.x,
            layout.y,
        );
        log_and_continue!(self.screen.present(), "present movie frame");

        self.report.geometry = Some(FrameGeometry {
            src_w: frame.src_w,
            src_h: frame.src_h,
            layout,
        });
    }

    fn show_sub_rect(&mut self, frame: &DecodedFrame<'_>) {
        let Some(window) = self.screen.window_mut(self.window) else {
            self.fail(MovieError::NotFound(format!("Movie window {:?}", self.window)));
            return;
        };

        let origin = window.rect();
        let buffer = window.buffer_mut();
        let pitch = buffer.pitch();
        let offset = self.rect.y as usize * pitch + self.rect.x as usize;

        if let Err(e) = resample_into(
            frame.pixels,
            frame.src_w,
            frame.src_h,
            &mut buffer.data_mut()[offset..],
            pitch,
            self.rect.width,
            self.rect.height,
        ) {
            self.fail(e);
            return;
        }

        self.screen.refresh_window_rect(self.window, self.rect);
        self.report.needs_present = true;
        self.report.geometry = Some(FrameGeometry {
            src_w: frame.src_w,
            src_h: frame.src_h,
            layout: FrameLayout {
                x: origin.x + self.rect.x,
                y: origin.y + self.rect.y,
                width: self.rect.width,
                height: self.rect.height,
            },
        });
    }

    fn show_alpha(&mut self, frame: &DecodedFrame<'_>) {
        let composited = match (
            self.alpha.as_deref_mut(),
            self.screen.window_and_palette_mut(self.window),
        ) {
            (Some(alpha), Some((window, palette))) => {
                alpha.composite(frame, window.buffer_mut(), palette)
            }
            _ => false,
        };

        if !composited {
            self.show_sub_rect(frame);
            return;
        }

        let origin = self
            .screen
            .window(self.window)
            .map(|w| w.rect())
            .unwrap_or_default();
        self.screen.refresh_window_rect(self.window, self.rect);
        self.report.needs_present = true;
        self.report.geometry = Some(FrameGeometry {
            src_w: frame.src_w,
            src_h: frame.src_h,
            layout: FrameLayout {
                x: origin.x + self.rect.x,
                y: origin.y + self.rect.y,
                width: frame.src_w,
                height: frame.src_h,
            },
        });
    }
}

impl FrameSink for PlaybackSink<'_> {
    fn show_frame(&mut self, frame: &DecodedFrame<'_>) {
        if !frame.is_complete() {
            self.fail(MovieError::Malformed(format!(
                "Frame buffer holds {} bytes for {}x{}",
                frame.pixels.len(),
                frame.src_w,
                frame.src_h
            )));
            return;
        }

        log::trace!(
            "Frame {}x{} from ({}, {}) to {}x{} at ({}, {})",
            frame.src_w,
            frame.src_h,
            frame.src_x,
            frame.src_y,
            frame.dst_w,
            frame.dst_h,
            frame.dst_x,
            frame.dst_y
        );

        match self.mode {
            BlitMode::FullWindow => self.show_direct(frame),
            BlitMode::SubRect => self.show_sub_rect(frame),
            BlitMode::Alpha => self.show_alpha(frame),
        }
        self.report.frames += 1;
    }

    fn set_palette(&mut self, palette: &[u8], start: usize, count: usize) {
        if count == 0 {
            return;
        }

        match self.palette_setter.as_deref_mut() {
            Some(setter) => setter(&mut *self.screen, palette, start, count),
            None => self.screen.set_palette_range(palette, start, count),
        }

        if let Some(alpha) = self.alpha.as_deref_mut() {
            alpha.invalidate_blends();
        }
        self.report.palette_changed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::HeadlessPresenter;

    fn frame(pixels: &[u8], width: i32, height: i32) -> DecodedFrame<'_> {
        DecodedFrame {
            pixels,
            src_w: width,
            src_h: height,
            src_x: 0,
            src_y: 0,
            dst_w: width,
            dst_h: height,
            dst_x: 0,
            dst_y: 0,
        }
    }

    fn direct(size_mode: MovieSizeMode) -> DirectOptions {
        DirectOptions {
            size_mode,
            margin: 0.0,
            has_subtitles: false,
        }
    }

    #[test]
    fn test_direct_scales_and_presents() {
        let mut screen = Screen::new(8, 6, Box::new(HeadlessPresenter::new()));
        let window = screen.create_window(screen.bounds(), 0);

        let pixels = [3u8; 8];
        let mut sink = PlaybackSink::new(
            &mut screen,
            window,
            BlitMode::FullWindow,
            Rect::new(0, 0, 8, 6),
            direct(MovieSizeMode::Aspect),
        );
        sink.show_frame(&frame(&pixels, 4, 2));
        let report = sink.finish();

        let geometry = report.geometry.unwrap();
        assert_eq!(
            geometry.layout,
            FrameLayout {
                x: 0,
                y: 1,
                width: 8,
                height: 4
            }
        );
        assert!(report.fault.is_none());
        assert!(!report.needs_present);
        assert_eq!(screen.present_count(), 1);
        assert_eq!(screen.surface().pixel(0, 1), Some(3));
        assert_eq!(screen.surface().pixel(7, 4), Some(3));
        assert_eq!(screen.surface().pixel(0, 0), Some(0));
        assert_eq!(screen.surface().pixel(0, 5), Some(0));
    }

    #[test]
    fn test_sub_rect_stretches_into_window() {
        let mut screen = Screen::new(8, 8, Box::new(HeadlessPresenter::new()));
        let window = screen.create_window(Rect::new(2, 2, 6, 6), 0);

        let pixels = [1, 2, 3, 4];
        let mut sink = PlaybackSink::new(
            &mut screen,
            window,
            BlitMode::SubRect,
            Rect::new(1, 1, 4, 4),
            direct(MovieSizeMode::Native),
        );
        sink.show_frame(&frame(&pixels, 2, 2));
        let report = sink.finish();

        assert!(report.needs_present);
        assert_eq!(report.geometry.unwrap().layout.x, 3);
        assert_eq!(screen.present_count(), 0);
        assert_eq!(screen.surface().pixel(3, 3), Some(1));
        assert_eq!(screen.surface().pixel(6, 6), Some(4));
        assert_eq!(screen.surface().pixel(2, 2), Some(0));
    }

    #[test]
    fn test_incomplete_frame_is_a_fault() {
        let mut screen = Screen::new(4, 4, Box::new(HeadlessPresenter::new()));
        let window = screen.create_window(screen.bounds(), 0);

        let mut sink = PlaybackSink::new(
            &mut screen,
            window,
            BlitMode::FullWindow,
            Rect::new(0, 0, 4, 4),
            direct(MovieSizeMode::Native),
        );
        sink.show_frame(&frame(&[1, 2], 2, 2));
        let report = sink.finish();

        assert!(matches!(report.fault, Some(MovieError::Malformed(_))));
        assert!(report.geometry.is_none());
    }

    #[test]
    fn test_palette_goes_to_screen_or_setter() {
        let mut screen = Screen::new(2, 2, Box::new(HeadlessPresenter::new()));
        let window = screen.create_window(screen.bounds(), 0);

        let mut sink = PlaybackSink::new(
            &mut screen,
            window,
            BlitMode::FullWindow,
            Rect::new(0, 0, 2, 2),
            direct(MovieSizeMode::Native),
        );
        sink.set_palette(&[63, 0, 0], 4, 1);
        sink.set_palette(&[], 0, 0);
        assert!(sink.finish().palette_changed);
        assert_eq!(screen.palette().entry(4), [63, 0, 0]);

        let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let seen = log.clone();
        let mut setter: PaletteSetter = Box::new(move |_, _, start, count| {
            seen.borrow_mut().push((start, count));
        });

        let mut sink = PlaybackSink::new(
            &mut screen,
            window,
            BlitMode::FullWindow,
            Rect::new(0, 0, 2, 2),
            direct(MovieSizeMode::Native),
        )
        .with_palette_setter(Some(&mut setter));
        sink.set_palette(&[0, 63, 0], 4, 1);
        sink.finish();

        assert_eq!(*log.borrow(), vec![(4, 1)]);
        assert_eq!(screen.palette().entry(4), [63, 0, 0]);
    }
}
