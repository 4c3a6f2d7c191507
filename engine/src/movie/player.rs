//! Movie playback state machine.
//!
//! A [`MoviePlayer`] holds at most one session. Starting opens the stream,
//! primes the decoder and moves to `Running`; each [`MoviePlayer::update`]
//! steps one frame. Stop requests only mark the session, and the next
//! update tears it down, so teardown never happens inside a decoder step.
//!
//! Every session ends in a teardown that consumes it. The
//! stream, subtitle queue and alpha buffers live in the session, so they are
//! released exactly once whichever way playback ended.

use common::{
    FinishReason, MovieError, MovieFlags, MovieSizeMode, PlaybackStatus, Rect, TickOutcome,
};
use std::io::Read;

use super::alpha::AlphaOverlay;
use super::blit::{BlitMode, DirectOptions, FrameGeometry, PaletteSetter, PlaybackSink};
use super::codec::{MovieDecoder, StepOutcome, hmi_to_decibels};
use super::frames::LastFrameCache;
use super::scaler::effective_margin;
use super::stats::PlaybackStats;
use super::subtitles::{
    SUBTITLE_PADDING, SubtitleBand, SubtitleQueue, render_due, subtitle_path_for,
};
use crate::assets::AssetSource;
use crate::config::{Config, MAX_VOLUME};
use crate::log_and_continue;
use crate::surface::{Screen, WindowId};
use crate::text::TextRenderer;

/// Called after every stepped frame with the decoder's frame counter
pub type FrameHook = Box<dyn FnMut(u64)>;

/// Maps a movie path to the path of its subtitle sidecar
pub type SubtitlePathBuilder = Box<dyn Fn(&str) -> String>;

/// Player preferences taken from the `[movie]` and `[general]` settings
#[derive(Debug, Clone)]
pub struct PlayerSettings {
    pub size_mode: MovieSizeMode,
    /// Subtitles enabled in the game preferences
    pub subtitles: bool,
    pub subtitle_margin: f32,
    /// 5:5:5 caption colour, matched against the live palette
    pub subtitle_color: u16,
    pub language: String,
    pub volume: i32,
}

impl PlayerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            size_mode: config.movie.size,
            subtitles: config.movie.subtitles,
            subtitle_margin: config.movie.subtitle_margin,
            subtitle_color: config.movie.subtitle_rgb555(),
            language: config.general.language.clone(),
            volume: config.movie.volume,
        }
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

struct Session {
    path: String,
    window: WindowId,
    stream: Box<dyn Read>,
    mode: BlitMode,
    /// Movie rectangle in window coordinates
    rect: Rect,
    subtitles: Option<SubtitleQueue>,
    alpha: Option<AlphaOverlay>,
    geometry: Option<FrameGeometry>,
    stats: PlaybackStats,
}

enum PlaybackState {
    Idle,
    Running(Session),
    /// Stop requested, torn down on the next update
    Stopping(Session),
}

pub struct MoviePlayer {
    decoder: Box<dyn MovieDecoder>,
    assets: Box<dyn AssetSource>,
    font: Box<dyn TextRenderer>,
    subtitle_font: Option<Box<dyn TextRenderer>>,
    settings: PlayerSettings,
    flags: MovieFlags,
    state: PlaybackState,
    last_frame: LastFrameCache,
    palette_setter: Option<PaletteSetter>,
    frame_hook: Option<FrameHook>,
    subtitle_path_builder: Option<SubtitlePathBuilder>,
}

impl MoviePlayer {
    pub fn new(
        decoder: Box<dyn MovieDecoder>,
        assets: Box<dyn AssetSource>,
        font: Box<dyn TextRenderer>,
        settings: PlayerSettings,
    ) -> Self {
        Self {
            decoder,
            assets,
            font,
            subtitle_font: None,
            settings,
            flags: MovieFlags::empty(),
            state: PlaybackState::Idle,
            last_frame: LastFrameCache::new(),
            palette_setter: None,
            frame_hook: None,
            subtitle_path_builder: None,
        }
    }

    /// Tell the decoder about the screen and apply the configured volume
    pub fn init(&mut self, screen: &Screen) {
        self.decoder.set_screen_size(screen.width(), screen.height());
        self.set_volume(self.settings.volume);
        log::debug!(
            "Movie player ready for {}x{} ({} size)",
            screen.width(),
            screen.height(),
            self.settings.size_mode.name()
        );
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut PlayerSettings {
        &mut self.settings
    }

    pub fn flags(&self) -> MovieFlags {
        self.flags
    }

    /// Options for the next movie. Cleared when a session ends.
    pub fn set_flags(&mut self, flags: MovieFlags) {
        self.flags.set(
            MovieFlags::ENABLE_SUBTITLES,
            flags.contains(MovieFlags::ENABLE_SUBTITLES),
        );
    }

    /// `None` restores the default of writing straight to the screen palette
    pub fn set_palette_setter(&mut self, setter: Option<PaletteSetter>) {
        self.palette_setter = setter;
    }

    pub fn set_frame_hook(&mut self, hook: Option<FrameHook>) {
        self.frame_hook = hook;
    }

    pub fn set_subtitle_path_builder(&mut self, builder: Option<SubtitlePathBuilder>) {
        self.subtitle_path_builder = builder;
    }

    /// Font for captions; `None` uses the player's main font
    pub fn set_subtitle_font(&mut self, font: Option<Box<dyn TextRenderer>>) {
        self.subtitle_font = font;
    }

    /// Game volume, 0..=32767
    pub fn set_volume(&mut self, volume: i32) {
        let volume = volume.clamp(0, MAX_VOLUME);
        self.settings.volume = volume;
        self.decoder.set_volume(hmi_to_decibels(volume));
    }

    pub fn status(&self) -> PlaybackStatus {
        match self.state {
            PlaybackState::Idle => PlaybackStatus::Idle,
            PlaybackState::Running(_) => PlaybackStatus::Running,
            PlaybackState::Stopping(_) => PlaybackStatus::Stopping,
        }
    }

    pub fn is_playing(&self) -> bool {
        !matches!(self.state, PlaybackState::Idle)
    }

    /// Copy of the final frame of the previous session
    pub fn last_frame(&self) -> &LastFrameCache {
        &self.last_frame
    }

    /// Play `path` over the whole of `window`
    pub fn run(&mut self, screen: &Screen, window: WindowId, path: &str) -> Result<(), MovieError> {
        self.start(screen, window, path, BlitMode::FullWindow, None, None)
    }

    /// Play `path` stretched into `rect` (window coordinates)
    pub fn run_rect(
        &mut self,
        screen: &Screen,
        window: WindowId,
        path: &str,
        rect: Rect,
    ) -> Result<(), MovieError> {
        self.start(screen, window, path, BlitMode::SubRect, Some(rect), None)
    }

    /// Play `path` in `rect`, blended over the window with the masks in
    /// `alpha_path`
    pub fn run_rect_with_alpha(
        &mut self,
        screen: &Screen,
        window: WindowId,
        path: &str,
        rect: Rect,
        alpha_path: &str,
    ) -> Result<(), MovieError> {
        self.start(screen, window, path, BlitMode::Alpha, Some(rect), Some(alpha_path))
    }

    fn start(
        &mut self,
        screen: &Screen,
        window: WindowId,
        path: &str,
        mode: BlitMode,
        rect: Option<Rect>,
        alpha_path: Option<&str>,
    ) -> Result<(), MovieError> {
        if self.is_playing() {
            log::warn!("Movie {} not started: another movie is playing", path);
            return Err(MovieError::Busy);
        }

        let window_rect = screen
            .window(window)
            .map(|w| w.rect())
            .ok_or_else(|| MovieError::NotFound(format!("Movie window {:?}", window)))?;

        let local_bounds = Rect::new(0, 0, window_rect.width, window_rect.height);
        let rect = rect.unwrap_or(local_bounds);
        if rect.is_empty() || !local_bounds.contains_rect(&rect) {
            return Err(MovieError::Malformed(format!(
                "Movie rectangle {:?} does not fit window {:?}",
                rect, window_rect
            )));
        }

        self.last_frame.clear();

        let mut stream = self.assets.open(path).map_err(|e| {
            log::warn!("Couldn't find movie file {}: {}", path, e);
            MovieError::NotFound(format!("{}: {}", path, e))
        })?;

        let subtitles = if self.flags.contains(MovieFlags::ENABLE_SUBTITLES) {
            self.load_subtitles(path)
        } else {
            None
        };

        let (x, y) = (window_rect.x + rect.x, window_rect.y + rect.y);
        log::debug!("Playing {} at ({}, {})", path, x, y);

        if let Err(e) = self.decoder.prepare(stream.as_mut(), x, y, 0) {
            log::error!("Failed to prepare movie {}: {}", path, e);
            self.decoder.release();
            self.flags = MovieFlags::empty();
            return Err(match e {
                MovieError::StreamFault(_) => e,
                other => MovieError::StreamFault(other.to_string()),
            });
        }

        let alpha = match alpha_path {
            Some(alpha_path) => self.open_alpha(screen, window, rect, alpha_path),
            None => None,
        };

        log::info!("Movie started: {}", path);
        self.state = PlaybackState::Running(Session {
            path: path.to_string(),
            window,
            stream,
            mode,
            rect,
            subtitles,
            alpha,
            geometry: None,
            stats: PlaybackStats::new(path),
        });

        Ok(())
    }

    /// A missing or unreadable sidecar turns subtitles off for this movie
    fn load_subtitles(&mut self, path: &str) -> Option<SubtitleQueue> {
        let subtitle_path = match &self.subtitle_path_builder {
            Some(builder) => builder(path),
            None => subtitle_path_for(path, &self.settings.language),
        };

        match SubtitleQueue::load(self.assets.as_ref(), &subtitle_path) {
            Ok(queue) => Some(queue),
            Err(e) => {
                log::info!("Couldn't open subtitle file {}: {}", subtitle_path, e);
                self.flags.remove(MovieFlags::ENABLE_SUBTITLES);
                None
            }
        }
    }

    fn open_alpha(
        &self,
        screen: &Screen,
        window: WindowId,
        rect: Rect,
        alpha_path: &str,
    ) -> Option<AlphaOverlay> {
        let stream = match self.assets.open(alpha_path) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("Couldn't open alpha file {}, playing unmasked: {}", alpha_path, e);
                return None;
            }
        };

        let buffer = screen.window(window)?.buffer();
        match AlphaOverlay::open(stream, buffer, rect) {
            Ok(overlay) => Some(overlay),
            Err(MovieError::ResourceExhausted(e)) => {
                log::warn!("No memory for alpha overlay, playing unmasked: {}", e);
                None
            }
            Err(e) => {
                log::warn!("Alpha file {} unusable, playing unmasked: {}", alpha_path, e);
                None
            }
        }
    }

    /// Ask for the current movie to end. Teardown happens on the next update.
    pub fn stop(&mut self) {
        self.state = match std::mem::replace(&mut self.state, PlaybackState::Idle) {
            PlaybackState::Running(session) => {
                log::debug!("Stop requested for {}", session.path);
                PlaybackState::Stopping(session)
            }
            other => other,
        };
    }

    /// Advance playback by one frame
    pub fn update(&mut self, screen: &mut Screen) -> TickOutcome {
        match std::mem::replace(&mut self.state, PlaybackState::Idle) {
            PlaybackState::Idle => TickOutcome::Idle,
            PlaybackState::Stopping(session) => {
                log::info!("Movie aborted");
                self.teardown(screen, session, FinishReason::Aborted);
                TickOutcome::Finished(FinishReason::Aborted)
            }
            PlaybackState::Running(mut session) => match self.step(screen, &mut session) {
                Ok(()) => {
                    self.state = PlaybackState::Running(session);
                    TickOutcome::Playing
                }
                Err(reason) => {
                    self.teardown(screen, session, reason);
                    TickOutcome::Finished(reason)
                }
            },
        }
    }

    fn step(&mut self, screen: &mut Screen, session: &mut Session) -> Result<(), FinishReason> {
        if let Some(alpha) = session.alpha.as_mut() {
            alpha.advance();
        }

        let has_subtitles = session.subtitles.is_some();
        let direct = DirectOptions {
            size_mode: self.settings.size_mode,
            margin: effective_margin(
                self.settings.subtitle_margin,
                has_subtitles,
                self.settings.subtitles,
            ),
            has_subtitles,
        };

        let mut sink = PlaybackSink::new(screen, session.window, session.mode, session.rect, direct)
            .with_alpha(session.alpha.as_mut())
            .with_palette_setter(self.palette_setter.as_mut());
        let outcome = self.decoder.step(session.stream.as_mut(), &mut sink);
        let report = sink.finish();

        if report.geometry.is_some() {
            session.geometry = report.geometry;
        }

        #[cfg(feature = "profiling")]
        if report.frames == 0 {
            session.stats.record_empty_step();
        }

        match outcome {
            StepOutcome::Frame => {}
            StepOutcome::End => return Err(FinishReason::EndOfStream),
            StepOutcome::Error => {
                log::warn!("Movie error in {}", session.path);
                return Err(FinishReason::StreamFault);
            }
        }

        if let Some(fault) = report.fault {
            log::error!("Movie {} stopped: {}", session.path, fault);
            return Err(FinishReason::StreamFault);
        }

        let counts = self.decoder.frame_counts();
        session.stats.record(counts);

        // A palette-only step recoloured the texture without presenting it
        let mut needs_present =
            report.needs_present || (report.palette_changed && report.frames == 0);
        if self.render_subtitles(screen, session, counts.shown) > 0 {
            needs_present = true;
        }
        if needs_present {
            log_and_continue!(screen.present(), "present movie frame");
        }

        if let Some(hook) = self.frame_hook.as_mut() {
            hook(counts.shown);
        }

        Ok(())
    }

    fn render_subtitles(&self, screen: &mut Screen, session: &mut Session, frame: u64) -> usize {
        if !self.flags.contains(MovieFlags::ENABLE_SUBTITLES) {
            return 0;
        }
        let Some(queue) = session.subtitles.as_mut() else {
            return 0;
        };
        let Some(geometry) = session.geometry else {
            return 0;
        };
        let Some(window_rect) = screen.window(session.window).map(|w| w.rect()) else {
            return 0;
        };

        let font = self.subtitle_font.as_deref().unwrap_or(self.font.as_ref());
        let band = SubtitleBand::place(
            geometry.layout.bottom() - window_rect.y,
            window_rect.height,
            window_rect.width,
            font.line_height() + SUBTITLE_PADDING,
        );
        let color = screen.palette().index_for_rgb555(self.settings.subtitle_color);

        render_due(queue, frame, screen, session.window, &band, color, font)
    }

    /// Release everything the session holds. Consumes the session, so it
    /// runs once per session.
    fn teardown(&mut self, screen: &mut Screen, session: Session, reason: FinishReason) {
        let Session {
            path,
            window,
            stream,
            subtitles,
            alpha,
            geometry,
            mut stats,
            ..
        } = session;

        stats.record(self.decoder.frame_counts());
        stats.log_summary(reason);

        if let (Some(geometry), Some(pixels)) = (geometry, self.decoder.frame_buffer()) {
            if let Err(e) = self.last_frame.store(pixels, geometry.src_w, geometry.src_h) {
                log::warn!("Couldn't keep last frame of {}: {}", path, e);
            }
        }

        self.decoder.end_movie();
        self.decoder.release();
        drop(stream);

        if let Some(alpha) = alpha {
            if let Some(target) = screen.window_mut(window) {
                let rect = alpha.restore(target.buffer_mut());
                screen.refresh_window_rect(window, rect);
            }
        }

        if let Some(queue) = subtitles {
            if !queue.is_empty() {
                log::debug!("Dropping {} unshown subtitles", queue.len());
            }
        }

        self.flags = MovieFlags::empty();
        log::debug!("Movie {} released", path);
    }

    /// Shut the player down: end any session and drop the last frame
    pub fn exit(&mut self, screen: &mut Screen) {
        match std::mem::replace(&mut self.state, PlaybackState::Idle) {
            PlaybackState::Idle => {}
            PlaybackState::Running(session) | PlaybackState::Stopping(session) => {
                self.teardown(screen, session, FinishReason::Aborted);
            }
        }
        self.last_frame.clear();
    }
}
