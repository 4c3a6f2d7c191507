use common::{MovieError, MovieFlags, TickOutcome};

use super::player::MoviePlayer;
use crate::config::MovieSettings;
use crate::surface::{Screen, WindowId};

/// Movies played back to back in one window, such as the opening logos
#[derive(Debug, Clone)]
pub struct MovieSequence {
    /// Movie paths in play order
    movies: Vec<String>,

    /// Index of the movie playing or about to play
    current_index: usize,

    /// Flags applied before each movie starts
    flags: MovieFlags,

    /// Movies that could not be started
    skipped: usize,
}

impl MovieSequence {
    pub fn new(movies: Vec<String>, flags: MovieFlags) -> Self {
        log::info!("Created movie sequence with {} movies", movies.len());
        Self {
            movies,
            current_index: 0,
            flags,
            skipped: 0,
        }
    }

    /// Opening movies from the settings; empty when they are skipped
    pub fn opening(settings: &MovieSettings) -> Self {
        let flags = if settings.subtitles {
            MovieFlags::ENABLE_SUBTITLES
        } else {
            MovieFlags::empty()
        };

        if settings.skip_opening {
            log::info!("Skipping opening movies");
            return Self::new(Vec::new(), flags);
        }

        Self::new(settings.opening.clone(), flags)
    }

    /// The movie playing or about to play
    pub fn current(&self) -> Option<&str> {
        self.movies.get(self.current_index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn is_finished(&self) -> bool {
        self.current_index >= self.movies.len()
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// End the current movie; the next one starts on a later update
    pub fn skip_current(&self, player: &mut MoviePlayer) {
        if let Some(path) = self.current() {
            log::debug!("Skipping {}", path);
            player.stop();
        }
    }

    /// Drive the sequence for one tick. Returns `false` once every movie
    /// has played or been skipped.
    pub fn update(&mut self, player: &mut MoviePlayer, screen: &mut Screen, window: WindowId) -> bool {
        if player.is_playing() {
            if let TickOutcome::Finished(reason) = player.update(screen) {
                log::debug!(
                    "Sequence movie {} finished: {:?}",
                    self.current().unwrap_or_default(),
                    reason
                );
                self.current_index += 1;
            }
            return !self.is_finished();
        }

        while let Some(path) = self.current() {
            player.set_flags(self.flags);
            match player.run(screen, window, path) {
                Ok(()) => return true,
                Err(MovieError::Busy) => return true,
                Err(MovieError::NotFound(e)) => {
                    log::warn!("Skipping missing movie: {}", e);
                }
                Err(e) => {
                    log::warn!("Skipping movie {}: {}", path, e);
                }
            }
            self.skipped += 1;
            self.current_index += 1;
        }

        false
    }
}
