//! Cutscene playback engine.
//!
//! - `surface`: paletted screen, windows and presentation
//! - `text`: bitmap text layout
//! - `assets`: game data access
//! - `config`: TOML settings
//! - `movie`: movie playback
//! - `ending`: ending slides with narration captions

mod macros;

pub mod assets;
pub mod config;
pub mod ending;
pub mod movie;
pub mod surface;
pub mod text;

pub use common;

use config::Config;

/// Set up `env_logger` with the configured level as the default filter.
///
/// `RUST_LOG` still takes precedence. Later calls leave the first logger in
/// place.
pub fn init_logging(config: &Config) {
    let env = env_logger::Env::default().default_filter_or(config.general.log_level.as_str());
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
