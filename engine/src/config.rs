use anyhow::{Context, Result};
use common::MovieSizeMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::surface::parse_hex_color;
use crate::validate_enum;

/// Highest volume the game's audio settings produce
pub const MAX_VOLUME: i32 = 32767;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralSettings,

    #[serde(default)]
    pub screen: ScreenSettings,

    #[serde(default)]
    pub movie: MovieSettings,

    #[serde(default)]
    pub ending: EndingSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralSettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Language directory used for subtitle and caption text
    #[serde(default = "default_language")]
    pub language: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            language: default_language(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_language() -> String {
    "english".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScreenSettings {
    #[serde(default = "default_screen_width")]
    pub width: i32,

    #[serde(default = "default_screen_height")]
    pub height: i32,

    #[serde(default)]
    pub windowed: bool,

    /// Render at half resolution and double every pixel
    #[serde(default)]
    pub scale_2x: bool,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            width: default_screen_width(),
            height: default_screen_height(),
            windowed: false,
            scale_2x: false,
        }
    }
}

fn default_screen_width() -> i32 {
    640
}
fn default_screen_height() -> i32 {
    480
}

/// Cinematic playback preferences
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MovieSettings {
    #[serde(default)]
    pub size: MovieSizeMode,

    /// Show subtitles when a movie has them
    #[serde(default = "default_true")]
    pub subtitles: bool,

    /// Fraction of the screen height kept free for subtitles
    #[serde(default = "default_subtitle_margin")]
    pub subtitle_margin: f32,

    /// Subtitle text colour (hex RRGGBB)
    #[serde(default = "default_subtitle_color")]
    pub subtitle_color: String,

    #[serde(default = "default_volume")]
    pub volume: i32,

    #[serde(default)]
    pub skip_opening: bool,

    /// Movies played at startup, in order
    #[serde(default = "default_opening")]
    pub opening: Vec<String>,
}

impl Default for MovieSettings {
    fn default() -> Self {
        Self {
            size: MovieSizeMode::default(),
            subtitles: true,
            subtitle_margin: default_subtitle_margin(),
            subtitle_color: default_subtitle_color(),
            volume: default_volume(),
            skip_opening: false,
            opening: default_opening(),
        }
    }
}

impl MovieSettings {
    /// Palette-independent 5:5:5 subtitle colour
    pub fn subtitle_rgb555(&self) -> u16 {
        let (r, g, b) = parse_hex_color(&self.subtitle_color).unwrap_or((0xF8, 0xF8, 0xF8));
        crate::surface::rgb555(r, g, b)
    }
}

fn default_true() -> bool {
    true
}
fn default_subtitle_margin() -> f32 {
    0.15
}
fn default_subtitle_color() -> String {
    "F8F8F8".to_string()
}
fn default_volume() -> i32 {
    MAX_VOLUME
}

fn default_opening() -> Vec<String> {
    vec![
        "art\\cuts\\iplogo.mve".to_string(),
        "art\\cuts\\intro.mve".to_string(),
        "art\\cuts\\credits.mve".to_string(),
    ]
}

/// Ending slideshow settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EndingSettings {
    #[serde(default)]
    pub size: MovieSizeMode,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded configuration from {}", path.display());
        config.validate()?;

        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("isocine");

        Ok(config_dir.join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_log_level(&self.general.log_level)?;

        if self.general.language.is_empty() {
            anyhow::bail!("Language must not be empty");
        }

        if self.screen.width <= 0 || self.screen.height <= 0 {
            anyhow::bail!(
                "Invalid screen size: {}x{}",
                self.screen.width,
                self.screen.height
            );
        }

        let margin = self.movie.subtitle_margin;
        if !(0.0..1.0).contains(&margin) {
            anyhow::bail!("Invalid subtitle margin (must be in [0, 1)): {}", margin);
        }

        if parse_hex_color(&self.movie.subtitle_color).is_none() {
            anyhow::bail!("Invalid subtitle color: {}", self.movie.subtitle_color);
        }

        if !(0..=MAX_VOLUME).contains(&self.movie.volume) {
            anyhow::bail!(
                "Invalid volume (must be 0-{}): {}",
                MAX_VOLUME,
                self.movie.volume
            );
        }

        Ok(())
    }

    fn validate_log_level(&self, level: &str) -> Result<()> {
        validate_enum!(level, "trace", "debug", "info", "warn", "error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.language, "english");
        assert_eq!(config.screen.width, 640);
        assert_eq!(config.screen.height, 480);
        assert_eq!(config.movie.size, MovieSizeMode::Native);
        assert!(config.movie.subtitles);
        assert_eq!(config.movie.subtitle_margin, 0.15);
        assert_eq!(config.movie.volume, MAX_VOLUME);
        assert_eq!(
            config.movie.opening,
            vec![
                "art\\cuts\\iplogo.mve",
                "art\\cuts\\intro.mve",
                "art\\cuts\\credits.mve"
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_log_level() {
        let config = Config::default();
        assert!(config.validate_log_level("debug").is_ok());
        assert!(config.validate_log_level("loud").is_err());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[general]
language = "german"

[movie]
size = "aspect"
subtitles = false
opening = ["art\\cuts\\intro.mve"]

[ending]
size = "fullscreen"
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.general.language, "german");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.movie.size, MovieSizeMode::Aspect);
        assert!(!config.movie.subtitles);
        assert_eq!(config.movie.opening, vec!["art\\cuts\\intro.mve"]);
        assert_eq!(config.movie.subtitle_color, "F8F8F8");
        assert_eq!(config.ending.size, MovieSizeMode::Fullscreen);
        assert_eq!(config.screen, ScreenSettings::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.movie.subtitle_margin = 1.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.movie.volume = 40000;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.movie.subtitle_color = "white".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.screen.height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_subtitle_rgb555() {
        let config = Config::default();
        assert_eq!(config.movie.subtitle_rgb555(), 0x7FFF);
    }
}
