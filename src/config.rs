//! Reader configuration
//!
//! Values normally come from the environment (after `dotenvy` has loaded a
//! `.env` file) or from a JSON settings file written by the display shell.
//! The core only reads them.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::document::DEFAULT_PAGE_CACHE_CAPACITY;
use crate::formats::pdf::DEFAULT_PASSWORD_ATTEMPTS;
use crate::session::zoom::{MAX_FONT_SIZE, MIN_FONT_SIZE};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Window presentation requested by the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Windowed,
    Maximized,
    Fullscreen,
}

impl DisplayMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "windowed" => Some(Self::Windowed),
            "maximized" => Some(Self::Maximized),
            "fullscreen" => Some(Self::Fullscreen),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    pub font_family: String,
    /// Markup font size that corresponds to 100% zoom
    pub base_font_size: u32,
    pub theme: String,
    pub language: String,
    pub display_mode: DisplayMode,
    /// Pixels trimmed from each viewport edge before fitting the first PDF page
    pub viewport_margin: f32,
    pub max_password_attempts: u32,
    /// Single-page bitmaps kept in the LRU cache
    pub page_cache_capacity: usize,
    /// Parent directory for EPUB scratch workspaces (system temp dir if unset)
    pub scratch_root: Option<PathBuf>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            font_family: "serif".to_string(),
            base_font_size: 14,
            theme: "light".to_string(),
            language: "en".to_string(),
            display_mode: DisplayMode::Windowed,
            viewport_margin: 25.0,
            max_password_attempts: DEFAULT_PASSWORD_ATTEMPTS,
            page_cache_capacity: DEFAULT_PAGE_CACHE_CAPACITY,
            scratch_root: None,
        }
    }
}

impl ReaderConfig {
    /// Build from `FEREADER_*` environment variables, defaulting anything unset
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        fn parsed<T: std::str::FromStr>(key: &str, raw: Option<String>, fallback: T) -> T {
            match raw {
                Some(value) => value.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %value, "Ignoring invalid configuration value");
                    fallback
                }),
                None => fallback,
            }
        }

        let display_mode = match lookup("FEREADER_DISPLAY_MODE") {
            Some(value) => DisplayMode::parse(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown display mode, using windowed");
                DisplayMode::Windowed
            }),
            None => defaults.display_mode,
        };

        Self {
            font_family: lookup("FEREADER_FONT_FAMILY").unwrap_or(defaults.font_family),
            base_font_size: parsed(
                "FEREADER_BASE_FONT_SIZE",
                lookup("FEREADER_BASE_FONT_SIZE"),
                defaults.base_font_size,
            ),
            theme: lookup("FEREADER_THEME").unwrap_or(defaults.theme),
            language: lookup("FEREADER_LANGUAGE").unwrap_or(defaults.language),
            display_mode,
            viewport_margin: parsed(
                "FEREADER_VIEWPORT_MARGIN",
                lookup("FEREADER_VIEWPORT_MARGIN"),
                defaults.viewport_margin,
            ),
            max_password_attempts: parsed(
                "FEREADER_PASSWORD_ATTEMPTS",
                lookup("FEREADER_PASSWORD_ATTEMPTS"),
                defaults.max_password_attempts,
            ),
            page_cache_capacity: parsed(
                "FEREADER_PAGE_CACHE",
                lookup("FEREADER_PAGE_CACHE"),
                defaults.page_cache_capacity,
            ),
            scratch_root: lookup("FEREADER_SCRATCH_DIR").map(PathBuf::from),
        }
        .normalized()
    }

    /// Read a JSON settings file; missing keys take their defaults
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(config.normalized())
    }

    /// Clamp values into the ranges the session accepts
    pub fn normalized(mut self) -> Self {
        self.base_font_size = self.base_font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        if !self.viewport_margin.is_finite() || self.viewport_margin < 0.0 {
            self.viewport_margin = 0.0;
        }
        self.max_password_attempts = self.max_password_attempts.max(1);
        self.page_cache_capacity = self.page_cache_capacity.max(1);
        self
    }
}
