//! Settings resolution for scriptkit.
//!
//! There are no configuration files. Settings come from the environment and
//! are then overridden by command-line flags.
use std::{env, str::FromStr};

use crate::constants::{COLOR_ENV, LOG_LEVEL_ENV, NO_COLOR_ENV};
use crate::error::{Result, ScriptKitError};
use crate::logger::{ColorMode, Logger, Severity};

/// Resolved runtime settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Settings {
    /// Initial threshold for the user-facing logger.
    pub log_level: Severity,
    /// Colour mode for the user-facing logger.
    pub color: ColorMode,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through an arbitrary lookup, e.g. a map in tests.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();

        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|value| !value.is_empty()) {
            settings.log_level = Severity::parse(&level)?;
        }

        if lookup(NO_COLOR_ENV).is_some_and(|value| !value.is_empty()) {
            settings.color = ColorMode::Never;
        } else if let Some(mode) = lookup(COLOR_ENV).filter(|value| !value.is_empty()) {
            settings.color = ColorMode::from_str(mode.trim()).map_err(|_| {
                ScriptKitError::InvalidArgument(format!(
                    "invalid colour mode '{mode}' (expected auto, always or never)"
                ))
            })?;
        }

        Ok(settings)
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(mut self, level: Option<Severity>, color: Option<ColorMode>) -> Self {
        if let Some(level) = level {
            self.log_level = level;
        }
        if let Some(color) = color {
            self.color = color;
        }
        self
    }

    /// Builds the stderr logger these settings describe.
    pub fn logger(&self) -> Logger {
        Logger::stderr(self.log_level, self.color)
    }
}
