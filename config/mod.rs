/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Navigator tuning knobs, loadable from a partial TOML document.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_TRANSITION_FALLBACK_MS: u64 = 450;
pub const DEFAULT_HOVER_OPEN_DELAY_MS: u64 = 120;
pub const DEFAULT_HOVER_CLOSE_GRACE_MS: u64 = 250;
pub const DEFAULT_LAYOUT_DEBOUNCE_MS: u64 = 16;
pub const DEFAULT_ROW_EXTENT: f32 = 28.0;
pub const DEFAULT_PHASE_COLOR: &str = "#7c8799";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigatorConfig {
    /// Deadline after which a transition resolves without the view's signal.
    pub transition_fallback_ms: u64,
    pub hover_open_delay_ms: u64,
    pub hover_close_grace_ms: u64,
    pub layout_debounce_ms: u64,
    /// Logical extent of one visible row, used when measuring containers.
    pub row_extent: f32,
    pub default_phase_color: String,
    /// Branch name -> theming color hint.
    pub phase_colors: BTreeMap<String, String>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            transition_fallback_ms: DEFAULT_TRANSITION_FALLBACK_MS,
            hover_open_delay_ms: DEFAULT_HOVER_OPEN_DELAY_MS,
            hover_close_grace_ms: DEFAULT_HOVER_CLOSE_GRACE_MS,
            layout_debounce_ms: DEFAULT_LAYOUT_DEBOUNCE_MS,
            row_extent: DEFAULT_ROW_EXTENT,
            default_phase_color: DEFAULT_PHASE_COLOR.to_string(),
            phase_colors: BTreeMap::new(),
        }
    }
}

impl NavigatorConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !config.row_extent.is_finite() || config.row_extent <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "row_extent",
                reason: "must be a positive finite number",
            });
        }
        Ok(config)
    }

    pub fn transition_fallback(&self) -> Duration {
        Duration::from_millis(self.transition_fallback_ms)
    }

    pub fn hover_open_delay(&self) -> Duration {
        Duration::from_millis(self.hover_open_delay_ms)
    }

    pub fn hover_close_grace(&self) -> Duration {
        Duration::from_millis(self.hover_close_grace_ms)
    }

    pub fn layout_debounce(&self) -> Duration {
        Duration::from_millis(self.layout_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "navigator config could not be parsed: {message}"),
            Self::Invalid { field, reason } => write!(f, "navigator config field '{field}' {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}
