/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::collections::HashMap;

use crate::config::NavigatorConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseColorResolution {
    pub requested_branch: Option<String>,
    pub color: String,
    pub matched: bool,
    pub fallback_used: bool,
}

/// Branch -> theming color hint, with a fallback for unknown branches and for
/// the unfiltered view.
#[derive(Debug, Clone)]
pub struct PhasePalette {
    colors: HashMap<String, String>,
    fallback_color: String,
}

impl PhasePalette {
    pub fn from_config(config: &NavigatorConfig) -> Self {
        let mut palette = Self {
            colors: HashMap::new(),
            fallback_color: config.default_phase_color.clone(),
        };
        for (branch, color) in &config.phase_colors {
            palette.register(branch, color);
        }
        palette
    }

    pub fn register(&mut self, branch: &str, color: &str) {
        self.colors
            .insert(branch.trim().to_ascii_lowercase(), color.trim().to_string());
    }

    pub fn fallback_color(&self) -> &str {
        &self.fallback_color
    }

    pub fn resolve(&self, branch: Option<&str>) -> PhaseColorResolution {
        let requested = branch.map(|name| name.trim().to_ascii_lowercase());
        match requested
            .as_deref()
            .filter(|name| !name.is_empty())
            .and_then(|name| self.colors.get(name))
        {
            Some(color) => PhaseColorResolution {
                requested_branch: branch.map(str::to_string),
                color: color.clone(),
                matched: true,
                fallback_used: false,
            },
            None => PhaseColorResolution {
                requested_branch: branch.map(str::to_string),
                color: self.fallback_color.clone(),
                matched: false,
                fallback_used: true,
            },
        }
    }
}

impl Default for PhasePalette {
    fn default() -> Self {
        Self::from_config(&NavigatorConfig::default())
    }
}
