// SPDX-FileCopyrightText: 2025 The seedwatch Contributors
// SPDX-License-Identifier: GPL-3.0-or-later

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Settings {
    /// Frame cadence of the monitor.
    pub draw_interval_ms: u64,

    // Keystroke step sizes for engine-held limits.
    pub peer_limit_step: u32,
    pub upload_slot_step: u32,

    // What the tracker-rearm key asks the engine for.
    pub tracker_rearm_secs: u64,
    pub tracker_want_count: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            draw_interval_ms: 250,
            peer_limit_step: 5,
            upload_slot_step: 1,
            tracker_rearm_secs: 5,
            tracker_want_count: 100,
        }
    }
}

impl Settings {
    pub fn tracker_rearm(&self) -> Duration {
        Duration::from_secs(self.tracker_rearm_secs)
    }
}

/// Single source of truth for app directories: (config dir, data dir).
pub fn get_app_paths() -> Option<(PathBuf, PathBuf)> {
    let proj_dirs = directories::ProjectDirs::from("com", "github", "seedwatch")?;
    let config_dir = proj_dirs.config_dir().to_path_buf();
    let data_dir = proj_dirs.data_local_dir().to_path_buf();

    fs::create_dir_all(&config_dir).ok()?;
    fs::create_dir_all(&data_dir).ok()?;

    Some((config_dir, data_dir))
}

/// Layered settings: defaults, then `settings.toml`, then `SEEDWATCH_*`
/// environment overrides. Falls back to defaults on any extraction error.
pub fn load_settings(config_path: Option<PathBuf>) -> Settings {
    let path = config_path.or_else(|| get_app_paths().map(|(c, _)| c.join("settings.toml")));

    let mut figment = Figment::from(figment::providers::Serialized::defaults(Settings::default()));
    if let Some(path) = path {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed("SEEDWATCH_"));

    figment.extract().unwrap_or_else(|e| {
        tracing::warn!("failed to load settings, using defaults: {e}");
        Settings::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_key_bindings() {
        let settings = Settings::default();
        assert_eq!(settings.peer_limit_step, 5);
        assert_eq!(settings.upload_slot_step, 1);
        assert_eq!(settings.tracker_rearm(), Duration::from_secs(5));
        assert_eq!(settings.tracker_want_count, 100);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let settings = load_settings(Some(PathBuf::from("/nonexistent/settings.toml")));
        assert_eq!(settings.draw_interval_ms, 250);
    }
}
