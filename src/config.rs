//! Overlay configuration (`~/.config/dewterm/config.toml`).
//!
//! Missing or malformed files fall back to defaults; unknown keys are ignored
//! for forward compatibility. The config directory can be redirected with
//! `DEWTERM_CONFIG_DIR` so tests and packaged hosts can isolate state.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::line_queue::Color;
use crate::logging::log_debug;

const CONFIG_FILE: &str = "config.toml";
const CONFIG_DIR_ENV: &str = "DEWTERM_CONFIG_DIR";

/// Tunables for the console overlay.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Scrollback capacity per queue (`numOfLinesBuffer`).
    pub lines_buffer: usize,
    /// Visible window size per queue (`numOfLinesToShow`).
    pub lines_to_show: usize,
    /// Minimum ms between honoring open gestures.
    pub open_debounce_ms: u64,
    /// ARGB tint of the selected queue.
    pub active_color: u32,
    /// ARGB tint of the unselected queues.
    pub inactive_color: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            lines_buffer: 100,
            lines_to_show: 12,
            open_debounce_ms: 100,
            active_color: Color::ACTIVE.0,
            inactive_color: Color::INACTIVE.0,
        }
    }
}

impl OverlayConfig {
    pub fn open_debounce(&self) -> Duration {
        Duration::from_millis(self.open_debounce_ms)
    }

    pub fn active_color(&self) -> Color {
        Color(self.active_color)
    }

    pub fn inactive_color(&self) -> Color {
        Color(self.inactive_color)
    }

    /// Clamp pathological values so queue invariants hold.
    fn normalize(mut self) -> Self {
        if self.lines_buffer == 0 {
            self.lines_buffer = 1;
        }
        if self.lines_to_show == 0 {
            self.lines_to_show = 1;
        }
        if self.lines_to_show > self.lines_buffer {
            self.lines_to_show = self.lines_buffer;
        }
        self
    }
}

/// Resolve the config directory path.
pub(crate) fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = env::var(CONFIG_DIR_ENV) {
        let trimmed = dir.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    let home = env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".config").join("dewterm"))
}

/// Resolve the full config file path.
pub fn config_file_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Load the overlay config, falling back to defaults when the file is absent
/// or unreadable.
pub fn load_config() -> OverlayConfig {
    let Some(path) = config_file_path() else {
        return OverlayConfig::default();
    };
    let contents = match fs::read_to_string(&path) {
        Ok(c) => c,
        Err(_) => return OverlayConfig::default(),
    };
    parse_config(&contents)
}

fn parse_config(contents: &str) -> OverlayConfig {
    match toml::from_str::<OverlayConfig>(contents) {
        Ok(config) => config.normalize(),
        Err(err) => {
            log_debug(&format!("config parse failed, using defaults: {err}"));
            OverlayConfig::default()
        }
    }
}
