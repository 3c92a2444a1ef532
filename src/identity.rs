//! Per-session display name derived from a persisted unique id and the
//! host's current player name.
//!
//! The uid is created once per install and stored hex-encoded in the config
//! directory, so the backend sees a stable identity across runs even when the
//! player renames themselves.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::config_dir;
use crate::logging::log_debug;

const UID_FILE: &str = "uid";
/// Server-side cap on the full display name, prefix included.
const MAX_NAME_LEN: usize = 27;
const NAME_PREFIX: &str = "dew";

/// Immutable display name computed once at overlay startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBootstrap {
    display_name: String,
}

impl IdentityBootstrap {
    pub fn new(uid: u64, player_name: &str) -> Self {
        Self {
            display_name: display_name(uid, player_name),
        }
    }

    /// Load (or create) the persisted uid and derive the display name from
    /// the player name the host holds right now.
    pub fn from_store(uid_path: &Path, player_name: &str) -> Result<Self> {
        let uid = load_or_create_uid(uid_path)?;
        Ok(Self::new(uid, player_name))
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Default location of the persisted uid file.
pub fn default_uid_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(UID_FILE))
}

/// Read the persisted 8-byte uid, generating and persisting one on first run.
/// A malformed file is replaced rather than treated as fatal.
pub fn load_or_create_uid(path: &Path) -> Result<u64> {
    if let Ok(contents) = fs::read_to_string(path) {
        match u64::from_str_radix(contents.trim(), 16) {
            Ok(uid) => return Ok(uid),
            Err(_) => log_debug("uid file malformed; generating a fresh uid"),
        }
    }

    let uid: u64 = rand::random();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating uid directory {}", parent.display()))?;
    }
    fs::write(path, format!("{uid:016x}\n"))
        .with_context(|| format!("persisting uid to {}", path.display()))?;
    Ok(uid)
}

/// `hex(uid) + "|" + player_name`, truncated from the front so the newest
/// characters survive the length cap, then tagged with the fixed prefix.
fn display_name(uid: u64, player_name: &str) -> String {
    let mut combined = format!("{uid:016x}|{player_name}");
    let max = MAX_NAME_LEN - NAME_PREFIX.len();
    let count = combined.chars().count();
    if count > max {
        combined = combined.chars().skip(count - max).collect();
    }
    format!("{NAME_PREFIX}{combined}")
}
