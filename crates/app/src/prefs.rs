//! Mute preference persistence
//!
//! A single boolean survives restarts: whether the user muted voice
//! control. Stored as plain `"true"`/`"false"` text in one file so any
//! tooling can read and reset it. Toggles are user-driven and never
//! concurrent with themselves, so last-writer-wins is fine.

use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::debug;

/// Key (file name) under which the mute preference is stored
pub const MUTE_PREFERENCE_KEY: &str = "voice-control-muted";

pub trait PreferenceStore: Send {
    /// Read the persisted preference; anything unreadable means the
    /// first-run default of "listening enabled"
    fn load_muted(&self) -> bool;

    /// Persist the preference; called on every toggle
    fn store_muted(&mut self, muted: bool) -> io::Result<()>;
}

/// File-backed store under the platform config directory
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<config-dir>/voxgate/voice-control-muted`, if the platform has a
    /// config directory at all
    pub fn at_default_location() -> Option<Self> {
        let path = dirs::config_dir()?.join("voxgate").join(MUTE_PREFERENCE_KEY);
        Some(Self::new(path))
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn load_muted(&self) -> bool {
        match fs::read_to_string(&self.path) {
            Ok(contents) => contents.trim() == "true",
            Err(e) => {
                debug!("mute preference not loaded ({}), defaulting to unmuted", e);
                false
            }
        }
    }

    fn store_muted(&mut self, muted: bool) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, if muted { "true" } else { "false" })
    }
}

/// In-memory store for tests and ephemeral runs
#[derive(Default)]
pub struct MemoryPreferenceStore {
    muted: bool,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn load_muted(&self) -> bool {
        self.muted
    }

    fn store_muted(&mut self, muted: bool) -> io::Result<()> {
        self.muted = muted;
        Ok(())
    }
}
