use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::app_dirs::AppDirs;
use crate::game::GameSettings;

/// Snapshot of an in-progress round. Written at round start and after every
/// score change, removed when the round ends; a relaunch that finds a live
/// snapshot resumes the round with the original start timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub settings: GameSettings,
    pub started_at_epoch_ms: u64,
    pub score: u32,
    pub typing_speed: Option<f64>,
}

impl SessionSnapshot {
    pub fn new(
        settings: GameSettings,
        started_at: SystemTime,
        score: u32,
        typing_speed: Option<f64>,
    ) -> Self {
        let started_at_epoch_ms = started_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        Self {
            settings,
            started_at_epoch_ms,
            score,
            typing_speed,
        }
    }

    pub fn started_at(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(self.started_at_epoch_ms)
    }

    /// A snapshot is live while the round it describes still has time left.
    pub fn is_live(&self, now: SystemTime) -> bool {
        now < self.started_at() + Duration::from_secs(self.settings.timer_secs)
    }
}

pub trait SessionStore {
    fn load(&self) -> Option<SessionSnapshot>;
    fn save(&self, snapshot: &SessionSnapshot) -> io::Result<()>;
    fn clear(&self) -> io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::session_path().unwrap_or_else(|| PathBuf::from("mathdash_session.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Option<SessionSnapshot> {
        let bytes = fs::read(&self.path).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn save(&self, snapshot: &SessionSnapshot) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec(snapshot).unwrap_or_default();
        fs::write(&self.path, data)
    }

    fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
