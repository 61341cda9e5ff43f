use directories::ProjectDirs;
use std::path::PathBuf;

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("mathdash"),
            )
        } else {
            ProjectDirs::from("", "", "mathdash")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn db_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("scores.db"))
    }

    pub fn results_log_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("rounds.csv"))
    }

    /// Short-lived snapshot of an in-progress round, for resume-on-relaunch.
    pub fn session_path() -> Option<PathBuf> {
        Self::state_dir().map(|dir| dir.join("session.json"))
    }

    pub fn config_path() -> Option<PathBuf> {
        if let Some(pd) = ProjectDirs::from("", "", "mathdash") {
            Some(pd.config_dir().join("config.json"))
        } else {
            Some(PathBuf::from("mathdash_config.json"))
        }
    }
}
