use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::app_dirs::AppDirs;
use crate::game::GameSettings;
use crate::problem::{Operation, ProblemRange};

/// Last-used drill settings, persisted between runs. CLI flags override
/// whatever is stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub operation: Operation,
    pub min1: i64,
    pub max1: i64,
    pub min2: i64,
    pub max2: i64,
    pub timer_secs: u64,
    pub allow_negatives: bool,
    pub focus_number: Option<i64>,
    pub learner_mode: bool,
    pub custom_number_pad: bool,
    pub typing_speed_adjustment: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(&GameSettings::default())
    }
}

impl From<&GameSettings> for Config {
    fn from(settings: &GameSettings) -> Self {
        Self {
            operation: settings.operation,
            min1: settings.range.min1,
            max1: settings.range.max1,
            min2: settings.range.min2,
            max2: settings.range.max2,
            timer_secs: settings.timer_secs,
            allow_negatives: settings.allow_negatives,
            focus_number: settings.focus_number,
            learner_mode: settings.learner_mode,
            custom_number_pad: settings.custom_number_pad,
            typing_speed_adjustment: settings.typing_speed_adjustment,
        }
    }
}

impl Config {
    pub fn to_settings(&self) -> GameSettings {
        GameSettings {
            operation: self.operation,
            range: ProblemRange::new(self.min1, self.max1, self.min2, self.max2),
            timer_secs: self.timer_secs,
            allow_negatives: self.allow_negatives,
            focus_number: self.focus_number,
            learner_mode: self.learner_mode,
            custom_number_pad: self.custom_number_pad,
            typing_speed_adjustment: self.typing_speed_adjustment,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("mathdash_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
