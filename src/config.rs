use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
};

use chrono::Duration;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{
    alarm::Alarm,
    clock::{OncePolicy, Settings},
    error::StoreError,
};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_time_format")]
    pub time_format: String,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    /// 0 keeps an alarm ringing until it is dismissed
    #[serde(default = "default_ring_timeout_seconds")]
    pub ring_timeout_seconds: u32,
    #[serde(default)]
    pub once_policy: OncePolicy,
    /// start with sound locked until the user unlocks it
    #[serde(default)]
    pub start_muted: bool,
    #[serde(default = "Sound::get_default_name")]
    pub default_sound: String,
    #[serde(default = "default_sounds")]
    pub sounds: HashMap<String, Sound>,
    #[serde(default, deserialize_with = "crate::store::lenient_alarms")]
    pub alarms: Vec<Alarm>,
}

fn default_time_format() -> String {
    "%l:%M %p".to_string()
}

const fn default_snooze_minutes() -> u32 {
    5
}

const fn default_ring_timeout_seconds() -> u32 {
    10
}

fn default_sounds() -> HashMap<String, Sound> {
    [Sound::bell(), Sound::chime(), Sound::digital(), Sound::voice()]
        .into_iter()
        .map(|sound| (sound.name.clone(), sound))
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            snooze_minutes: default_snooze_minutes(),
            ring_timeout_seconds: default_ring_timeout_seconds(),
            once_policy: OncePolicy::default(),
            start_muted: false,
            default_sound: Sound::get_default_name(),
            sounds: default_sounds(),
            alarms: vec![],
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let config = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&config)
    }

    /// alarms without a sound get [`Config::default_sound`]
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let mut config: Self = toml::from_str(text)?;
        for alarm in &mut config.alarms {
            if alarm.sound.is_empty() {
                alarm.sound.clone_from(&config.default_sound);
            }
        }
        Ok(config)
    }

    /// like [`Config::load`] but a missing file gives the default config
    pub fn load_or_default(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let config = toml::to_string(self)?;
        let io_error = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, config).map_err(io_error)
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            snooze: Duration::minutes(i64::from(self.snooze_minutes)),
            ring_timeout: (self.ring_timeout_seconds > 0)
                .then(|| Duration::seconds(i64::from(self.ring_timeout_seconds))),
            once_policy: self.once_policy,
            default_sound: self.default_sound.clone(),
        }
    }

    pub fn config_path() -> Result<PathBuf, StoreError> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(StoreError::NoConfigDir)
    }

    /// falls back to `./sounds` when there is no home directory
    #[must_use]
    pub fn sounds_path() -> PathBuf {
        project_dirs().map_or_else(
            || PathBuf::from("sounds"),
            |dirs| dirs.data_dir().join("sounds"),
        )
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "study_alarm")
}

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Sound {
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for Sound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.name,
            self.path
                .file_name()
                .map_or_else(|| self.path.to_string_lossy(), |file| file.to_string_lossy())
        )
    }
}

impl Default for Sound {
    fn default() -> Self {
        Self::bell()
    }
}

impl Sound {
    #[must_use]
    pub fn get_default_name() -> String {
        Self::default().name
    }

    #[must_use]
    pub const fn new(name: String, path: PathBuf) -> Self {
        Self { name, path }
    }

    fn bundled(name: &str, file: &str) -> Self {
        Self {
            name: name.to_string(),
            path: Config::sounds_path().join(file),
        }
    }

    #[must_use]
    pub fn bell() -> Self {
        Self::bundled("bell", "bell.mp3")
    }

    #[must_use]
    pub fn chime() -> Self {
        Self::bundled("chime", "chime.mp3")
    }

    #[must_use]
    pub fn digital() -> Self {
        Self::bundled("digital", "digital.mp3")
    }

    #[must_use]
    pub fn voice() -> Self {
        Self::bundled("voice", "voice.mp3")
    }
}
