//! Persistence for the alarm list.
//!
//! Alarms live in the `[[alarms]]` array of the config file. Entries are
//! validated one by one on load so that a single bad entry doesn't lose the
//! whole list.

use std::{collections::HashSet, path::PathBuf};

use serde::{Deserialize, Deserializer};

use crate::{
    alarm::{Alarm, AlarmId, RepeatRule},
    config::Config,
    error::{AlarmError, StoreError},
};

/// where the clock reads its alarms from at startup and writes them back to after every change
pub trait AlarmStore {
    fn load(&self) -> Result<Vec<Alarm>, StoreError>;
    fn save(&mut self, alarms: &[Alarm]) -> Result<(), StoreError>;
}

/// keeps alarms inside the toml config file, leaving the other settings alone
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_location() -> Result<Self, StoreError> {
        Config::config_path().map(Self::new)
    }

    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl AlarmStore for ConfigStore {
    fn load(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(Config::load_or_default(&self.path)?.alarms)
    }

    fn save(&mut self, alarms: &[Alarm]) -> Result<(), StoreError> {
        // a config we can't parse is not overwritten, the user would lose their settings
        let mut config = Config::load_or_default(&self.path)?;
        config.alarms = alarms.to_vec();
        config.save(&self.path)
    }
}

/// an alarm as found on disk, every field may be missing or come from an older layout
#[derive(Debug, Deserialize)]
struct RawAlarm {
    id: Option<i64>,
    #[serde(alias = "label")]
    name: Option<String>,
    #[serde(alias = "alarm_time")]
    time: Option<String>,
    #[serde(alias = "repeat_type", alias = "days")]
    repeat: Option<String>,
    #[serde(alias = "is_active", alias = "isActive")]
    active: Option<bool>,
    #[serde(alias = "sound_type")]
    sound: Option<String>,
    volume: Option<toml::Value>,
}

impl RawAlarm {
    /// the id is `None` when it is missing or unusable and has to be assigned
    fn validate(self) -> Result<(Option<AlarmId>, Alarm), AlarmError> {
        let time = self.time.ok_or(AlarmError::MissingTime)?.parse()?;
        let id = self.id.and_then(|id| AlarmId::try_from(id).ok()).filter(|id| *id > 0);
        let name = self
            .name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| Alarm::DEFAULT_NAME.to_string());
        let volume = match self.volume {
            None => Alarm::DEFAULT_VOLUME,
            Some(toml::Value::Integer(volume)) => clamp_volume(volume),
            #[allow(clippy::cast_possible_truncation)]
            Some(toml::Value::Float(volume)) => clamp_volume(volume.round() as i64),
            Some(other) => {
                log::warn!("ignoring volume {other}, using {}", Alarm::DEFAULT_VOLUME);
                Alarm::DEFAULT_VOLUME
            }
        };
        Ok((
            id,
            Alarm {
                id: id.unwrap_or_default(),
                name,
                time,
                repeat: self.repeat.map(RepeatRule::from).unwrap_or_default(),
                active: self.active.unwrap_or(true),
                // filled in from the configured default sound once the whole file is read
                sound: self
                    .sound
                    .map(|sound| sound.trim().to_string())
                    .unwrap_or_default(),
                volume,
            },
        ))
    }
}

fn clamp_volume(volume: i64) -> u8 {
    u8::try_from(volume.clamp(0, 100)).unwrap_or(Alarm::DEFAULT_VOLUME)
}

/// turns loosely typed entries into alarms with unique ids, skipping ones without a usable time
#[must_use]
pub fn validate_entries(entries: Vec<toml::Value>) -> Vec<Alarm> {
    let mut alarms = Vec::with_capacity(entries.len());
    let mut needs_id = vec![];
    let mut seen = HashSet::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let raw: RawAlarm = match entry.try_into() {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("skipping alarm entry {index}: {e}");
                continue;
            }
        };
        match raw.validate() {
            Ok((Some(id), alarm)) if seen.insert(id) => alarms.push(alarm),
            Ok((id, alarm)) => {
                if let Some(id) = id {
                    log::warn!("alarm id {id} is used more than once, giving entry {index} a new id");
                }
                needs_id.push(alarms.len());
                alarms.push(alarm);
            }
            Err(e) => log::warn!("skipping alarm entry {index}: {e}"),
        }
    }
    let mut next_id = seen.iter().max().copied().unwrap_or_default();
    for index in needs_id {
        next_id += 1;
        alarms[index].id = next_id;
    }
    alarms
}

pub(crate) fn lenient_alarms<'de, D>(deserializer: D) -> Result<Vec<Alarm>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<toml::Value>::deserialize(deserializer).map(validate_entries)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::alarm_edit::AlarmBuilder;

    fn entries(text: &str) -> Vec<Alarm> {
        Config::parse(text).unwrap().alarms
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let mut store = ConfigStore::new(dir.path().join("config.toml"));
        let alarms = vec![
            AlarmBuilder::at("07:30".parse().unwrap())
                .name("wake up")
                .sound("bell")
                .build(1)
                .unwrap(),
            AlarmBuilder::at("22:15".parse().unwrap())
                .repeat(RepeatRule::Unknown("fortnightly".to_string()))
                .sound("chime")
                .volume(35)
                .build(7)
                .unwrap(),
        ];
        store.save(&alarms).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, alarms);

        // saving what was loaded changes nothing
        store.save(&loaded).unwrap();
        assert_eq!(store.load().unwrap(), alarms);
    }

    #[test]
    fn saving_keeps_other_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            snooze_minutes: 12,
            ..Config::default()
        };
        config.save(&path).unwrap();

        let mut store = ConfigStore::new(path.clone());
        store.save(&[]).unwrap();
        assert_eq!(Config::load(&path).unwrap().snooze_minutes, 12);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("absent.toml"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error_and_not_overwritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "alarms = 3 = 4").unwrap();
        let mut store = ConfigStore::new(path.clone());
        assert!(store.load().is_err());
        assert!(store.save(&[]).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "alarms = 3 = 4");
    }

    #[test]
    fn coerces_missing_fields() {
        let alarms = entries(
            r#"
            [[alarms]]
            time = "6:45 am"
            "#,
        );
        assert_eq!(alarms.len(), 1);
        let alarm = &alarms[0];
        assert_eq!(alarm.id, 1);
        assert_eq!(alarm.name, "Alarm");
        assert_eq!(alarm.time.to_string(), "06:45");
        assert_eq!(alarm.repeat, RepeatRule::Once);
        assert!(alarm.active);
        assert_eq!(alarm.sound, "bell");
        assert_eq!(alarm.volume, 80);
    }

    #[test]
    fn missing_sound_uses_configured_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            default_sound = "chime"

            [[alarms]]
            id = 1
            time = "07:30"

            [[alarms]]
            id = 2
            time = "08:30"
            sound = "  "

            [[alarms]]
            id = 3
            time = "09:30"
            sound = "voice"
            "#,
        )
        .unwrap();
        let mut store = ConfigStore::new(path.clone());
        let alarms = store.load().unwrap();
        let sounds: Vec<_> = alarms.iter().map(|alarm| alarm.sound.as_str()).collect();
        assert_eq!(sounds, vec!["chime", "chime", "voice"]);

        // and that is what gets written back
        store.save(&alarms).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains(r#"sound = "chime""#));
        assert_eq!(store.load().unwrap(), alarms);
    }

    #[test]
    fn skips_entries_without_usable_time() {
        let alarms = entries(
            r#"
            [[alarms]]
            id = 1
            name = "no time"

            [[alarms]]
            id = 2
            time = "25:00"

            [[alarms]]
            id = 3
            time = 730

            [[alarms]]
            id = 4
            time = "07:30"
            "#,
        );
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].id, 4);
    }

    #[test]
    fn reassigns_duplicate_and_missing_ids() {
        let alarms = entries(
            r#"
            [[alarms]]
            id = 5
            time = "07:00"

            [[alarms]]
            id = 5
            time = "08:00"

            [[alarms]]
            time = "09:00"

            [[alarms]]
            id = -2
            time = "10:00"
            "#,
        );
        let ids: Vec<_> = alarms.iter().map(|alarm| alarm.id).collect();
        assert_eq!(ids, vec![5, 6, 7, 8]);
        assert_eq!(alarms[1].time.to_string(), "08:00");
    }

    #[test]
    fn accepts_older_field_names_and_clamps_volume() {
        let alarms = entries(
            r#"
            [[alarms]]
            id = 9
            label = "study break"
            alarm_time = "15:00"
            repeat_type = "weekdays"
            is_active = false
            sound_type = "digital"
            volume = 250.0
            "#,
        );
        let alarm = &alarms[0];
        assert_eq!(alarm.name, "study break");
        assert_eq!(alarm.repeat, RepeatRule::Weekdays);
        assert!(!alarm.active);
        assert_eq!(alarm.sound, "digital");
        assert_eq!(alarm.volume, 100);
    }
}
